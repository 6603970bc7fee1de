use super::parse::parse_buffer_size;
use crate::error::PipeBenchError;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// Inclusive range of buffer sizes swept by doubling, written `<min>..<max>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizeRange {
    pub min: usize,
    pub max: usize,
}

impl SizeRange {
    /// `min`, `2 * min`, `4 * min` and so on while not above `max`.
    pub fn sizes(&self) -> Vec<usize> {
        let mut sizes = Vec::new();
        let mut size = Some(self.min);
        while let Some(current) = size.filter(|&size| size <= self.max) {
            sizes.push(current);
            size = current.checked_mul(2);
        }
        sizes
    }
}

impl FromStr for SizeRange {
    type Err = PipeBenchError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let Some((min, max)) = value.split_once("..") else {
            return Err(PipeBenchError::invalid_argument(format!(
                "invalid size range '{value}', expected <min>..<max>"
            )));
        };
        let range = SizeRange {
            min: parse_buffer_size(min)?,
            max: parse_buffer_size(max)?,
        };
        if range.min > range.max {
            return Err(PipeBenchError::invalid_argument(format!(
                "size range '{value}' ends below its start"
            )));
        }
        Ok(range)
    }
}

impl Display for SizeRange {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}..{}", self.min, self.max)
    }
}
