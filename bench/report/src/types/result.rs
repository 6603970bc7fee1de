use crate::utils::round_float;
use serde::{Deserialize, Serialize};

/// Aggregate outcome of one benchmark run.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct BenchmarkResult {
    #[serde(serialize_with = "round_float")]
    pub elapsed_secs: f64,
    pub total_bytes: u64,
}

impl BenchmarkResult {
    pub fn new(elapsed_secs: f64, total_bytes: u64) -> Self {
        Self {
            elapsed_secs,
            total_bytes,
        }
    }

    /// Bytes per second. Zero when no time has elapsed.
    pub fn rate(&self) -> f64 {
        if self.elapsed_secs <= 0.0 {
            return 0.0;
        }
        self.total_bytes as f64 / self.elapsed_secs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_should_divide_bytes_by_elapsed_time() {
        let result = BenchmarkResult::new(2.0, 4096);
        assert_eq!(result.rate(), 2048.0);
    }

    #[test]
    fn rate_should_be_zero_when_nothing_elapsed() {
        let result = BenchmarkResult::new(0.0, 4096);
        assert_eq!(result.rate(), 0.0);
    }
}
