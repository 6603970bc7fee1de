use human_repr::HumanCount;
use humantime::format_duration;
use std::num::NonZeroU64;
use std::time::Duration;

/// When the producers of a run stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinishCondition {
    /// Every producer runs until the harness stops it.
    Duration(Duration),
    /// Every producer sends exactly this many buffers, then stops on its own.
    BufferCount(NonZeroU64),
}

impl FinishCondition {
    pub fn quota(&self) -> Option<u64> {
        match self {
            FinishCondition::Duration(_) => None,
            FinishCondition::BufferCount(count) => Some(count.get()),
        }
    }

    pub fn duration(&self) -> Option<Duration> {
        match self {
            FinishCondition::Duration(duration) => Some(*duration),
            FinishCondition::BufferCount(_) => None,
        }
    }

    /// Bytes a single flow must deliver, known only for count-bounded runs.
    pub fn expected_bytes(&self, buffer_size: usize) -> Option<u64> {
        self.quota()
            .and_then(|quota| quota.checked_mul(buffer_size as u64))
    }

    pub fn total_str(&self, buffer_size: usize) -> String {
        match self {
            FinishCondition::Duration(duration) => {
                format!("buffers for {}", format_duration(*duration))
            }
            FinishCondition::BufferCount(count) => format!(
                "{} buffers ({})",
                count.get().human_count_bare(),
                count
                    .get()
                    .saturating_mul(buffer_size as u64)
                    .human_count_bytes()
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn count_condition_should_expose_quota_and_expected_bytes() {
        let condition = FinishCondition::BufferCount(NonZeroU64::new(1000).unwrap());
        assert_eq!(condition.quota(), Some(1000));
        assert_eq!(condition.duration(), None);
        assert_eq!(condition.expected_bytes(1024), Some(1_024_000));
    }

    #[test]
    fn duration_condition_should_have_no_quota() {
        let condition = FinishCondition::Duration(Duration::from_secs(1));
        assert_eq!(condition.quota(), None);
        assert_eq!(condition.expected_bytes(1024), None);
        assert_eq!(condition.duration(), Some(Duration::from_secs(1)));
    }
}
