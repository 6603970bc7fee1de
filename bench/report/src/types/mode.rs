use derive_more::Display;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize, Default)]
pub enum BenchmarkMode {
    #[default]
    #[display("Time Bounded")]
    #[serde(rename = "time_bounded")]
    TimeBounded,
    #[display("Count Bounded")]
    #[serde(rename = "count_bounded")]
    CountBounded,
    #[display("Size Sweep")]
    #[serde(rename = "sweep")]
    Sweep,
}
