use crate::utils::round_float;
use serde::{Deserialize, Serialize};

/// Resource usage of the benchmark process at one sampling instant.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct ResourceUsage {
    #[serde(serialize_with = "round_float")]
    pub process_cpu_percent: f64,
    pub process_rss_bytes: u64,
    #[serde(serialize_with = "round_float")]
    pub system_cpu_percent: f64,
}

/// One row of `samples.csv`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct BenchmarkSample {
    #[serde(serialize_with = "round_float")]
    pub time_s: f64,
    pub buffer_size: u64,
    #[serde(serialize_with = "round_float")]
    pub throughput_bps: f64,
    pub resources: Option<ResourceUsage>,
}
