use crate::utils::round_float;
use serde::{Deserialize, Serialize};

/// Final tally of a single flow, as acknowledged by its consumer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default, derive_new::new)]
pub struct FlowReport {
    pub flow_id: u32,
    pub bytes_transferred: u64,
    #[serde(serialize_with = "round_float")]
    pub throughput_bytes_per_second: f64,
}
