use derive_more::derive::Display;
use serde::{Deserialize, Serialize};

/// Where the consuming side of a flow runs.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Display, Default, Hash)]
pub enum BenchmarkIsolation {
    #[default]
    #[display("thread")]
    #[serde(rename = "thread")]
    Thread,
    #[display("process")]
    #[serde(rename = "process")]
    Process,
}
