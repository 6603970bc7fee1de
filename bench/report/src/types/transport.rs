use derive_more::derive::Display;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Display, Default, Hash)]
pub enum BenchmarkTransport {
    #[default]
    #[display("unix")]
    #[serde(rename = "unix")]
    Unix,
    #[display("tcp")]
    #[serde(rename = "tcp")]
    Tcp,
}
