use super::{isolation::BenchmarkIsolation, mode::BenchmarkMode, transport::BenchmarkTransport};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct BenchmarkParams {
    pub mode: BenchmarkMode,
    pub transport: BenchmarkTransport,
    pub isolation: BenchmarkIsolation,
    pub buffer_size: u64,
    pub flows: u32,
    pub buffers_per_flow: Option<u64>,
    pub duration_secs: Option<f64>,
    pub reclaim: bool,
    pub sampling_time_ms: u64,
    pub moving_average_window: u32,
    /// Relative standard deviation accepted as stable
    pub tolerance: f64,
    /// Buffer sizes measured in order, only for a size sweep
    pub sweep_sizes: Option<Vec<u64>>,
    pub identifier: Option<String>,
    pub remark: Option<String>,
    pub bench_command: String,
}

impl BenchmarkParams {
    pub fn format_flows_info(&self) -> String {
        match (self.mode, self.isolation) {
            (BenchmarkMode::TimeBounded, _) => format!("{} flows over {}", self.flows, self.transport),
            (BenchmarkMode::CountBounded, BenchmarkIsolation::Thread) => format!(
                "{} flows over {}, {} buffers each",
                self.flows,
                self.transport,
                self.buffers_per_flow.unwrap_or_default()
            ),
            (BenchmarkMode::Sweep, _) => format!(
                "{} flows over {}, {} buffer sizes",
                self.flows,
                self.transport,
                self.sweep_sizes.as_ref().map_or(0, Vec::len)
            ),
            (BenchmarkMode::CountBounded, BenchmarkIsolation::Process) => format!(
                "{} flows over {} with consumer processes, {} buffers each",
                self.flows,
                self.transport,
                self.buffers_per_flow.unwrap_or_default()
            ),
        }
    }
}
