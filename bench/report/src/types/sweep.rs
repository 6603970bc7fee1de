use crate::time_series::TimeSeries;
use crate::utils::round_float;
use serde::{Deserialize, Serialize};

/// Throughput measured at one buffer size of a sweep.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct SweepPass {
    pub buffer_size: u64,
    pub samples: usize,
    #[serde(serialize_with = "round_float")]
    pub average_bps: f64,
    #[serde(serialize_with = "round_float")]
    pub deviation_bps: f64,
    #[serde(serialize_with = "round_float")]
    pub peak_bps: f64,
    /// False when the pass stopped at the sample limit without meeting the tolerance
    pub settled: bool,
}

impl SweepPass {
    pub fn from_series(buffer_size: u64, series: &TimeSeries, tolerance: f64) -> Self {
        Self {
            buffer_size,
            samples: series.len(),
            average_bps: series.mean(),
            deviation_bps: series.std_dev(),
            peak_bps: series.max(),
            settled: series
                .relative_std_dev(series.len())
                .is_some_and(|deviation| deviation <= tolerance),
        }
    }

    /// Standard deviation relative to the average, zero for an idle pass.
    pub fn relative_deviation(&self) -> f64 {
        if self.average_bps <= 0.0 {
            return 0.0;
        }
        self.deviation_bps / self.average_bps
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct SweepPoint {
    pub buffer_size: u64,
    #[serde(serialize_with = "round_float")]
    pub throughput_bps: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct SweepSummary {
    pub passes: Vec<SweepPass>,
    /// Buffer size with the highest average throughput
    pub best: Option<SweepPoint>,
    /// Buffer size with the highest single sample
    pub peak: Option<SweepPoint>,
}

impl SweepSummary {
    pub fn new(passes: Vec<SweepPass>) -> Self {
        let best = passes
            .iter()
            .max_by(|a, b| a.average_bps.total_cmp(&b.average_bps))
            .map(|pass| SweepPoint {
                buffer_size: pass.buffer_size,
                throughput_bps: pass.average_bps,
            });
        let peak = passes
            .iter()
            .max_by(|a, b| a.peak_bps.total_cmp(&b.peak_bps))
            .map(|pass| SweepPoint {
                buffer_size: pass.buffer_size,
                throughput_bps: pass.peak_bps,
            });
        Self { passes, best, peak }
    }
}
