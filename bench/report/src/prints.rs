use crate::{
    flow::FlowReport,
    report::BenchmarkReport,
    result::BenchmarkResult,
    sweep::{SweepPass, SweepPoint, SweepSummary},
};
use colored::{ColoredString, Colorize};
use tracing::info;

const TIME_UNITS: [&str; 4] = ["sec", "msec", "usec", "nsec"];
const THROUGHPUT_UNITS: [&str; 4] = ["Bps", "KBps", "MBps", "GBps"];
const SIZE_UNITS: [&str; 4] = ["", "KB", "MB", "GB"];

pub const ZERO_TIME: &str = "0 sec";
pub const ZERO_THROUGHPUT: &str = "0 Bps";

/// Value as it will be printed with three decimals.
fn displayed(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

/// Formats seconds with the largest unit that keeps the value at or above 1,
/// stopping at nanoseconds.
pub fn format_time(seconds: f64) -> String {
    if !seconds.is_finite() || seconds <= 0.0 {
        return ZERO_TIME.to_owned();
    }

    let mut value = seconds;
    let mut unit = 0;
    while displayed(value) < 1.0 && unit < TIME_UNITS.len() - 1 {
        value *= 1000.0;
        unit += 1;
    }
    format!("{value:.3} {}", TIME_UNITS[unit])
}

/// Formats bytes per second in binary (1024) steps, stopping at GBps.
pub fn format_throughput(bytes_per_second: f64) -> String {
    if !bytes_per_second.is_finite() || bytes_per_second <= 0.0 {
        return ZERO_THROUGHPUT.to_owned();
    }

    let mut value = bytes_per_second;
    let mut unit = 0;
    while displayed(value) >= 1024.0 && unit < THROUGHPUT_UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{value:.3} {}", THROUGHPUT_UNITS[unit])
}

/// Buffer size in whole binary units, truncated, so 1536 bytes is `1KB`.
pub fn format_size(bytes: u64) -> String {
    let mut value = bytes;
    let mut unit = 0;
    while value >= 1024 && unit < SIZE_UNITS.len() - 1 {
        value /= 1024;
        unit += 1;
    }
    format!("{value}{}", SIZE_UNITS[unit])
}

impl BenchmarkResult {
    /// The `Elapsed:` and `Throughput:` lines written to stdout.
    pub fn output_lines(&self) -> [String; 2] {
        [
            format!("Elapsed: {}", format_time(self.elapsed_secs)),
            format!("Throughput: {}", format_throughput(self.rate())),
        ]
    }
}

impl FlowReport {
    pub fn formatted_string(&self) -> ColoredString {
        format!(
            "Flow #{}: acknowledged {} bytes, throughput: {}",
            self.flow_id,
            self.bytes_transferred,
            format_throughput(self.throughput_bytes_per_second)
        )
        .green()
    }
}

impl SweepPass {
    pub fn output_line(&self) -> String {
        format!(
            "{}: {} ({:.1}%{})",
            format_size(self.buffer_size),
            format_throughput(self.average_bps),
            self.relative_deviation() * 100.0,
            if self.settled { "" } else { ", unsettled" }
        )
    }
}

impl SweepPoint {
    fn formatted(&self) -> String {
        format!(
            "{} {}",
            format_size(self.buffer_size),
            format_throughput(self.throughput_bps)
        )
    }
}

impl SweepSummary {
    /// One line per pass followed by the `Best:` and `Peak:` lines.
    pub fn output_lines(&self) -> Vec<String> {
        let mut lines: Vec<String> = self.passes.iter().map(SweepPass::output_line).collect();
        if let Some(best) = &self.best {
            lines.push(format!("Best: {}", best.formatted()));
        }
        if let Some(peak) = &self.peak {
            lines.push(format!("Peak: {}", peak.formatted()));
        }
        lines
    }
}

impl BenchmarkReport {
    pub fn print_summary(&self) {
        let params_print = format!(
            "Benchmark: {}, {}, {} byte buffers, total: {} bytes in {}",
            self.params.mode,
            self.params.format_flows_info(),
            self.params.buffer_size,
            self.result.total_bytes,
            format_time(self.result.elapsed_secs),
        )
        .blue();

        info!("{}", params_print);

        if let Some(sweep) = &self.sweep {
            sweep
                .passes
                .iter()
                .for_each(|pass| info!("{}", pass.output_line().yellow()));
        }

        self.flows
            .iter()
            .for_each(|flow| info!("{}", flow.formatted_string()));

        let aggregate = format!(
            "Aggregate Results: throughput: {}",
            format_throughput(self.result.rate())
        )
        .red();
        info!("{}", aggregate);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn time_should_pick_unit_keeping_value_in_range() {
        assert_eq!(format_time(1.0), "1.000 sec");
        assert_eq!(format_time(12.5), "12.500 sec");
        assert_eq!(format_time(0.5), "500.000 msec");
        assert_eq!(format_time(0.001), "1.000 msec");
        assert_eq!(format_time(0.000_25), "250.000 usec");
        assert_eq!(format_time(0.000_000_75), "750.000 nsec");
    }

    #[test]
    fn time_should_clamp_at_unit_bounds() {
        assert_eq!(format_time(2500.0), "2500.000 sec");
        assert!(format_time(1e-12).ends_with(" nsec"));
    }

    #[test]
    fn time_rounding_up_to_one_should_stay_in_larger_unit() {
        assert_eq!(format_time(0.999_999_6), "1.000 sec");
        assert_eq!(format_time(0.000_999_999_6), "1.000 msec");
        assert_eq!(format_time(0.999_4), "999.400 msec");
    }

    #[test]
    fn non_positive_time_should_format_as_zero() {
        assert_eq!(format_time(0.0), ZERO_TIME);
        assert_eq!(format_time(-1.0), ZERO_TIME);
        assert_eq!(format_time(f64::NAN), ZERO_TIME);
    }

    #[test]
    fn throughput_should_pick_largest_unit_not_above_value() {
        assert_eq!(format_throughput(512.0), "512.000 Bps");
        assert_eq!(format_throughput(1024.0), "1.000 KBps");
        assert_eq!(format_throughput(1536.0 * 1024.0), "1.500 MBps");
        assert_eq!(format_throughput(3.0 * 1024.0 * 1024.0 * 1024.0), "3.000 GBps");
        assert_eq!(
            format_throughput(2048.0 * 1024.0 * 1024.0 * 1024.0),
            "2048.000 GBps"
        );
    }

    #[test]
    fn throughput_rounding_up_to_1024_should_move_to_next_unit() {
        assert_eq!(format_throughput(1023.9999), "1.000 KBps");
        assert_eq!(format_throughput(1023.999_9 * 1024.0), "1.000 MBps");
        assert_eq!(format_throughput(1023.9), "1023.900 Bps");
    }

    #[test]
    fn non_positive_throughput_should_format_as_zero() {
        assert_eq!(format_throughput(0.0), ZERO_THROUGHPUT);
        assert_eq!(format_throughput(-5.0), ZERO_THROUGHPUT);
        assert_eq!(format_throughput(f64::INFINITY), ZERO_THROUGHPUT);
    }

    #[test]
    fn size_should_truncate_to_whole_binary_units() {
        assert_eq!(format_size(512), "512");
        assert_eq!(format_size(16 * 1024), "16KB");
        assert_eq!(format_size(1536), "1KB");
        assert_eq!(format_size(32 * 1024 * 1024), "32MB");
        assert_eq!(format_size(4096 * 1024 * 1024 * 1024), "4096GB");
    }

    #[test]
    fn sweep_should_render_passes_then_best_and_peak() {
        let summary = SweepSummary::new(vec![
            SweepPass {
                buffer_size: 16 * 1024,
                samples: 10,
                average_bps: 1024.0 * 1024.0,
                deviation_bps: 10_485.76,
                peak_bps: 4.0 * 1024.0 * 1024.0,
                settled: true,
            },
            SweepPass {
                buffer_size: 32 * 1024,
                samples: 20,
                average_bps: 2.0 * 1024.0 * 1024.0,
                deviation_bps: 0.0,
                peak_bps: 2.0 * 1024.0 * 1024.0,
                settled: false,
            },
        ]);

        assert_eq!(
            summary.output_lines(),
            vec![
                "16KB: 1.000 MBps (1.0%)",
                "32KB: 2.000 MBps (0.0%, unsettled)",
                "Best: 32KB 2.000 MBps",
                "Peak: 16KB 4.000 MBps",
            ]
        );
    }

    #[test]
    fn result_should_render_both_output_lines() {
        let [elapsed, throughput] = BenchmarkResult::new(1.0, 2048).output_lines();
        assert_eq!(elapsed, "Elapsed: 1.000 sec");
        assert_eq!(throughput, "Throughput: 2.000 KBps");
    }
}
