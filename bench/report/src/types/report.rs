use crate::types::flow::FlowReport;
use crate::types::hardware::BenchmarkHardware;
use crate::types::params::BenchmarkParams;
use crate::types::result::BenchmarkResult;
use crate::types::sample::BenchmarkSample;
use crate::types::sweep::SweepSummary;
use crate::types::time_series::TimeSeries;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use uuid::Uuid;

pub const REPORT_FILE_NAME: &str = "report.json";
pub const SAMPLES_FILE_NAME: &str = "samples.csv";
pub const SAMPLES_HEADER: &str = "time_s,buffer_size,throughput_bps,moving_average_bps,\
process_cpu_percent,process_rss_bytes,system_cpu_percent";

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct BenchmarkReport {
    /// Benchmark unique identifier
    pub uuid: Uuid,

    /// Timestamp when the benchmark was finished
    pub timestamp: String,

    pub hardware: BenchmarkHardware,

    pub params: BenchmarkParams,

    pub result: BenchmarkResult,

    /// Acknowledged tallies, one per flow
    pub flows: Vec<FlowReport>,

    /// Aggregate throughput and resource usage sampled while the flows were running
    pub samples: Vec<BenchmarkSample>,

    pub throughput: TimeSeries,

    pub throughput_moving_average: TimeSeries,

    /// Whether the tail of the throughput series settled; `None` when not sampled
    pub stable: Option<bool>,

    /// Per buffer size results of a size sweep
    pub sweep: Option<SweepSummary>,
}

impl BenchmarkReport {
    pub fn new(
        hardware: BenchmarkHardware,
        params: BenchmarkParams,
        result: BenchmarkResult,
        flows: Vec<FlowReport>,
        samples: Vec<BenchmarkSample>,
        stable: Option<bool>,
        sweep: Option<SweepSummary>,
    ) -> Self {
        let throughput = TimeSeries::from_samples(&samples);
        let throughput_moving_average =
            throughput.moving_average(params.moving_average_window as usize);
        Self {
            uuid: Uuid::now_v7(),
            timestamp: chrono::Utc::now().to_rfc3339(),
            hardware,
            params,
            result,
            flows,
            samples,
            throughput,
            throughput_moving_average,
            stable,
            sweep,
        }
    }

    pub fn dump_to_json(&self, output_dir: &Path) -> io::Result<PathBuf> {
        fs::create_dir_all(output_dir)?;

        let report_path = output_dir.join(REPORT_FILE_NAME);
        let report_json = serde_json::to_string_pretty(self).map_err(io::Error::other)?;
        fs::write(&report_path, report_json)?;
        Ok(report_path)
    }

    pub fn dump_to_csv(&self, output_dir: &Path) -> io::Result<PathBuf> {
        fs::create_dir_all(output_dir)?;

        let samples_path = output_dir.join(SAMPLES_FILE_NAME);
        let mut file = io::BufWriter::new(fs::File::create(&samples_path)?);
        writeln!(file, "{SAMPLES_HEADER}")?;
        for (sample, average) in self
            .samples
            .iter()
            .zip(self.throughput_moving_average.points.iter())
        {
            write!(
                file,
                "{:.3},{},{:.3},{:.3}",
                sample.time_s, sample.buffer_size, sample.throughput_bps, average.value
            )?;
            match sample.resources {
                Some(usage) => writeln!(
                    file,
                    ",{:.3},{},{:.3}",
                    usage.process_cpu_percent, usage.process_rss_bytes, usage.system_cpu_percent
                )?,
                None => writeln!(file, ",,,")?,
            }
        }
        file.flush()?;
        Ok(samples_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::sample::ResourceUsage;
    use crate::types::sweep::SweepPass;

    fn sample(time_s: f64, throughput_bps: f64, resources: Option<ResourceUsage>) -> BenchmarkSample {
        BenchmarkSample {
            time_s,
            buffer_size: 1024,
            throughput_bps,
            resources,
        }
    }

    fn report() -> BenchmarkReport {
        let usage = ResourceUsage {
            process_cpu_percent: 150.5,
            process_rss_bytes: 4096,
            system_cpu_percent: 25.0,
        };
        let samples = vec![sample(0.1, 1000.0, Some(usage)), sample(0.2, 3000.0, None)];
        let params = BenchmarkParams {
            buffer_size: 1024,
            flows: 2,
            moving_average_window: 2,
            ..Default::default()
        };
        BenchmarkReport::new(
            BenchmarkHardware::default(),
            params,
            BenchmarkResult::new(1.0, 2048),
            vec![
                FlowReport::new(1, 1024, 1024.0),
                FlowReport::new(2, 1024, 1024.0),
            ],
            samples,
            Some(false),
            None,
        )
    }

    #[test]
    fn json_dump_should_round_trip_flows() {
        let dir = tempfile::tempdir().unwrap();
        let path = report().dump_to_json(dir.path()).unwrap();

        let content = fs::read_to_string(path).unwrap();
        let parsed: BenchmarkReport = serde_json::from_str(&content).unwrap();
        assert_eq!(parsed.flows.len(), 2);
        assert_eq!(parsed.result.total_bytes, 2048);
        assert_eq!(parsed.params.buffer_size, 1024);
    }

    #[test]
    fn csv_dump_should_write_header_and_one_row_per_sample() {
        let dir = tempfile::tempdir().unwrap();
        let path = report().dump_to_csv(dir.path()).unwrap();

        let content = fs::read_to_string(path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines[0], SAMPLES_HEADER);
        assert_eq!(lines[1], "0.100,1024,1000.000,1000.000,150.500,4096,25.000");
        assert_eq!(lines[2], "0.200,1024,3000.000,2000.000,,,");
    }

    #[test]
    fn throughput_series_should_follow_samples() {
        let report = report();
        let values: Vec<f64> = report.throughput.points.iter().map(|p| p.value).collect();
        assert_eq!(values, vec![1000.0, 3000.0]);
        assert_eq!(report.throughput_moving_average.points[1].value, 2000.0);
    }

    #[test]
    fn json_dump_should_keep_sweep_summary() {
        let mut report = report();
        report.sweep = Some(SweepSummary::new(vec![SweepPass {
            buffer_size: 1024,
            samples: 2,
            average_bps: 2000.0,
            deviation_bps: 1000.0,
            peak_bps: 3000.0,
            settled: false,
        }]));
        let dir = tempfile::tempdir().unwrap();
        let path = report.dump_to_json(dir.path()).unwrap();

        let parsed: BenchmarkReport =
            serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap();
        let sweep = parsed.sweep.unwrap();
        assert_eq!(sweep.passes.len(), 1);
        assert_eq!(sweep.best.unwrap().throughput_bps, 2000.0);
        assert_eq!(sweep.peak.unwrap().throughput_bps, 3000.0);
        assert_eq!(parsed.samples[0].resources.unwrap().process_rss_bytes, 4096);
    }
}
