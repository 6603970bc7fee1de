use super::command::PipeBenchCommand;
use super::defaults::*;
use super::isolation::Isolation;
use super::output::BenchmarkOutputArgs;
use crate::error::PipeBenchError;
use crate::harness::sweep::SweepConfig;
use crate::harness::HarnessConfig;
use crate::transport::TransportKind;
use crate::utils::finish_condition::FinishCondition;
use crate::utils::parse::{parse_buffer_size, parse_duration};
use crate::utils::size_range::SizeRange;
use clap::Parser;
use pipebench_report::mode::BenchmarkMode;
use pipebench_report::params::BenchmarkParams;
use std::num::{NonZeroU32, NonZeroU64};
use std::path::Path;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None, args_conflicts_with_subcommands = true)]
pub struct PipeBenchArgs {
    #[command(subcommand)]
    pub command: Option<PipeBenchCommand>,

    /// Transport carrying the bytes of every flow
    #[arg(long, value_enum, default_value_t = DEFAULT_TRANSPORT)]
    pub transport: TransportKind,

    /// Buffer size in bytes, a k, m or g suffix multiplies by 1024, 1024^2 or 1024^3
    #[arg(long = "size", short = 's', default_value = DEFAULT_BUFFER_SIZE, value_parser = parse_buffer_size)]
    pub buffer_size: usize,

    /// Buffers sent per flow, or the number of concurrent flows with --time or --sweep
    #[arg(long, short = 'n')]
    pub count: Option<NonZeroU64>,

    /// Run for this long instead of sending a fixed number of buffers (e.g. 1.5, 10s, 2m)
    #[arg(long, short = 't', value_parser = parse_duration)]
    pub time: Option<Duration>,

    /// Number of concurrent flows in count-bounded mode
    #[arg(long)]
    pub flows: Option<NonZeroU32>,

    /// Where consumers run, process isolation is available in count-bounded mode only
    #[arg(long, value_enum, default_value_t = Isolation::Thread)]
    pub isolation: Isolation,

    /// Measure every power-of-two multiple of <min> up to <max> until its throughput settles
    #[arg(long, value_name = "MIN..MAX", conflicts_with_all = ["buffer_size", "time", "flows", "isolation"])]
    pub sweep: Option<SizeRange>,

    /// Receive into a fresh buffer per read and destroy it on a background thread
    #[arg(long, default_value_t = DEFAULT_RECLAIM)]
    pub reclaim: bool,

    /// Interval of throughput sampling, zero disables sampling
    #[arg(long, default_value = DEFAULT_SAMPLING_TIME, value_parser = parse_duration)]
    pub sampling_time: Duration,

    /// Window size for the moving average and the stability check of the samples
    #[arg(long, default_value_t = DEFAULT_MOVING_AVERAGE_WINDOW)]
    pub moving_average_window: u32,

    /// Largest relative standard deviation of the samples still counted as stable
    #[arg(long, default_value_t = DEFAULT_TOLERANCE)]
    pub tolerance: f64,

    /// Log progress at info level
    #[arg(long, short = 'v', default_value_t = false)]
    pub verbose: bool,

    #[command(flatten)]
    pub output: BenchmarkOutputArgs,
}

impl PipeBenchArgs {
    pub fn mode(&self) -> BenchmarkMode {
        match (self.sweep, self.time) {
            (Some(_), _) => BenchmarkMode::Sweep,
            (None, Some(_)) => BenchmarkMode::TimeBounded,
            (None, None) => BenchmarkMode::CountBounded,
        }
    }

    /// Whether `-n` counts flows rather than buffers.
    fn count_is_flows(&self) -> bool {
        self.time.is_some() || self.sweep.is_some()
    }

    pub fn validate(&self) -> Result<(), PipeBenchError> {
        if self.sweep.is_some() && self.sampling_time.is_zero() {
            return Err(PipeBenchError::invalid_argument(
                "--sweep needs a --sampling-time greater than zero",
            ));
        }
        if !(self.tolerance.is_finite() && self.tolerance >= 0.0) {
            return Err(PipeBenchError::invalid_argument(
                "--tolerance must be a non-negative number",
            ));
        }

        if self.count_is_flows() {
            if self.flows.is_some() {
                return Err(PipeBenchError::invalid_argument(
                    "--flows cannot be used with --time, -n sets the number of flows in time-bounded mode",
                ));
            }
            if self.isolation == Isolation::Process {
                return Err(PipeBenchError::invalid_argument(
                    "--isolation process requires count-bounded mode, remove --time",
                ));
            }
            if let Some(count) = self.count {
                if u32::try_from(count.get()).is_err() {
                    return Err(PipeBenchError::invalid_argument(format!(
                        "cannot run {count} concurrent flows"
                    )));
                }
            }
        } else if self
            .count
            .unwrap_or(DEFAULT_BUFFERS_PER_FLOW)
            .get()
            .checked_mul(self.buffer_size as u64)
            .is_none()
        {
            return Err(PipeBenchError::invalid_argument(
                "buffer size times buffer count does not fit in 64 bits",
            ));
        }

        if self.moving_average_window == 0 {
            return Err(PipeBenchError::invalid_argument(
                "--moving-average-window must be greater than zero",
            ));
        }

        if self.output.output_dir.is_none()
            && (self.output.identifier.is_some() || self.output.remark.is_some())
        {
            return Err(PipeBenchError::invalid_argument(
                "--identifier and --remark can only be used with --output-dir",
            ));
        }
        Ok(())
    }

    pub fn flows(&self) -> u32 {
        if self.count_is_flows() {
            self.count
                .map(|count| u32::try_from(count.get()).unwrap_or(u32::MAX))
                .unwrap_or(DEFAULT_NUMBER_OF_FLOWS.get())
        } else {
            self.flows.unwrap_or(DEFAULT_NUMBER_OF_FLOWS).get()
        }
    }

    pub fn finish_condition(&self) -> FinishCondition {
        match self.time {
            Some(duration) => FinishCondition::Duration(duration),
            None => FinishCondition::BufferCount(self.count.unwrap_or(DEFAULT_BUFFERS_PER_FLOW)),
        }
    }

    pub fn output_dir(&self) -> Option<&Path> {
        self.output.output_dir.as_deref()
    }

    pub fn harness_config(&self) -> HarnessConfig {
        HarnessConfig {
            transport: self.transport,
            buffer_size: self.buffer_size,
            flows: self.flows(),
            finish: self.finish_condition(),
            reclaim: self.reclaim,
            isolation: self.isolation,
            sampling_time: self.sampling_time,
            moving_average_window: self.moving_average_window,
            tolerance: self.tolerance,
        }
    }

    /// Configuration of a size sweep, `None` unless `--sweep` was given.
    pub fn sweep_config(&self) -> Option<SweepConfig> {
        self.sweep.map(|range| SweepConfig {
            transport: self.transport,
            sizes: range.sizes(),
            flows: self.flows(),
            reclaim: self.reclaim,
            sampling_time: self.sampling_time,
            moving_average_window: self.moving_average_window,
            tolerance: self.tolerance,
        })
    }
}

/// Shortest command line reproducing this run, skipping default values.
fn recreate_bench_command(args: &PipeBenchArgs) -> String {
    let mut parts = vec!["pipebench".to_string()];

    if args.transport != DEFAULT_TRANSPORT {
        parts.push(format!("--transport {}", args.transport));
    }
    match (args.sweep, args.time) {
        (Some(range), _) => {
            parts.push(format!("--sweep {range}"));
            if args.flows() != DEFAULT_NUMBER_OF_FLOWS.get() {
                parts.push(format!("-n {}", args.flows()));
            }
        }
        (None, Some(duration)) => {
            parts.push(format!("-s {}", args.buffer_size));
            parts.push(format!("-t {}", duration.as_secs_f64()));
            if args.flows() != DEFAULT_NUMBER_OF_FLOWS.get() {
                parts.push(format!("-n {}", args.flows()));
            }
        }
        (None, None) => {
            parts.push(format!("-s {}", args.buffer_size));
            let count = args.count.unwrap_or(DEFAULT_BUFFERS_PER_FLOW);
            if count != DEFAULT_BUFFERS_PER_FLOW {
                parts.push(format!("-n {count}"));
            }
            if args.flows() != DEFAULT_NUMBER_OF_FLOWS.get() {
                parts.push(format!("--flows {}", args.flows()));
            }
            if args.isolation == Isolation::Process {
                parts.push("--isolation process".to_string());
            }
        }
    }

    if args.reclaim != DEFAULT_RECLAIM {
        parts.push("--reclaim".to_string());
    }
    if args.tolerance != DEFAULT_TOLERANCE {
        parts.push(format!("--tolerance {}", args.tolerance));
    }
    if let Some(ref remark) = args.output.remark {
        parts.push(format!("--remark '{remark}'"));
    }

    parts.join(" ")
}

impl From<&PipeBenchArgs> for BenchmarkParams {
    fn from(args: &PipeBenchArgs) -> Self {
        let sweep_sizes = args
            .sweep
            .map(|range| range.sizes().into_iter().map(|size| size as u64).collect());
        let finish = args.sweep.is_none().then(|| args.finish_condition());
        BenchmarkParams {
            mode: args.mode(),
            transport: args.transport.into(),
            isolation: args.isolation.into(),
            buffer_size: args.buffer_size as u64,
            flows: args.flows(),
            buffers_per_flow: finish.and_then(|finish| finish.quota()),
            duration_secs: finish
                .and_then(|finish| finish.duration())
                .map(|duration| duration.as_secs_f64()),
            reclaim: args.reclaim,
            sampling_time_ms: args.sampling_time.as_millis() as u64,
            moving_average_window: args.moving_average_window,
            tolerance: args.tolerance,
            sweep_sizes,
            identifier: args.output.identifier(),
            remark: args.output.remark.clone(),
            bench_command: recreate_bench_command(args),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> PipeBenchArgs {
        PipeBenchArgs::try_parse_from(std::iter::once("pipebench").chain(args.iter().copied()))
            .unwrap()
    }

    #[test]
    fn defaults_should_select_one_count_bounded_flow() {
        let args = parse(&[]);
        args.validate().unwrap();
        assert_eq!(args.transport, TransportKind::Unix);
        assert_eq!(args.buffer_size, 1024);
        assert_eq!(args.mode(), BenchmarkMode::CountBounded);
        assert_eq!(args.flows(), 1);
        assert_eq!(args.finish_condition().quota(), Some(1000));
        assert_eq!(args.sampling_time, Duration::from_millis(100));
    }

    #[test]
    fn count_should_mean_flows_in_time_bounded_mode() {
        let args = parse(&["--transport", "tcp", "-s", "4k", "-n", "4", "-t", "1.5"]);
        args.validate().unwrap();
        assert_eq!(args.mode(), BenchmarkMode::TimeBounded);
        assert_eq!(args.flows(), 4);
        assert_eq!(
            args.finish_condition(),
            FinishCondition::Duration(Duration::from_millis(1500))
        );
        assert_eq!(args.buffer_size, 4096);
    }

    #[test]
    fn count_should_mean_buffers_per_flow_in_count_bounded_mode() {
        let args = parse(&["-n", "50", "--flows", "3"]);
        args.validate().unwrap();
        assert_eq!(args.flows(), 3);
        assert_eq!(args.finish_condition().quota(), Some(50));
    }

    #[test]
    fn flows_and_process_isolation_should_be_rejected_with_time() {
        assert!(parse(&["-t", "1", "--flows", "2"]).validate().is_err());
        assert!(parse(&["-t", "1", "--isolation", "process"])
            .validate()
            .is_err());
        assert!(parse(&["--isolation", "process"]).validate().is_ok());
    }

    #[test]
    fn invalid_values_should_fail_to_parse() {
        for args in [
            vec!["pipebench", "-s", "12x"],
            vec!["pipebench", "-s", "0"],
            vec!["pipebench", "--transport", "pipe"],
            vec!["pipebench", "-t", "soon"],
            vec!["pipebench", "-n", "0"],
        ] {
            assert!(PipeBenchArgs::try_parse_from(args.clone()).is_err(), "{args:?}");
        }
    }

    #[test]
    fn remark_should_require_output_dir() {
        assert!(parse(&["--remark", "x"]).validate().is_err());
        assert!(parse(&["--remark", "x", "-o", "out"]).validate().is_ok());
    }

    #[test]
    fn bench_command_should_skip_defaults() {
        let params = BenchmarkParams::from(&parse(&["-s", "2k", "--flows", "2", "--reclaim"]));
        assert_eq!(params.bench_command, "pipebench -s 2048 --flows 2 --reclaim");
        assert_eq!(params.buffers_per_flow, Some(1000));
        assert_eq!(params.duration_secs, None);
    }

    #[test]
    fn sweep_should_take_flows_from_count() {
        let args = parse(&["--sweep", "16k..64k", "-n", "3", "--transport", "tcp"]);
        args.validate().unwrap();
        assert_eq!(args.mode(), BenchmarkMode::Sweep);
        assert_eq!(args.flows(), 3);

        let config = args.sweep_config().unwrap();
        assert_eq!(config.sizes, vec![16 * 1024, 32 * 1024, 64 * 1024]);
        assert_eq!(config.flows, 3);
        assert_eq!(config.tolerance, DEFAULT_TOLERANCE);
        assert!(parse(&[]).sweep_config().is_none());
    }

    #[test]
    fn sweep_should_conflict_with_fixed_size_and_bounds() {
        for extra in [
            vec!["-s", "4k"],
            vec!["-t", "1"],
            vec!["--flows", "2"],
            vec!["--isolation", "process"],
        ] {
            let args = ["pipebench", "--sweep", "1k..4k"].into_iter().chain(extra.clone());
            assert!(PipeBenchArgs::try_parse_from(args).is_err(), "{extra:?}");
        }
    }

    #[test]
    fn sweep_should_require_sampling() {
        assert!(parse(&["--sweep", "1k..4k", "--sampling-time", "0"])
            .validate()
            .is_err());
    }

    #[test]
    fn negative_tolerance_should_be_rejected() {
        assert!(parse(&["--tolerance=-0.1"]).validate().is_err());
        assert!(parse(&["--tolerance", "0.05"]).validate().is_ok());
    }

    #[test]
    fn sweep_params_should_list_sizes_without_bounds() {
        let params = BenchmarkParams::from(&parse(&["--sweep", "1k..4k", "-n", "2"]));
        assert_eq!(params.mode, BenchmarkMode::Sweep);
        assert_eq!(params.sweep_sizes, Some(vec![1024, 2048, 4096]));
        assert_eq!(params.buffers_per_flow, None);
        assert_eq!(params.duration_secs, None);
        assert_eq!(params.bench_command, "pipebench --sweep 1024..4096 -n 2");
    }

    #[test]
    fn examples_subcommand_should_parse() {
        let args = parse(&["examples"]);
        assert!(matches!(args.command, Some(PipeBenchCommand::Examples)));
    }
}
