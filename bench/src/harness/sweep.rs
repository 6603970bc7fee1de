use super::resources::ResourceMonitor;
use super::sampler::{sampling_interval, RateMeter};
use super::{connect_flows, flow_reports, stop_flows, HarnessOutcome};
use crate::error::PipeBenchError;
use crate::flow::{Flow, FlowConfig};
use crate::transport::TransportKind;
use pipebench_report::prints::format_size;
use pipebench_report::result::BenchmarkResult;
use pipebench_report::sample::BenchmarkSample;
use pipebench_report::sweep::{SweepPass, SweepSummary};
use pipebench_report::time_series::TimeSeries;
use std::time::Duration;
use tokio::time::Instant;
use tracing::info;

/// Measures the same flows at several buffer sizes, one pass per size.
#[derive(Debug, Clone, PartialEq)]
pub struct SweepConfig {
    pub transport: TransportKind,
    pub sizes: Vec<usize>,
    pub flows: u32,
    pub reclaim: bool,
    pub sampling_time: Duration,
    pub moving_average_window: u32,
    pub tolerance: f64,
}

struct PassOutcome {
    pass: SweepPass,
    samples: Vec<BenchmarkSample>,
    totals: Vec<u64>,
    elapsed: Duration,
}

/// Runs one pass per buffer size. A pass samples its flows until the
/// throughput settles, then stops them before the next size starts.
pub async fn run(config: &SweepConfig) -> Result<HarnessOutcome, PipeBenchError> {
    if config.sampling_time.is_zero() {
        return Err(PipeBenchError::invalid_argument(
            "a size sweep needs a sampling time greater than zero",
        ));
    }
    if config.sizes.is_empty() {
        return Err(PipeBenchError::invalid_argument(
            "a size sweep needs at least one buffer size",
        ));
    }
    info!(
        "Sweeping {} buffer sizes from {} to {} with {} flows over {}",
        config.sizes.len(),
        config.sizes.first().copied().unwrap_or_default(),
        config.sizes.last().copied().unwrap_or_default(),
        config.flows,
        config.transport
    );

    let origin = Instant::now();
    let mut resources = ResourceMonitor::new();
    let mut passes = Vec::with_capacity(config.sizes.len());
    let mut samples = Vec::new();
    let mut totals = vec![0u64; config.flows as usize];
    let mut elapsed = Duration::ZERO;

    for &buffer_size in &config.sizes {
        let (outcome, monitor) = run_pass(config, buffer_size, origin, resources.take()).await?;
        resources = monitor;
        info!(
            "{}: {} samples, {:.0} B/s average, {:.0} B/s peak",
            format_size(outcome.pass.buffer_size),
            outcome.pass.samples,
            outcome.pass.average_bps,
            outcome.pass.peak_bps
        );
        for (total, bytes) in totals.iter_mut().zip(&outcome.totals) {
            *total += bytes;
        }
        elapsed += outcome.elapsed;
        samples.extend(outcome.samples);
        passes.push(outcome.pass);
    }

    let elapsed_secs = elapsed.as_secs_f64();
    let result = BenchmarkResult::new(elapsed_secs, totals.iter().sum());
    let stable = passes.iter().all(|pass| pass.settled);
    Ok(HarnessOutcome {
        result,
        flows: flow_reports(&totals, elapsed_secs),
        samples,
        stable: Some(stable),
        sweep: Some(SweepSummary::new(passes)),
    })
}

async fn run_pass(
    config: &SweepConfig,
    buffer_size: usize,
    origin: Instant,
    resources: Option<ResourceMonitor>,
) -> Result<(PassOutcome, Option<ResourceMonitor>), PipeBenchError> {
    let flow_config = FlowConfig {
        buffer_size,
        quota: None,
        reclaim: config.reclaim,
    };
    let mut flows = connect_flows(config.transport, config.flows, flow_config).await?;
    let progress = flows.iter().map(Flow::progress).collect::<Vec<_>>();

    let start = Instant::now();
    for flow in flows.iter_mut() {
        flow.start()?;
    }
    let mut meter = RateMeter::new(progress, origin, start, buffer_size as u64, resources);
    let mut interval = sampling_interval(start, config.sampling_time);
    let window = config.moving_average_window as usize;
    let mut series = TimeSeries::default();
    let mut samples = Vec::new();
    while !series.is_settled(window, config.tolerance) {
        let now = interval.tick().await;
        if let Some(sample) = meter.sample(now) {
            series.push(sample.time_s, sample.throughput_bps);
            samples.push(sample);
        }
    }
    let end = Instant::now();
    let totals = stop_flows(&mut flows).await?;

    let outcome = PassOutcome {
        pass: SweepPass::from_series(buffer_size as u64, &series, config.tolerance),
        samples,
        totals,
        elapsed: end - start,
    };
    Ok((outcome, meter.into_resources()))
}
