mod process;
mod resources;
mod sampler;
pub mod sweep;

pub use process::run_consumer;

use crate::args::isolation::Isolation;
use crate::error::PipeBenchError;
use crate::flow::{Flow, FlowConfig};
use crate::transport::{create_transport, TransportKind};
use crate::utils::finish_condition::FinishCondition;
use futures::future::try_join_all;
use pipebench_report::flow::FlowReport;
use pipebench_report::result::BenchmarkResult;
use pipebench_report::sample::BenchmarkSample;
use pipebench_report::sweep::SweepSummary;
use pipebench_report::time_series::TimeSeries;
use process::ChildFlow;
use resources::ResourceMonitor;
use sampler::{counted_bytes, RateMeter, ThroughputSampler};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq)]
pub struct HarnessConfig {
    pub transport: TransportKind,
    pub buffer_size: usize,
    pub flows: u32,
    pub finish: FinishCondition,
    pub reclaim: bool,
    pub isolation: Isolation,
    pub sampling_time: Duration,
    pub moving_average_window: u32,
    pub tolerance: f64,
}

#[derive(Debug, Clone)]
pub struct HarnessOutcome {
    pub result: BenchmarkResult,
    pub flows: Vec<FlowReport>,
    pub samples: Vec<BenchmarkSample>,
    /// `None` when no samples were taken.
    pub stable: Option<bool>,
    pub sweep: Option<SweepSummary>,
}

struct Measurement {
    elapsed: Duration,
    totals: Vec<u64>,
    /// Bytes the consumers had counted when the measured interval ended
    counted: u64,
    samples: Vec<BenchmarkSample>,
}

/// Runs every flow concurrently and aggregates their acknowledged totals.
pub async fn run(config: &HarnessConfig) -> Result<HarnessOutcome, PipeBenchError> {
    info!(
        "Starting {} flows over {}, {} byte buffers, {}",
        config.flows,
        config.transport,
        config.buffer_size,
        config.finish.total_str(config.buffer_size)
    );

    let measurement = match config.isolation {
        Isolation::Thread => run_flows(config).await?,
        Isolation::Process => run_child_flows(config).await?,
    };

    let elapsed_secs = measurement.elapsed.as_secs_f64();
    let total_bytes: u64 = measurement.totals.iter().sum();
    if total_bytes > measurement.counted {
        debug!(
            "{} bytes arrived after the measured interval",
            total_bytes - measurement.counted
        );
    }
    let result = BenchmarkResult::new(elapsed_secs, total_bytes);
    let flows = flow_reports(&measurement.totals, elapsed_secs);

    let window = config.moving_average_window as usize;
    let throughput = TimeSeries::from_samples(&measurement.samples);
    let stable = (!throughput.is_empty()).then(|| throughput.is_stable(window, config.tolerance));
    match stable {
        Some(true) => info!(
            "Throughput was stable over the last {window} samples of {}",
            throughput.len()
        ),
        Some(false) => warn!(
            "Throughput was not stable, relative standard deviation of the last {window} samples: {}",
            throughput
                .relative_std_dev(window)
                .map_or_else(|| "n/a".to_owned(), |deviation| format!("{:.2}%", deviation * 100.0))
        ),
        None => {}
    }

    info!(
        "Finished: {} bytes in {:.3} s",
        result.total_bytes, result.elapsed_secs
    );
    Ok(HarnessOutcome {
        result,
        flows,
        samples: measurement.samples,
        stable,
        sweep: None,
    })
}

/// Creates one transport and flow per id and connects them all.
async fn connect_flows(
    transport: TransportKind,
    count: u32,
    flow_config: FlowConfig,
) -> Result<Vec<Flow>, PipeBenchError> {
    let mut flows = Vec::with_capacity(count as usize);
    for flow_id in 1..=count {
        flows.push(Flow::new(flow_id, create_transport(transport)?, flow_config));
    }
    try_join_all(flows.iter_mut().map(|flow| flow.connect())).await?;
    Ok(flows)
}

fn flow_reports(totals: &[u64], elapsed_secs: f64) -> Vec<FlowReport> {
    totals
        .iter()
        .zip(1u32..)
        .map(|(&bytes, flow_id)| {
            let rate = if elapsed_secs > 0.0 {
                bytes as f64 / elapsed_secs
            } else {
                0.0
            };
            FlowReport::new(flow_id, bytes, rate)
        })
        .collect()
}

async fn stop_flows(flows: &mut [Flow]) -> Result<Vec<u64>, PipeBenchError> {
    let totals = try_join_all(flows.iter_mut().map(|flow| flow.stop())).await?;
    for flow in flows.iter() {
        debug!(
            "Flow #{} → {}, {:?} bytes",
            flow.id(),
            flow.state(),
            flow.bytes_transferred()
        );
    }
    Ok(totals)
}

async fn run_flows(config: &HarnessConfig) -> Result<Measurement, PipeBenchError> {
    let flow_config = FlowConfig {
        buffer_size: config.buffer_size,
        quota: config.finish.quota(),
        reclaim: config.reclaim,
    };
    let mut flows = connect_flows(config.transport, config.flows, flow_config).await?;
    let progress = flows.iter().map(Flow::progress).collect::<Vec<_>>();

    let start = Instant::now();
    for flow in flows.iter_mut() {
        flow.start()?;
    }
    let sampler = (!config.sampling_time.is_zero()).then(|| {
        let meter = RateMeter::new(
            progress.clone(),
            start,
            start,
            config.buffer_size as u64,
            ResourceMonitor::new(),
        );
        ThroughputSampler::spawn(meter, config.sampling_time)
    });

    // A time-bounded run ends when the time is up, a count-bounded one when
    // the consumers have acknowledged the last byte.
    let (end, counted, totals) = match config.finish {
        FinishCondition::Duration(duration) => {
            tokio::time::sleep(duration).await;
            let end = Instant::now();
            let counted = counted_bytes(&progress);
            (end, counted, stop_flows(&mut flows).await?)
        }
        FinishCondition::BufferCount(_) => {
            try_join_all(flows.iter_mut().map(|flow| flow.wait_for_producer())).await?;
            let totals = stop_flows(&mut flows).await?;
            let end = Instant::now();
            (end, counted_bytes(&progress), totals)
        }
    };

    let samples = match sampler {
        Some(sampler) => sampler.finish().await,
        None => Vec::new(),
    };

    Ok(Measurement {
        elapsed: end - start,
        totals,
        counted,
        samples,
    })
}

async fn run_child_flows(config: &HarnessConfig) -> Result<Measurement, PipeBenchError> {
    if !config.sampling_time.is_zero() {
        info!("Throughput sampling is not available with process isolation");
    }

    let mut flows = try_join_all((1..=config.flows).map(|flow_id| {
        ChildFlow::spawn(
            flow_id,
            config.transport,
            config.buffer_size,
            config.finish,
            config.reclaim,
        )
    }))
    .await?;

    let start = Instant::now();
    try_join_all(flows.iter_mut().map(|flow| flow.send())).await?;
    let totals = try_join_all(flows.iter_mut().map(|flow| flow.drain())).await?;
    let end = Instant::now();

    try_join_all(flows.into_iter().map(ChildFlow::reap)).await?;
    Ok(Measurement {
        elapsed: end - start,
        counted: totals.iter().sum(),
        totals,
        samples: Vec::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pipebench_report::prints::ZERO_THROUGHPUT;
    use std::num::NonZeroU64;

    fn config(transport: TransportKind, flows: u32, finish: FinishCondition) -> HarnessConfig {
        HarnessConfig {
            transport,
            buffer_size: 1024,
            flows,
            finish,
            reclaim: false,
            isolation: Isolation::Thread,
            sampling_time: Duration::from_millis(50),
            moving_average_window: 3,
            tolerance: 0.02,
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn one_second_local_run_should_report_about_one_second() {
        let config = config(
            TransportKind::Unix,
            1,
            FinishCondition::Duration(Duration::from_secs(1)),
        );
        let outcome = run(&config).await.unwrap();

        assert!(outcome.result.elapsed_secs >= 1.0);
        assert!(outcome.result.elapsed_secs < 2.0);
        assert!(outcome.result.total_bytes > 0);

        let [elapsed, throughput] = outcome.result.output_lines();
        assert!(elapsed.starts_with("Elapsed: 1."), "{elapsed}");
        assert!(elapsed.ends_with(" sec"), "{elapsed}");
        assert!(throughput.starts_with("Throughput: "));
        assert_ne!(throughput, format!("Throughput: {ZERO_THROUGHPUT}"));

        assert!(outcome.samples.len() >= 10);
        assert!(outcome.samples.iter().all(|sample| sample.buffer_size == 1024));
        assert!(outcome.stable.is_some());
        assert!(outcome.sweep.is_none());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn count_bounded_run_should_sum_exact_flow_totals() {
        for transport in [TransportKind::Unix, TransportKind::Tcp] {
            let count = NonZeroU64::new(500).unwrap();
            let config = config(transport, 3, FinishCondition::BufferCount(count));
            let outcome = run(&config).await.unwrap();

            assert_eq!(outcome.result.total_bytes, 3 * 500 * 1024);
            assert_eq!(outcome.flows.len(), 3);
            for (index, flow) in outcome.flows.iter().enumerate() {
                assert_eq!(flow.flow_id, index as u32 + 1);
                assert_eq!(flow.bytes_transferred, 500 * 1024);
            }
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn time_bounded_flows_should_all_report_traffic() {
        let mut config = config(
            TransportKind::Tcp,
            4,
            FinishCondition::Duration(Duration::from_millis(300)),
        );
        config.reclaim = true;
        config.sampling_time = Duration::ZERO;
        let outcome = run(&config).await.unwrap();

        assert_eq!(outcome.flows.len(), 4);
        assert!(outcome.flows.iter().all(|flow| flow.bytes_transferred > 0));
        assert_eq!(
            outcome.result.total_bytes,
            outcome.flows.iter().map(|flow| flow.bytes_transferred).sum::<u64>()
        );
        assert!(outcome.samples.is_empty());
        assert_eq!(outcome.stable, None);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn count_bounded_interval_should_end_after_every_byte_arrived() {
        for transport in [TransportKind::Unix, TransportKind::Tcp] {
            let count = NonZeroU64::new(2000).unwrap();
            let mut config = config(transport, 2, FinishCondition::BufferCount(count));
            config.buffer_size = 64 * 1024;
            let measurement = run_flows(&config).await.unwrap();

            assert_eq!(measurement.totals, vec![2000 * 64 * 1024; 2]);
            assert_eq!(measurement.counted, 2 * 2000 * 64 * 1024);
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn time_bounded_interval_should_end_before_the_drain() {
        let mut config = config(
            TransportKind::Unix,
            2,
            FinishCondition::Duration(Duration::from_millis(200)),
        );
        config.sampling_time = Duration::ZERO;
        let measurement = run_flows(&config).await.unwrap();

        assert!(measurement.elapsed >= Duration::from_millis(200));
        assert!(measurement.counted <= measurement.totals.iter().sum::<u64>());
    }
}
