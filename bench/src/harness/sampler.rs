use super::resources::ResourceMonitor;
use pipebench_report::sample::BenchmarkSample;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tracing::{debug, warn};

pub(crate) fn counted_bytes(progress: &[Arc<AtomicU64>]) -> u64 {
    progress
        .iter()
        .map(|counter| counter.load(Ordering::Relaxed))
        .sum()
}

/// Ticks every `sampling_time`, the first tick one period after `start`.
pub(crate) fn sampling_interval(start: Instant, sampling_time: Duration) -> Interval {
    let mut interval = tokio::time::interval_at(start + sampling_time, sampling_time);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval
}

/// Turns the live byte counters of running flows into one sample per reading.
pub(crate) struct RateMeter {
    progress: Vec<Arc<AtomicU64>>,
    origin: Instant,
    buffer_size: u64,
    resources: Option<ResourceMonitor>,
    previous_time: Instant,
    previous_bytes: u64,
}

impl RateMeter {
    /// Rates are measured from `start`, sample times from `origin`.
    pub fn new(
        progress: Vec<Arc<AtomicU64>>,
        origin: Instant,
        start: Instant,
        buffer_size: u64,
        resources: Option<ResourceMonitor>,
    ) -> Self {
        let previous_bytes = counted_bytes(&progress);
        Self {
            progress,
            origin,
            buffer_size,
            resources,
            previous_time: start,
            previous_bytes,
        }
    }

    pub fn start(&self) -> Instant {
        self.previous_time
    }

    /// Throughput since the previous reading, `None` if no time has passed.
    pub fn sample(&mut self, now: Instant) -> Option<BenchmarkSample> {
        let bytes = counted_bytes(&self.progress);
        let interval_secs = now.saturating_duration_since(self.previous_time).as_secs_f64();
        if interval_secs <= 0.0 {
            return None;
        }
        let throughput_bps = bytes.saturating_sub(self.previous_bytes) as f64 / interval_secs;
        self.previous_time = now;
        self.previous_bytes = bytes;

        let time_s = now.saturating_duration_since(self.origin).as_secs_f64();
        debug!("Sample at {time_s:.3}s: {throughput_bps:.0} B/s");
        Some(BenchmarkSample {
            time_s,
            buffer_size: self.buffer_size,
            throughput_bps,
            resources: self.resources.as_mut().and_then(ResourceMonitor::sample),
        })
    }

    pub fn into_resources(self) -> Option<ResourceMonitor> {
        self.resources
    }
}

/// Samples a [`RateMeter`] on a background task until finished.
pub(crate) struct ThroughputSampler {
    stop: watch::Sender<bool>,
    handle: JoinHandle<Vec<BenchmarkSample>>,
}

impl ThroughputSampler {
    pub fn spawn(meter: RateMeter, sampling_time: Duration) -> Self {
        let (stop, stop_rx) = watch::channel(false);
        let handle = tokio::spawn(Self::run(meter, sampling_time, stop_rx));
        Self { stop, handle }
    }

    async fn run(
        mut meter: RateMeter,
        sampling_time: Duration,
        mut stop: watch::Receiver<bool>,
    ) -> Vec<BenchmarkSample> {
        let mut samples = Vec::new();
        let mut interval = sampling_interval(meter.start(), sampling_time);
        loop {
            tokio::select! {
                now = interval.tick() => {
                    samples.extend(meter.sample(now));
                }
                changed = stop.changed() => {
                    if changed.is_err() || *stop.borrow() {
                        break;
                    }
                }
            }
        }
        samples
    }

    /// Stops sampling and returns the samples recorded so far.
    pub async fn finish(self) -> Vec<BenchmarkSample> {
        let _ = self.stop.send(true);
        match self.handle.await {
            Ok(samples) => samples,
            Err(e) => {
                warn!("Throughput sampler failed: {e}");
                Vec::new()
            }
        }
    }
}
