use crate::types::sample::BenchmarkSample;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// A point in time series data
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct TimePoint {
    pub time_s: f64,
    pub value: f64,
}

impl TimePoint {
    pub fn new(time_s: f64, value: f64) -> Self {
        Self { time_s, value }
    }
}

/// Throughput samples in bytes per second, ordered by time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct TimeSeries {
    pub points: Vec<TimePoint>,
}

impl TimeSeries {
    pub fn from_samples(samples: &[BenchmarkSample]) -> Self {
        let points = samples
            .iter()
            .map(|sample| TimePoint::new(sample.time_s, sample.throughput_bps))
            .collect();
        Self { points }
    }

    pub fn push(&mut self, time_s: f64, value: f64) {
        self.points.push(TimePoint::new(time_s, value));
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn moving_average(&self, window_size: usize) -> TimeSeries {
        let window_size = window_size.max(1);
        let mut window: VecDeque<f64> = VecDeque::with_capacity(window_size);
        let mut points = Vec::with_capacity(self.points.len());

        for point in &self.points {
            window.push_back(point.value);
            if window.len() > window_size {
                window.pop_front();
            }

            let avg = window.iter().sum::<f64>() / window.len() as f64;
            points.push(TimePoint::new(point.time_s, avg));
        }

        TimeSeries { points }
    }

    /// Standard deviation of the last `window_size` values divided by their mean.
    pub fn relative_std_dev(&self, window_size: usize) -> Option<f64> {
        if window_size == 0 || self.points.len() < window_size {
            return None;
        }

        let tail = &self.points[self.points.len() - window_size..];
        let mean = tail.iter().map(|p| p.value).sum::<f64>() / window_size as f64;
        if mean <= 0.0 {
            return None;
        }
        let variance = tail
            .iter()
            .map(|p| (p.value - mean).powi(2))
            .sum::<f64>()
            / window_size as f64;
        Some(variance.sqrt() / mean)
    }

    /// True once `window_size` samples exist and their spread is within `tolerance`.
    pub fn is_stable(&self, window_size: usize, tolerance: f64) -> bool {
        self.relative_std_dev(window_size)
            .is_some_and(|deviation| deviation <= tolerance)
    }

    /// Whether a measurement that only ever grows can stop.
    ///
    /// Never before `window_size` samples, always from `2 * window_size` on.
    /// In between it stops as soon as the relative standard deviation of all
    /// samples so far is within `tolerance`.
    pub fn is_settled(&self, window_size: usize, tolerance: f64) -> bool {
        let window_size = window_size.max(1);
        if self.points.len() < window_size {
            return false;
        }
        if self.points.len() >= 2 * window_size {
            return true;
        }
        self.relative_std_dev(self.points.len())
            .is_some_and(|deviation| deviation <= tolerance)
    }

    pub fn mean(&self) -> f64 {
        if self.points.is_empty() {
            return 0.0;
        }
        self.points.iter().map(|p| p.value).sum::<f64>() / self.points.len() as f64
    }

    pub fn std_dev(&self) -> f64 {
        if self.points.is_empty() {
            return 0.0;
        }
        let mean = self.mean();
        let variance = self
            .points
            .iter()
            .map(|p| (p.value - mean).powi(2))
            .sum::<f64>()
            / self.points.len() as f64;
        variance.sqrt()
    }

    pub fn max(&self) -> f64 {
        self.points.iter().map(|p| p.value).fold(0.0, f64::max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series(values: &[f64]) -> TimeSeries {
        let mut series = TimeSeries::default();
        for (i, value) in values.iter().enumerate() {
            series.push(i as f64 * 0.1, *value);
        }
        series
    }

    #[test]
    fn moving_average_should_smooth_over_window() {
        let averaged = series(&[10.0, 20.0, 30.0, 40.0]).moving_average(2);
        let values: Vec<f64> = averaged.points.iter().map(|p| p.value).collect();
        assert_eq!(values, vec![10.0, 15.0, 25.0, 35.0]);
    }

    #[test]
    fn series_shorter_than_window_should_not_be_stable() {
        assert!(!series(&[100.0, 100.0]).is_stable(3, 0.02));
    }

    #[test]
    fn flat_series_should_be_stable() {
        assert!(series(&[50.0, 10.0, 100.0, 100.0, 101.0]).is_stable(3, 0.02));
    }

    #[test]
    fn noisy_series_should_not_be_stable() {
        assert!(!series(&[100.0, 10.0, 200.0]).is_stable(3, 0.02));
    }

    #[test]
    fn settling_should_wait_for_a_full_window() {
        assert!(!series(&[100.0, 100.0]).is_settled(3, 0.02));
        assert!(series(&[100.0, 100.0, 101.0]).is_settled(3, 0.02));
    }

    #[test]
    fn settling_should_measure_spread_since_the_first_sample() {
        // The last three agree, the first one does not.
        let values = [10.0, 100.0, 100.0, 100.0];
        assert!(series(&values).is_stable(3, 0.02));
        assert!(!series(&values).is_settled(3, 0.02));
    }

    #[test]
    fn settling_should_give_up_at_twice_the_window() {
        assert!(!series(&[10.0, 200.0, 10.0, 200.0, 10.0]).is_settled(3, 0.02));
        assert!(series(&[10.0, 200.0, 10.0, 200.0, 10.0, 200.0]).is_settled(3, 0.02));
    }

    #[test]
    fn summary_statistics_should_cover_all_samples() {
        let values = series(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]);
        assert_eq!(values.mean(), 5.0);
        assert_eq!(values.std_dev(), 2.0);
        assert_eq!(values.max(), 9.0);
        assert_eq!(TimeSeries::default().mean(), 0.0);
    }
}
