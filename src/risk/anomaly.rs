//! Execution anomaly detection
//!
//! Compares recent latency, slippage and failure rate against a rolling
//! baseline and flags spikes.

use crate::validation::{check_range, ValidationError};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Spike thresholds, as multiples of the baseline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyConfig {
    pub latency_spike_multiple: f64,
    pub slippage_spike_multiple: f64,
    pub failure_rate_spike_multiple: f64,
    /// Baseline samples required before anything is flagged
    #[serde(default = "default_min_samples")]
    pub min_samples: usize,
}

fn default_min_samples() -> usize {
    20
}

impl Default for AnomalyConfig {
    fn default() -> Self {
        Self {
            latency_spike_multiple: 3.0,
            slippage_spike_multiple: 3.0,
            failure_rate_spike_multiple: 2.0,
            min_samples: default_min_samples(),
        }
    }
}

impl AnomalyConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        check_range(
            "anomaly.latency_spike_multiple",
            self.latency_spike_multiple,
            1.0,
            1_000.0,
        )?;
        check_range(
            "anomaly.slippage_spike_multiple",
            self.slippage_spike_multiple,
            1.0,
            1_000.0,
        )?;
        check_range(
            "anomaly.failure_rate_spike_multiple",
            self.failure_rate_spike_multiple,
            1.0,
            1_000.0,
        )
    }
}

/// Baseline and current execution metrics
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RollingMetrics {
    pub baseline_latency_ms: f64,
    pub baseline_slippage_bps: f64,
    pub baseline_failure_rate: f64,
    pub current_latency_ms: f64,
    pub current_slippage_bps: f64,
    pub current_failure_rate: f64,
    /// Observations behind the baseline
    pub sample_count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnomalyKind {
    LatencySpike,
    SlippageSpike,
    FailureRateSpike,
}

/// Outcome of an anomaly check
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyDecision {
    pub detected: bool,
    pub kind: Option<AnomalyKind>,
    /// Current value that crossed the threshold
    pub observed: Option<f64>,
    pub threshold: Option<f64>,
}

impl AnomalyDecision {
    pub fn clear() -> Self {
        Self {
            detected: false,
            kind: None,
            observed: None,
            threshold: None,
        }
    }

    fn spike(kind: AnomalyKind, observed: f64, threshold: f64) -> Self {
        Self {
            detected: true,
            kind: Some(kind),
            observed: Some(observed),
            threshold: Some(threshold),
        }
    }
}

/// Check current metrics against their baselines
///
/// Order is latency, slippage, failure rate; the first spike wins. A metric
/// with a non-positive baseline is never flagged.
pub fn check_anomalies(config: &AnomalyConfig, metrics: &RollingMetrics) -> AnomalyDecision {
    if metrics.sample_count < config.min_samples {
        return AnomalyDecision::clear();
    }

    let checks = [
        (
            AnomalyKind::LatencySpike,
            metrics.baseline_latency_ms,
            metrics.current_latency_ms,
            config.latency_spike_multiple,
        ),
        (
            AnomalyKind::SlippageSpike,
            metrics.baseline_slippage_bps,
            metrics.current_slippage_bps,
            config.slippage_spike_multiple,
        ),
        (
            AnomalyKind::FailureRateSpike,
            metrics.baseline_failure_rate,
            metrics.current_failure_rate,
            config.failure_rate_spike_multiple,
        ),
    ];

    for (kind, baseline, current, multiple) in checks {
        if baseline <= 0.0 {
            continue;
        }
        let threshold = baseline * multiple;
        if current > threshold {
            return AnomalyDecision::spike(kind, current, threshold);
        }
    }

    AnomalyDecision::clear()
}

/// One observed execution
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExecutionSample {
    pub latency_ms: f64,
    pub slippage_bps: f64,
    pub failed: bool,
}

#[derive(Default)]
struct Means {
    latency_ms: f64,
    slippage_bps: f64,
    failure_rate: f64,
}

fn means<'a>(samples: impl Iterator<Item = &'a ExecutionSample>) -> (Means, usize) {
    let mut acc = Means::default();
    let mut n = 0usize;
    for s in samples {
        acc.latency_ms += s.latency_ms;
        acc.slippage_bps += s.slippage_bps;
        acc.failure_rate += if s.failed { 1.0 } else { 0.0 };
        n += 1;
    }
    if n > 0 {
        let nf = n as f64;
        acc.latency_ms /= nf;
        acc.slippage_bps /= nf;
        acc.failure_rate /= nf;
    }
    (acc, n)
}

/// Bounded window of recent executions
///
/// The newest `recent` samples form the current reading; everything older
/// in the window forms the baseline.
#[derive(Debug, Clone)]
pub struct MetricsWindow {
    capacity: usize,
    recent: usize,
    samples: VecDeque<ExecutionSample>,
}

impl MetricsWindow {
    pub fn new(capacity: usize, recent: usize) -> Self {
        let capacity = capacity.max(2);
        Self {
            capacity,
            recent: recent.clamp(1, capacity - 1),
            samples: VecDeque::with_capacity(capacity),
        }
    }

    /// Add an observation, evicting the oldest when full
    pub fn push(&mut self, sample: ExecutionSample) {
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(sample);
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }

    /// Baseline and current means over the window
    pub fn rolling_metrics(&self) -> RollingMetrics {
        let recent = self.recent.min(self.samples.len());
        let split = self.samples.len() - recent;
        let (baseline, sample_count) = means(self.samples.iter().take(split));
        let (current, _) = means(self.samples.iter().skip(split));
        RollingMetrics {
            baseline_latency_ms: baseline.latency_ms,
            baseline_slippage_bps: baseline.slippage_bps,
            baseline_failure_rate: baseline.failure_rate,
            current_latency_ms: current.latency_ms,
            current_slippage_bps: current.slippage_bps,
            current_failure_rate: current.failure_rate,
            sample_count,
        }
    }
}
