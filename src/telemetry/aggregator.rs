//! Windowed statistics over recorded calls.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use serde::Serialize;

use crate::config::{HealthThresholds, TelemetryConfig};
use crate::telemetry::health::{self, HealthReport};
use crate::telemetry::metric::{now_ms, CallMetric};

/// Aggregates for one telemetry window.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TelemetryMetrics {
    pub total_calls: u64,
    pub successful_calls: u64,
    pub failed_calls: u64,
    pub success_rate: f64,
    pub error_rate: f64,
    pub avg_latency_ms: f64,
    pub p50_latency_ms: u64,
    pub p95_latency_ms: u64,
    pub p99_latency_ms: u64,
    pub messages_per_second: f64,
    pub peak_messages_per_second: u64,
    pub rate_limit_hits: u64,
    /// Provider error code → count, over failed calls that carried a code.
    pub error_distribution: BTreeMap<i64, u64>,
    pub window_start: u64,
    pub window_end: u64,
}

/// Bounded, thread-safe buffer of call metrics.
pub struct TelemetryAggregator {
    calls: Mutex<VecDeque<CallMetric>>,
    capacity: usize,
    window: Duration,
    rate_limit_code: i64,
    thresholds: HealthThresholds,
}

impl TelemetryAggregator {
    pub fn new(config: &TelemetryConfig) -> Self {
        Self {
            calls: Mutex::new(VecDeque::with_capacity(config.capacity.min(1024))),
            capacity: config.capacity.max(1),
            window: Duration::from_millis(config.window_ms),
            rate_limit_code: config.rate_limit_code,
            thresholds: config.thresholds,
        }
    }

    /// Append a call, evicting the oldest once capacity is exceeded.
    pub fn record_call(&self, metric: CallMetric) {
        let mut calls = self.calls.lock().expect("telemetry lock poisoned");
        calls.push_back(metric);
        while calls.len() > self.capacity {
            calls.pop_front();
        }
    }

    /// Calls currently buffered, regardless of window.
    pub fn len(&self) -> usize {
        self.calls.lock().expect("telemetry lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Default window used by the health checks.
    pub fn window(&self) -> Duration {
        self.window
    }

    /// Aggregates over the trailing `window`.
    pub fn metrics(&self, window: Duration) -> TelemetryMetrics {
        self.metrics_at(window, now_ms())
    }

    /// Aggregates over `[now_ms - window, now_ms]`.
    pub fn metrics_at(&self, window: Duration, now_ms: u64) -> TelemetryMetrics {
        let window_ms = window.as_millis() as u64;
        let window_start = now_ms.saturating_sub(window_ms);

        let in_window: Vec<CallMetric> = {
            let calls = self.calls.lock().expect("telemetry lock poisoned");
            calls
                .iter()
                .filter(|c| c.timestamp >= window_start && c.timestamp <= now_ms)
                .cloned()
                .collect()
        };

        let mut metrics = TelemetryMetrics {
            window_start,
            window_end: now_ms,
            ..TelemetryMetrics::default()
        };
        if in_window.is_empty() {
            return metrics;
        }

        let total = in_window.len() as u64;
        let successful = in_window.iter().filter(|c| c.success).count() as u64;
        let failed = total - successful;

        let mut latencies: Vec<u64> = in_window.iter().map(|c| c.latency_ms).collect();
        latencies.sort_unstable();

        let mut per_second: HashMap<u64, u64> = HashMap::new();
        for call in &in_window {
            *per_second.entry(call.timestamp / 1000).or_insert(0) += 1;
        }

        for call in in_window.iter().filter(|c| !c.success) {
            if let Some(code) = call.error_code {
                *metrics.error_distribution.entry(code).or_insert(0) += 1;
                if code == self.rate_limit_code {
                    metrics.rate_limit_hits += 1;
                }
            }
        }

        let window_secs = (window_ms as f64 / 1000.0).max(0.001);

        metrics.total_calls = total;
        metrics.successful_calls = successful;
        metrics.failed_calls = failed;
        metrics.success_rate = successful as f64 / total as f64 * 100.0;
        metrics.error_rate = failed as f64 / total as f64 * 100.0;
        metrics.avg_latency_ms = latencies.iter().sum::<u64>() as f64 / total as f64;
        metrics.p50_latency_ms = percentile(&latencies, 50.0);
        metrics.p95_latency_ms = percentile(&latencies, 95.0);
        metrics.p99_latency_ms = percentile(&latencies, 99.0);
        metrics.messages_per_second = total as f64 / window_secs;
        metrics.peak_messages_per_second = per_second.values().copied().max().unwrap_or(0);
        metrics
    }

    /// Whether the default window meets `thresholds`.
    pub fn is_healthy(&self, thresholds: &HealthThresholds) -> bool {
        health::evaluate(&self.metrics(self.window), thresholds).is_empty()
    }

    /// Health of the default window against the configured thresholds.
    pub fn health_status(&self) -> HealthReport {
        let metrics = self.metrics(self.window);
        let issues = health::evaluate(&metrics, &self.thresholds);
        HealthReport {
            healthy: issues.is_empty(),
            metrics,
            issues,
        }
    }

    pub fn clear(&self) {
        self.calls.lock().expect("telemetry lock poisoned").clear();
    }
}

/// Element at 1-based rank `ceil(p/100 * n)` of a sorted slice.
fn percentile(sorted: &[u64], p: f64) -> u64 {
    if sorted.is_empty() {
        return 0;
    }
    let rank = ((p / 100.0) * sorted.len() as f64).ceil() as usize;
    sorted[rank.clamp(1, sorted.len()) - 1]
}
