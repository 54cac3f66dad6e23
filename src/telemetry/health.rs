//! Health evaluation of a telemetry window.

use serde::Serialize;

use crate::config::HealthThresholds;
use crate::telemetry::aggregator::TelemetryMetrics;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthReport {
    pub healthy: bool,
    pub metrics: TelemetryMetrics,
    pub issues: Vec<String>,
}

/// Threshold violations of `metrics`. An empty window has none.
pub fn evaluate(metrics: &TelemetryMetrics, thresholds: &HealthThresholds) -> Vec<String> {
    let mut issues = Vec::new();
    if metrics.total_calls == 0 {
        return issues;
    }

    if metrics.success_rate < thresholds.min_success_rate {
        issues.push(format!(
            "Success rate {:.2}% is below {:.2}%",
            metrics.success_rate, thresholds.min_success_rate
        ));
    }
    if metrics.avg_latency_ms > thresholds.max_avg_latency_ms {
        issues.push(format!(
            "Average latency {:.0}ms exceeds {:.0}ms",
            metrics.avg_latency_ms, thresholds.max_avg_latency_ms
        ));
    }
    if metrics.error_rate > thresholds.max_error_rate {
        issues.push(format!(
            "Error rate {:.2}% exceeds {:.2}%",
            metrics.error_rate, thresholds.max_error_rate
        ));
    }
    issues
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_latency_issue() {
        let metrics = TelemetryMetrics {
            total_calls: 10,
            successful_calls: 10,
            success_rate: 100.0,
            avg_latency_ms: 2500.0,
            ..TelemetryMetrics::default()
        };
        let issues = evaluate(&metrics, &HealthThresholds::default());
        assert_eq!(issues, vec!["Average latency 2500ms exceeds 2000ms".to_string()]);
    }

    #[test]
    fn test_custom_thresholds() {
        let metrics = TelemetryMetrics {
            total_calls: 10,
            successful_calls: 9,
            failed_calls: 1,
            success_rate: 90.0,
            error_rate: 10.0,
            avg_latency_ms: 100.0,
            ..TelemetryMetrics::default()
        };
        let lenient = HealthThresholds {
            min_success_rate: 80.0,
            max_avg_latency_ms: 500.0,
            max_error_rate: 20.0,
        };
        assert!(evaluate(&metrics, &lenient).is_empty());
        assert_eq!(evaluate(&metrics, &HealthThresholds::default()).len(), 2);
    }
}
