//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define dispatch metrics (jobs, retries, provider calls, limiter waits)
//! - Expose a Prometheus-compatible metrics endpoint
//!
//! # Metrics
//! - `dispatch_jobs_enqueued_total` (counter)
//! - `dispatch_jobs_finished_total` (counter): by outcome
//! - `dispatch_job_retries_total` (counter): by action
//! - `dispatch_queue_depth` (gauge): waiting jobs
//! - `dispatch_provider_calls_total` (counter): by endpoint, status
//! - `dispatch_provider_latency_seconds` (histogram): by endpoint
//! - `dispatch_rate_limit_wait_seconds` (histogram)
//! - `dispatch_alerts_total` (counter): by provider code
//! - `dispatch_subscriptions_total` (counter): by operation, outcome

use std::net::SocketAddr;
use std::time::Duration;

use metrics::{describe_counter, describe_gauge, describe_histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus recorder and its HTTP listener.
///
/// Must run inside a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    register_metrics();
    tracing::info!(address = %addr, "Prometheus metrics endpoint started");
    Ok(())
}

fn register_metrics() {
    describe_counter!("dispatch_jobs_enqueued_total", "Jobs accepted by the queue");
    describe_counter!("dispatch_jobs_finished_total", "Jobs that reached a terminal state");
    describe_counter!("dispatch_job_retries_total", "Jobs re-enqueued after a failure");
    describe_gauge!("dispatch_queue_depth", "Jobs waiting for a worker");
    describe_counter!("dispatch_provider_calls_total", "Calls made to the provider API");
    describe_histogram!(
        "dispatch_provider_latency_seconds",
        "Provider API call latency in seconds"
    );
    describe_histogram!(
        "dispatch_rate_limit_wait_seconds",
        "Time spent waiting for rate limiter clearance"
    );
    describe_counter!("dispatch_alerts_total", "Alert-flagged provider errors");
    describe_counter!("dispatch_subscriptions_total", "Webhook subscription operations");
}

pub fn record_job_enqueued() {
    metrics::counter!("dispatch_jobs_enqueued_total").increment(1);
}

/// Record a terminal job (`completed` or `failed`).
pub fn record_job_finished(outcome: &'static str) {
    metrics::counter!("dispatch_jobs_finished_total", "outcome" => outcome).increment(1);
}

pub fn record_job_retry(action: &'static str) {
    metrics::counter!("dispatch_job_retries_total", "action" => action).increment(1);
}

pub fn record_queue_depth(waiting: usize) {
    metrics::gauge!("dispatch_queue_depth").set(waiting as f64);
}

/// Record one provider call with its latency.
pub fn record_provider_call(endpoint: &'static str, status: u16, latency: Duration) {
    metrics::counter!(
        "dispatch_provider_calls_total",
        "endpoint" => endpoint,
        "status" => status.to_string()
    )
    .increment(1);
    metrics::histogram!("dispatch_provider_latency_seconds", "endpoint" => endpoint)
        .record(latency.as_secs_f64());
}

pub fn record_rate_limit_wait(waited: Duration) {
    metrics::histogram!("dispatch_rate_limit_wait_seconds").record(waited.as_secs_f64());
}

pub fn record_alert(code: i64) {
    metrics::counter!("dispatch_alerts_total", "code" => code.to_string()).increment(1);
}

pub fn record_subscription(operation: &'static str, success: bool) {
    let outcome = if success { "success" } else { "failure" };
    metrics::counter!(
        "dispatch_subscriptions_total",
        "operation" => operation,
        "outcome" => outcome
    )
    .increment(1);
}
