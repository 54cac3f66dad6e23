//! Alert forwarding for critical provider errors.

use serde::Serialize;

use crate::observability::metrics;
use crate::resilience::strategy::StrategyKind;

/// A provider error that needs human attention.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorAlert {
    pub code: i64,
    pub strategy: StrategyKind,
    pub context: String,
    pub operation_id: Option<String>,
    pub message: String,
    pub fbtrace_id: Option<String>,
}

/// Destination for alert-flagged errors (pager, incident tracker, ...).
pub trait AlertSink: Send + Sync {
    fn alert(&self, alert: &ErrorAlert);
}

/// Default sink: an error-level structured event plus a counter.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingAlertSink;

impl AlertSink for TracingAlertSink {
    fn alert(&self, alert: &ErrorAlert) {
        tracing::error!(
            code = alert.code,
            strategy = ?alert.strategy,
            context = %alert.context,
            operation_id = ?alert.operation_id,
            fbtrace_id = ?alert.fbtrace_id,
            message = %alert.message,
            "Critical provider error"
        );
        metrics::record_alert(alert.code);
    }
}
