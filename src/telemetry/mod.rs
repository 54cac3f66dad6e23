//! Provider call telemetry.
//!
//! # Responsibilities
//! - Keep a bounded buffer of recent provider calls
//! - Compute windowed throughput, latency and error statistics
//! - Judge service health against configurable thresholds
//!
//! # Data Flow
//! ```text
//! Worker / SubscriptionManager → record_call(CallMetric)
//!                                       ↓
//!                               VecDeque (FIFO, capacity-bounded)
//!                                       ↓ filter by window
//!                       TelemetryMetrics → HealthReport (admin API, health checks)
//! ```
//!
//! # Design Decisions
//! - A single coarse mutex; statistics are computed on a copied-out window
//! - An empty window is healthy so that idle tenants never raise alarms

pub mod aggregator;
pub mod health;
pub mod metric;

pub use crate::config::HealthThresholds;
pub use aggregator::{TelemetryAggregator, TelemetryMetrics};
pub use health::HealthReport;
pub use metric::{now_ms, CallMetric};
