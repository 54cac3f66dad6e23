//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Workers, limiter, classifier, subscription manager produce:
//!     → logging.rs (structured log events)
//!     → metrics.rs (counters, gauges, histograms)
//!
//! Consumers:
//!     → Log aggregation (stdout, pretty or JSON)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Structured logging (JSON) for machine parsing
//! - Job id and tenant id flow through every event
//! - Metric calls are no-ops until a recorder is installed, so tests need none

pub mod logging;
pub mod metrics;
