//! Resilience subsystem: error classification and retry strategy.
//!
//! # Data Flow
//! ```text
//! Provider call fails (non-2xx or transport error):
//!     → provider::types::ProviderError (parsed error envelope)
//!     → classifier.rs (look up code in strategy.rs table)
//!     → backoff.rs (delay for exponential strategies)
//!     → alert.rs (alert-flagged codes go to the monitoring sink)
//!     → RetryDecision { should_retry, delay_ms, action } back to the caller
//! ```
//!
//! # Design Decisions
//! - Unknown codes never retry (fail-safe default)
//! - Retry counters are keyed by operation id and removed once exhausted
//! - The strategy table is data, swapped atomically on config reload
//! - Alerting is a side channel; it never changes the caller-visible result

pub mod alert;
pub mod backoff;
pub mod classifier;
pub mod strategy;

pub use alert::{AlertSink, ErrorAlert, TracingAlertSink};
pub use classifier::{ErrorClassifier, RetryAction, RetryDecision, DEFAULT_USER_MESSAGE};
pub use strategy::{RetryStrategyEntry, StrategyKind, StrategyTable};
