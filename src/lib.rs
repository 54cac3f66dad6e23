//! Outbound message dispatch and reliability layer.
//!
//! Sits between an application and a rate-limited messaging provider: jobs are
//! queued per tenant, throttled by a token bucket, sent by a worker pool,
//! retried according to the provider's error codes, and observed through a
//! telemetry window.

pub mod admin;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod lifecycle;
pub mod observability;
pub mod provider;
pub mod rate_limit;
pub mod resilience;
pub mod service;
pub mod subscription;
pub mod telemetry;

pub use config::schema::DispatchConfig;
pub use dispatch::{DispatchQueue, EnqueueRequest, JobState};
pub use error::{DispatchError, DispatchResult};
pub use lifecycle::Shutdown;
pub use service::DispatchService;
