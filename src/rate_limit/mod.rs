//! Per-tenant rate limiting.
//!
//! # Data Flow
//! ```text
//! Worker picks up a job for tenant T
//!     → limiter.rs (look up or lazily create T's bucket)
//!     → bucket.rs (refill by elapsed time, then consume)
//!     → not enough tokens: sleep for the computed deficit, re-check
//! ```
//!
//! # Design Decisions
//! - One bucket per tenant; tenants never share capacity
//! - Refill and consume run under the tenant's map entry lock, so two
//!   workers can never both spend the same tokens
//! - Defaults equal the provider's steady-state cap: no throttling below the
//!   ceiling, bursts above capacity are smoothed
//! - State is per-process; horizontally scaled deployments must configure
//!   per-instance sub-limits that sum to the provider ceiling

pub mod bucket;
pub mod limiter;

pub use bucket::TokenBucket;
pub use limiter::{BucketMetrics, RateLimiter};
