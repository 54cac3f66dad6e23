//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → DispatchConfig (validated, immutable)
//!     → shared with the service at startup
//!
//! On file change:
//!     watcher.rs detects change
//!     → loader.rs loads new config
//!     → validation.rs validates
//!     → service swaps the retry table and tenant bucket overrides
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require full reload
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks
//! - Only the retry table and limiter overrides are applied live; worker
//!   count and endpoints need a restart

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use schema::{
    AdminConfig, BucketConfig, DispatchConfig, HealthThresholds, LogFormat, ObservabilityConfig,
    ProviderConfig, RateLimitConfig, RetryConfig, RetryRuleConfig, SubscriptionConfig,
    TelemetryConfig, TenantConfig, WorkerConfig,
};
