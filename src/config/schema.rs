//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the dispatch
//! service. All types derive Serde traits for deserialization from config files.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::resilience::strategy::StrategyKind;

/// Root configuration for the dispatch service.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct DispatchConfig {
    /// Upstream messaging API settings.
    pub provider: ProviderConfig,

    /// Per-tenant token bucket settings.
    pub rate_limit: RateLimitConfig,

    /// Worker pool settings.
    pub workers: WorkerConfig,

    /// Telemetry buffer and health thresholds.
    pub telemetry: TelemetryConfig,

    /// Error-code retry table.
    pub retry: RetryConfig,

    /// Webhook subscription settings.
    pub subscription: SubscriptionConfig,

    /// Tenant credentials keyed by tenant id.
    pub tenants: BTreeMap<String, TenantConfig>,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    #[serde(default)]
    pub admin: AdminConfig,
}

/// Upstream provider configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// Graph API base URL (without version).
    pub base_url: String,

    /// Versioned API path segment (e.g., "v21.0").
    pub api_version: String,

    /// Connection establishment timeout in seconds.
    pub connect_timeout_secs: u64,

    /// Total request timeout in seconds.
    pub request_timeout_secs: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: "https://graph.facebook.com".to_string(),
            api_version: "v21.0".to_string(),
            connect_timeout_secs: 5,
            request_timeout_secs: 30,
        }
    }
}

/// Token bucket configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Default bucket capacity.
    pub max_tokens: f64,

    /// Default refill rate in tokens per second.
    pub refill_rate: f64,

    /// Per-tenant tier overrides.
    pub tenants: BTreeMap<String, BucketConfig>,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_tokens: 1000.0,
            refill_rate: 1000.0,
            tenants: BTreeMap::new(),
        }
    }
}

/// Capacity and refill rate of a single bucket.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct BucketConfig {
    pub max_tokens: f64,
    pub refill_rate: f64,
}

/// Worker pool configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct WorkerConfig {
    /// Number of concurrent worker loops.
    pub concurrency: usize,

    /// Hard ceiling on processing attempts per job, independent of the retry table.
    pub max_attempts: u32,

    /// Terminal job records kept for status lookups.
    pub finished_job_retention: usize,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            concurrency: 10,
            max_attempts: 10,
            finished_job_retention: 10_000,
        }
    }
}

/// Telemetry configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TelemetryConfig {
    /// Ring buffer capacity (oldest metrics evicted first).
    pub capacity: usize,

    /// Window used by the health report, in milliseconds.
    pub window_ms: u64,

    /// Provider error code counted as a rate-limit hit.
    pub rate_limit_code: i64,

    pub thresholds: HealthThresholds,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            capacity: 10_000,
            window_ms: 300_000,
            rate_limit_code: 130429,
            thresholds: HealthThresholds::default(),
        }
    }
}

/// Thresholds a telemetry window must meet to be reported healthy.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct HealthThresholds {
    /// Minimum success rate, percent.
    pub min_success_rate: f64,

    /// Maximum average latency in milliseconds.
    pub max_avg_latency_ms: f64,

    /// Maximum error rate, percent.
    pub max_error_rate: f64,
}

impl Default for HealthThresholds {
    fn default() -> Self {
        Self {
            min_success_rate: 95.0,
            max_avg_latency_ms: 2000.0,
            max_error_rate: 5.0,
        }
    }
}

/// Retry table configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Start from the built-in provider table before applying `rules`.
    pub use_defaults: bool,

    /// Rules added to (or overriding) the table, keyed by error code.
    pub rules: Vec<RetryRuleConfig>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            use_defaults: true,
            rules: Vec::new(),
        }
    }
}

/// A single error-code rule as written in the config file.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct RetryRuleConfig {
    /// Provider error code.
    pub code: i64,

    pub strategy: StrategyKind,

    #[serde(default)]
    pub max_retries: u32,

    #[serde(default)]
    pub base_delay_ms: u64,

    #[serde(default = "default_true")]
    pub log: bool,

    #[serde(default)]
    pub alert: bool,

    #[serde(default)]
    pub description: Option<String>,
}

fn default_true() -> bool {
    true
}

/// Webhook subscription configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SubscriptionConfig {
    /// Hard ceiling on registration attempts per call.
    pub max_attempts: u32,
}

impl Default for SubscriptionConfig {
    fn default() -> Self {
        Self { max_attempts: 5 }
    }
}

/// Credentials for one tenant.
#[derive(Clone, Deserialize, Serialize)]
pub struct TenantConfig {
    /// Phone number id used in the messages endpoint.
    pub phone_number_id: String,

    /// Bearer token for the provider API.
    pub access_token: String,
}

impl fmt::Debug for TenantConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TenantConfig")
            .field("phone_number_id", &self.phone_number_id)
            .field("access_token", &"<redacted>")
            .finish()
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Pretty for development, JSON for production.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: true,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Admin API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Enable the admin API.
    pub enabled: bool,

    /// API key for authentication (Bearer token).
    pub api_key: String,

    /// Admin API bind address.
    pub bind_address: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            // WARNING: This is a placeholder! Change this in production.
            api_key: "CHANGE_ME_IN_PRODUCTION".to_string(),
            bind_address: "127.0.0.1:8081".to_string(),
        }
    }
}
