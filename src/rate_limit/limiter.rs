//! Tenant-keyed token bucket registry.

use std::collections::BTreeMap;

use dashmap::DashMap;
use serde::Serialize;
use tokio::time::Instant;

use crate::config::{BucketConfig, RateLimitConfig};
use crate::error::{DispatchError, DispatchResult};
use crate::observability::metrics;
use crate::rate_limit::bucket::TokenBucket;

/// Point-in-time view of one tenant's bucket.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BucketMetrics {
    pub available: f64,
    pub max: f64,
    pub utilization_percent: f64,
}

/// Per-tenant token bucket rate limiter.
#[derive(Debug)]
pub struct RateLimiter {
    buckets: DashMap<String, TokenBucket>,
    overrides: DashMap<String, BucketConfig>,
    default: BucketConfig,
}

/// Reject limits a bucket cannot run with. Every job asks for one token, so
/// capacity below one would never admit anything.
fn check_bucket(config: &BucketConfig) -> DispatchResult<()> {
    if !config.max_tokens.is_finite() || config.max_tokens < 1.0 {
        return Err(DispatchError::Config(format!(
            "max_tokens must be a finite value >= 1, got {}",
            config.max_tokens
        )));
    }
    if !config.refill_rate.is_finite() || config.refill_rate <= 0.0 {
        return Err(DispatchError::Config(format!(
            "refill_rate must be a finite value > 0, got {}",
            config.refill_rate
        )));
    }
    Ok(())
}

impl RateLimiter {
    /// Create a limiter where every tenant gets `default` unless configured.
    pub fn new(default: BucketConfig) -> DispatchResult<Self> {
        check_bucket(&default)?;
        Ok(Self {
            buckets: DashMap::new(),
            overrides: DashMap::new(),
            default,
        })
    }

    /// Create a limiter from the `[rate_limit]` config section.
    pub fn from_config(config: &RateLimitConfig) -> DispatchResult<Self> {
        let limiter = Self::new(BucketConfig {
            max_tokens: config.max_tokens,
            refill_rate: config.refill_rate,
        })?;
        for (tenant, bucket) in &config.tenants {
            limiter.configure(tenant, *bucket)?;
        }
        Ok(limiter)
    }

    /// Override the limits for one tenant.
    pub fn configure(&self, tenant_id: &str, config: BucketConfig) -> DispatchResult<()> {
        check_bucket(&config)?;
        self.overrides.insert(tenant_id.to_string(), config);
        if let Some(mut bucket) = self.buckets.get_mut(tenant_id) {
            bucket.reconfigure(config);
        }
        tracing::debug!(
            tenant_id = %tenant_id,
            max_tokens = config.max_tokens,
            refill_rate = config.refill_rate,
            "Tenant rate limit configured"
        );
        Ok(())
    }

    /// Swap the whole override set. Tenants that lose their override fall
    /// back to the default limits.
    pub fn replace_overrides(&self, overrides: &BTreeMap<String, BucketConfig>) -> DispatchResult<()> {
        for config in overrides.values() {
            check_bucket(config)?;
        }

        let removed: Vec<String> = self
            .overrides
            .iter()
            .filter(|entry| !overrides.contains_key(entry.key()))
            .map(|entry| entry.key().clone())
            .collect();
        for tenant_id in &removed {
            self.overrides.remove(tenant_id);
            if let Some(mut bucket) = self.buckets.get_mut(tenant_id) {
                bucket.reconfigure(self.default);
            }
        }
        for (tenant_id, config) in overrides {
            self.configure(tenant_id, *config)?;
        }

        if !removed.is_empty() {
            tracing::info!(removed = ?removed, "Tenant rate limit overrides removed");
        }
        Ok(())
    }

    fn bucket_config(&self, tenant_id: &str) -> BucketConfig {
        self.overrides
            .get(tenant_id)
            .map(|c| *c.value())
            .unwrap_or(self.default)
    }

    /// Refill and consume under the tenant's entry lock.
    fn acquire(&self, tenant_id: &str, n: f64) -> Result<(), std::time::Duration> {
        let config = self.bucket_config(tenant_id);
        let mut bucket = self
            .buckets
            .entry(tenant_id.to_string())
            .or_insert_with(|| TokenBucket::new(config));
        bucket.try_acquire(n)
    }

    /// Take `n` tokens without waiting.
    pub fn try_consume(&self, tenant_id: &str, n: u32) -> bool {
        self.acquire(tenant_id, f64::from(n)).is_ok()
    }

    /// Wait until `n` tokens are available for the tenant, then take them.
    ///
    /// There is no internal deadline; wrap in `tokio::time::timeout` if one is
    /// needed. Fails only when `n` exceeds the bucket's capacity.
    pub async fn wait_for_clearance(&self, tenant_id: &str, n: u32) -> DispatchResult<()> {
        let needed = f64::from(n);
        let max_tokens = self.bucket_config(tenant_id).max_tokens;
        if needed > max_tokens {
            return Err(DispatchError::RateLimit(format!(
                "requested {} tokens but tenant {} capacity is {}",
                n, tenant_id, max_tokens
            )));
        }

        let started = Instant::now();
        let mut waited = false;
        loop {
            match self.acquire(tenant_id, needed) {
                Ok(()) => break,
                Err(wait) => {
                    // Other workers may drain the bucket while we sleep; re-check on wake.
                    waited = true;
                    tracing::trace!(tenant_id = %tenant_id, wait = ?wait, "Waiting for rate limit clearance");
                    tokio::time::sleep(wait).await;
                }
            }
        }

        if waited {
            metrics::record_rate_limit_wait(started.elapsed());
        }
        Ok(())
    }

    /// Current bucket state for a tenant.
    pub fn metrics(&self, tenant_id: &str) -> BucketMetrics {
        let config = self.bucket_config(tenant_id);
        let mut bucket = self
            .buckets
            .entry(tenant_id.to_string())
            .or_insert_with(|| TokenBucket::new(config));

        let available = bucket.available();
        let max = bucket.max_tokens();
        BucketMetrics {
            available,
            max,
            utilization_percent: (max - available) / max * 100.0,
        }
    }

    /// Number of tenants with a live bucket.
    pub fn tenant_count(&self) -> usize {
        self.buckets.len()
    }

    /// Drop all bucket state. Overrides are kept.
    pub fn clear(&self) {
        self.buckets.clear();
    }
}
