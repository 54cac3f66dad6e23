//! Token bucket state for a single tenant.

use std::time::Duration;
use tokio::time::Instant;

use crate::config::BucketConfig;

/// A token bucket refilled continuously from elapsed time.
#[derive(Debug, Clone)]
pub struct TokenBucket {
    tokens: f64,
    max_tokens: f64,
    refill_rate: f64,
    last_refill: Instant,
}

impl TokenBucket {
    /// Create a full bucket.
    pub fn new(config: BucketConfig) -> Self {
        Self {
            tokens: config.max_tokens,
            max_tokens: config.max_tokens,
            refill_rate: config.refill_rate,
            last_refill: Instant::now(),
        }
    }

    fn refill(&mut self) {
        let now = Instant::now();
        let elapsed = now.saturating_duration_since(self.last_refill).as_secs_f64();

        self.tokens = (self.tokens + elapsed * self.refill_rate).min(self.max_tokens);
        self.last_refill = now;
    }

    /// Refill, then take `n` tokens if available.
    ///
    /// On shortfall returns how long until `n` tokens will have accrued.
    pub fn try_acquire(&mut self, n: f64) -> Result<(), Duration> {
        self.refill();

        if self.tokens >= n {
            self.tokens -= n;
            Ok(())
        } else {
            let deficit = n - self.tokens;
            Err(Duration::try_from_secs_f64(deficit / self.refill_rate).unwrap_or(Duration::MAX))
        }
    }

    /// Tokens currently available (after refill).
    pub fn available(&mut self) -> f64 {
        self.refill();
        self.tokens
    }

    pub fn max_tokens(&self) -> f64 {
        self.max_tokens
    }

    pub fn refill_rate(&self) -> f64 {
        self.refill_rate
    }

    /// Apply new limits, keeping accrued tokens up to the new capacity.
    pub fn reconfigure(&mut self, config: BucketConfig) {
        self.refill();
        self.max_tokens = config.max_tokens;
        self.refill_rate = config.refill_rate;
        self.tokens = self.tokens.min(self.max_tokens);
    }
}
