//! Error-code → retry strategy table.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::config::{RetryConfig, RetryRuleConfig};

/// Provider code for throughput rate limiting.
pub const RATE_LIMIT_CODE: i64 = 130429;

/// Synthetic code for transport failures and unparseable 5xx/429 bodies.
pub const TRANSPORT_ERROR_CODE: i64 = -1;

/// Synthetic code for unparseable non-retryable responses.
pub const UNKNOWN_ERROR_CODE: i64 = 0;

/// How a class of provider errors is handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    /// Permanent failure; a human has to fix the input or configuration.
    NoRetry,
    /// Transient or capacity failure; retry after `base * 2^attempts`.
    ExponentialBackoff,
    /// Caller state is stale; reset it and resubmit immediately.
    RestartOperation,
    /// Credentials expired; refresh once, then retry.
    RefreshToken,
}

/// Handling rule for one provider error code.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RetryStrategyEntry {
    pub strategy: StrategyKind,
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub log: bool,
    pub alert: bool,
    pub description: Option<String>,
}

impl From<&RetryRuleConfig> for RetryStrategyEntry {
    fn from(rule: &RetryRuleConfig) -> Self {
        Self {
            strategy: rule.strategy,
            max_retries: rule.max_retries,
            base_delay_ms: rule.base_delay_ms,
            log: rule.log,
            alert: rule.alert,
            description: rule.description.clone(),
        }
    }
}

/// Immutable lookup table from provider error code to strategy.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StrategyTable {
    entries: HashMap<i64, RetryStrategyEntry>,
}

impl StrategyTable {
    /// An empty table: every code falls through to no-retry.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Built-in table for the WhatsApp Cloud API error codes.
    pub fn provider_defaults() -> Self {
        use StrategyKind::*;

        let rows: [(i64, StrategyKind, u32, u64, bool, &str); 15] = [
            (RATE_LIMIT_CODE, ExponentialBackoff, 5, 1000, false, "Throughput rate limit hit"),
            (131056, ExponentialBackoff, 5, 1000, false, "Pair rate limit hit"),
            (80007, ExponentialBackoff, 5, 1000, false, "Account rate limit hit"),
            (4, ExponentialBackoff, 5, 2000, false, "Application request limit reached"),
            (131000, ExponentialBackoff, 3, 1000, false, "Generic upstream error"),
            (131016, ExponentialBackoff, 3, 5000, false, "Service temporarily unavailable"),
            (TRANSPORT_ERROR_CODE, ExponentialBackoff, 3, 1000, false, "Transport failure"),
            (132018, NoRetry, 0, 0, true, "Template parameter issue"),
            (132000, NoRetry, 0, 0, true, "Template parameter count mismatch"),
            (132001, NoRetry, 0, 0, true, "Template does not exist"),
            (100, NoRetry, 0, 0, true, "Invalid parameter"),
            (131026, NoRetry, 0, 0, false, "Message undeliverable"),
            (131047, NoRetry, 0, 0, false, "Re-engagement window closed"),
            (131059, RestartOperation, 0, 0, false, "Pagination cursor expired"),
            (190, RefreshToken, 1, 0, true, "Access token expired"),
        ];

        let entries = rows
            .into_iter()
            .map(|(code, strategy, max_retries, base_delay_ms, alert, description)| {
                (
                    code,
                    RetryStrategyEntry {
                        strategy,
                        max_retries,
                        base_delay_ms,
                        log: true,
                        alert,
                        description: Some(description.to_string()),
                    },
                )
            })
            .collect();

        Self { entries }
    }

    /// Build the table described by the `[retry]` config section.
    pub fn from_config(config: &RetryConfig) -> Self {
        let mut table = if config.use_defaults {
            Self::provider_defaults()
        } else {
            Self::empty()
        };
        for rule in &config.rules {
            table.insert(rule.code, RetryStrategyEntry::from(rule));
        }
        table
    }

    pub fn insert(&mut self, code: i64, entry: RetryStrategyEntry) {
        self.entries.insert(code, entry);
    }

    pub fn get(&self, code: i64) -> Option<&RetryStrategyEntry> {
        self.entries.get(&code)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
