//! Error classification and retry decisions.
//!
//! # Responsibilities
//! - Resolve a provider error code to its retry strategy
//! - Track attempts per operation id and enforce each strategy's ceiling
//! - Produce the user-facing message for terminal failures
//! - Forward alert-flagged errors to the monitoring sink

use std::sync::Arc;

use arc_swap::ArcSwap;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::Serialize;

use crate::provider::types::ProviderError;
use crate::resilience::alert::{AlertSink, ErrorAlert, TracingAlertSink};
use crate::resilience::backoff::backoff_delay_ms;
use crate::resilience::strategy::{StrategyKind, StrategyTable};

/// Message shown when the provider supplies nothing usable.
pub const DEFAULT_USER_MESSAGE: &str = "An unexpected error occurred. Please try again later.";

/// What the caller has to do before retrying.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RetryAction {
    /// Reset pagination/session state, then resubmit immediately.
    RestartPagination,
    /// Refresh credentials, then resubmit.
    RefreshToken,
}

impl RetryAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            RetryAction::RestartPagination => "restart_pagination",
            RetryAction::RefreshToken => "refresh_token",
        }
    }
}

/// Outcome of classifying one failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RetryDecision {
    pub should_retry: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delay_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<RetryAction>,
}

impl RetryDecision {
    pub fn stop() -> Self {
        Self {
            should_retry: false,
            delay_ms: None,
            action: None,
        }
    }

    pub fn after(delay_ms: u64) -> Self {
        Self {
            should_retry: true,
            delay_ms: Some(delay_ms),
            action: None,
        }
    }

    pub fn with_action(action: RetryAction) -> Self {
        Self {
            should_retry: true,
            delay_ms: Some(0),
            action: Some(action),
        }
    }
}

/// Resolves provider errors to retry decisions.
pub struct ErrorClassifier {
    table: ArcSwap<StrategyTable>,
    counters: DashMap<String, u32>,
    alerts: Arc<dyn AlertSink>,
}

impl ErrorClassifier {
    /// Create a classifier that alerts through `tracing`.
    pub fn new(table: StrategyTable) -> Self {
        Self::with_alert_sink(table, Arc::new(TracingAlertSink))
    }

    pub fn with_alert_sink(table: StrategyTable, alerts: Arc<dyn AlertSink>) -> Self {
        Self {
            table: ArcSwap::from_pointee(table),
            counters: DashMap::new(),
            alerts,
        }
    }

    /// Swap in a new strategy table. In-flight counters are kept.
    pub fn replace_table(&self, table: StrategyTable) {
        tracing::info!(rules = table.len(), "Retry strategy table replaced");
        self.table.store(Arc::new(table));
    }

    /// Decide whether the failed operation should be retried.
    ///
    /// Retry counters are keyed by `operation_id`, falling back to `context`
    /// when the caller has none. Callers must reuse one id for every attempt of
    /// the same logical operation.
    pub fn handle_error(
        &self,
        error: &ProviderError,
        context: &str,
        operation_id: Option<&str>,
    ) -> RetryDecision {
        let table = self.table.load();
        let Some(entry) = table.get(error.code) else {
            tracing::warn!(
                code = error.code,
                context = %context,
                operation_id = ?operation_id,
                message = %error.message,
                "Unclassified provider error, not retrying"
            );
            return RetryDecision::stop();
        };

        if entry.log {
            tracing::warn!(
                code = error.code,
                subcode = ?error.error_subcode,
                strategy = ?entry.strategy,
                context = %context,
                operation_id = ?operation_id,
                message = %error.message,
                "Provider error"
            );
        }
        if entry.alert {
            self.alerts.alert(&ErrorAlert {
                code: error.code,
                strategy: entry.strategy,
                context: context.to_string(),
                operation_id: operation_id.map(str::to_string),
                message: error.message.clone(),
                fbtrace_id: error.fbtrace_id.clone(),
            });
        }

        let key = operation_id.unwrap_or(context);
        match entry.strategy {
            StrategyKind::NoRetry => RetryDecision::stop(),
            StrategyKind::ExponentialBackoff => match self.next_attempt(key, entry.max_retries) {
                Some(attempts) => RetryDecision::after(backoff_delay_ms(attempts, entry.base_delay_ms)),
                None => {
                    tracing::warn!(code = error.code, operation_id = %key, "Retry budget exhausted");
                    RetryDecision::stop()
                }
            },
            StrategyKind::RestartOperation => RetryDecision::with_action(RetryAction::RestartPagination),
            StrategyKind::RefreshToken => match self.next_attempt(key, entry.max_retries) {
                Some(_) => RetryDecision::with_action(RetryAction::RefreshToken),
                None => RetryDecision::stop(),
            },
        }
    }

    /// Count one more attempt for `key`.
    ///
    /// Returns the attempts made before this one, or `None` (and forgets the
    /// key) once `max_retries` is reached.
    fn next_attempt(&self, key: &str, max_retries: u32) -> Option<u32> {
        match self.counters.entry(key.to_string()) {
            Entry::Occupied(mut occupied) => {
                let attempts = *occupied.get();
                if attempts >= max_retries {
                    occupied.remove();
                    None
                } else {
                    *occupied.get_mut() += 1;
                    Some(attempts)
                }
            }
            Entry::Vacant(vacant) => {
                if max_retries == 0 {
                    None
                } else {
                    vacant.insert(1);
                    Some(0)
                }
            }
        }
    }

    /// Forget the retry history of an operation (call on success).
    pub fn reset_retries(&self, operation_id: &str) {
        self.counters.remove(operation_id);
    }

    /// Retries recorded so far for an operation.
    pub fn retry_count(&self, operation_id: &str) -> u32 {
        self.counters.get(operation_id).map(|c| *c).unwrap_or(0)
    }

    /// Number of operations with a live retry counter.
    pub fn tracked_operations(&self) -> usize {
        self.counters.len()
    }

    /// Whether the code is a transient, backoff-retryable failure.
    pub fn is_transient_error(&self, code: i64) -> bool {
        self.table
            .load()
            .get(code)
            .is_some_and(|entry| entry.strategy == StrategyKind::ExponentialBackoff)
    }

    /// Human-readable message for a terminal failure. Never empty.
    pub fn user_message(&self, error: &ProviderError) -> String {
        non_empty(error.error_user_msg.as_deref())
            .or_else(|| non_empty(Some(error.message.as_str())))
            .unwrap_or(DEFAULT_USER_MESSAGE)
            .to_string()
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|s| !s.is_empty())
}
