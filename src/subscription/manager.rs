//! Subscribe, verify and unsubscribe with bounded retries.

use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join_all;
use serde::Serialize;
use tokio::time::Instant;

use crate::config::SubscriptionConfig;
use crate::observability::metrics;
use crate::provider::types::{ApiResponse, Credential, ProviderError, SubscribedAppsResponse};
use crate::provider::{ApiError, MessagingApi};
use crate::resilience::strategy::TRANSPORT_ERROR_CODE;
use crate::resilience::{ErrorClassifier, RetryAction};
use crate::telemetry::{now_ms, CallMetric, TelemetryAggregator};

const ENDPOINT: &str = "subscribed_apps";

/// Outcome of one subscription call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionResult {
    pub tenant_id: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub timestamp: u64,
}

impl SubscriptionResult {
    fn ok(tenant_id: &str) -> Self {
        Self {
            tenant_id: tenant_id.to_string(),
            success: true,
            error: None,
            timestamp: now_ms(),
        }
    }

    fn failed(tenant_id: &str, error: String) -> Self {
        Self {
            tenant_id: tenant_id.to_string(),
            success: false,
            error: Some(error),
            timestamp: now_ms(),
        }
    }
}

/// One entry of a batch subscription.
#[derive(Debug, Clone)]
pub struct SubscriptionTarget {
    pub tenant_id: String,
    pub credential: Credential,
}

impl SubscriptionTarget {
    pub fn new(tenant_id: impl Into<String>, credential: Credential) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            credential,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operation {
    Subscribe,
    Unsubscribe,
}

impl Operation {
    fn as_str(&self) -> &'static str {
        match self {
            Operation::Subscribe => "subscribe",
            Operation::Unsubscribe => "unsubscribe",
        }
    }

    fn method(&self) -> &'static str {
        match self {
            Operation::Subscribe => "POST",
            Operation::Unsubscribe => "DELETE",
        }
    }
}

pub struct SubscriptionManager {
    api: Arc<dyn MessagingApi>,
    classifier: Arc<ErrorClassifier>,
    telemetry: Arc<TelemetryAggregator>,
    max_attempts: u32,
}

impl SubscriptionManager {
    pub fn new(
        config: &SubscriptionConfig,
        api: Arc<dyn MessagingApi>,
        classifier: Arc<ErrorClassifier>,
        telemetry: Arc<TelemetryAggregator>,
    ) -> Self {
        Self {
            api,
            classifier,
            telemetry,
            max_attempts: config.max_attempts.max(1),
        }
    }

    /// Register the application for the tenant's webhooks.
    pub async fn subscribe(&self, tenant_id: &str, credential: &Credential) -> SubscriptionResult {
        self.run(Operation::Subscribe, tenant_id, credential).await
    }

    /// Remove the application's webhook registration.
    pub async fn unsubscribe(&self, tenant_id: &str, credential: &Credential) -> SubscriptionResult {
        self.run(Operation::Unsubscribe, tenant_id, credential).await
    }

    /// Whether the tenant currently has at least one subscribed app.
    ///
    /// Any failure reads as "not subscribed"; verification is never retried.
    pub async fn verify(&self, tenant_id: &str, credential: &Credential) -> bool {
        let started = Instant::now();
        let result = self.api.subscribed_apps(tenant_id, credential).await;
        let latency = started.elapsed();

        match result {
            Ok(response) if response.is_success() => {
                self.record_call(tenant_id, "GET", response.status, latency, None);
                match serde_json::from_str::<SubscribedAppsResponse>(&response.body) {
                    Ok(apps) => !apps.data.is_empty(),
                    Err(e) => {
                        tracing::warn!(tenant_id = %tenant_id, error = %e, "Unreadable subscribed_apps body");
                        false
                    }
                }
            }
            Ok(response) => {
                let error = ProviderError::from_response(response.status, &response.body);
                self.record_call(tenant_id, "GET", response.status, latency, Some(error.code));
                tracing::warn!(tenant_id = %tenant_id, code = error.code, "Subscription check failed");
                false
            }
            Err(e) => {
                self.record_call(tenant_id, "GET", 0, latency, Some(TRANSPORT_ERROR_CODE));
                tracing::warn!(tenant_id = %tenant_id, error = %e, "Subscription check failed");
                false
            }
        }
    }

    /// Subscribe every target concurrently. Results match the input order and
    /// one tenant's failure never affects another's.
    pub async fn batch_subscribe(&self, targets: &[SubscriptionTarget]) -> Vec<SubscriptionResult> {
        let results = join_all(
            targets
                .iter()
                .map(|target| self.subscribe(&target.tenant_id, &target.credential)),
        )
        .await;

        let succeeded = results.iter().filter(|r| r.success).count();
        tracing::info!(
            total = results.len(),
            succeeded,
            failed = results.len() - succeeded,
            "Batch subscription finished"
        );
        results
    }

    async fn call(&self, operation: Operation, tenant_id: &str, credential: &Credential) -> Result<ApiResponse, ApiError> {
        match operation {
            Operation::Subscribe => self.api.subscribe_app(tenant_id, credential).await,
            Operation::Unsubscribe => self.api.unsubscribe_app(tenant_id, credential).await,
        }
    }

    async fn run(&self, operation: Operation, tenant_id: &str, credential: &Credential) -> SubscriptionResult {
        let operation_id = format!("{}:{}", operation.as_str(), tenant_id);
        let mut attempts = 0;

        let result = loop {
            attempts += 1;
            let started = Instant::now();
            let response = self.call(operation, tenant_id, credential).await;
            let latency = started.elapsed();

            let (status, error) = match response {
                Ok(response) if response.is_success() => {
                    self.record_call(tenant_id, operation.method(), response.status, latency, None);
                    break SubscriptionResult::ok(tenant_id);
                }
                Ok(response) => (
                    response.status,
                    ProviderError::from_response(response.status, &response.body),
                ),
                Err(e) => (0, ProviderError::transport(e.to_string())),
            };
            self.record_call(tenant_id, operation.method(), status, latency, Some(error.code));

            let decision = self
                .classifier
                .handle_error(&error, operation.as_str(), Some(&operation_id));

            // The credential belongs to the caller, so there is nothing to refresh here.
            let needs_refresh = decision.action == Some(RetryAction::RefreshToken);
            if !decision.should_retry || needs_refresh || attempts >= self.max_attempts {
                break SubscriptionResult::failed(tenant_id, self.classifier.user_message(&error));
            }

            let delay = Duration::from_millis(decision.delay_ms.unwrap_or(0));
            tracing::debug!(
                tenant_id = %tenant_id,
                operation = operation.as_str(),
                attempts,
                delay_ms = delay.as_millis() as u64,
                "Retrying subscription call"
            );
            tokio::time::sleep(delay).await;
        };

        self.classifier.reset_retries(&operation_id);
        metrics::record_subscription(operation.as_str(), result.success);
        if result.success {
            tracing::info!(tenant_id = %tenant_id, operation = operation.as_str(), attempts, "Webhook subscription updated");
        } else {
            tracing::warn!(
                tenant_id = %tenant_id,
                operation = operation.as_str(),
                attempts,
                error = ?result.error,
                "Webhook subscription failed"
            );
        }
        result
    }

    fn record_call(&self, tenant_id: &str, method: &str, status: u16, latency: Duration, error_code: Option<i64>) {
        let mut metric = CallMetric::new(ENDPOINT, method, tenant_id)
            .with_status(status)
            .with_latency_ms(latency.as_millis() as u64);
        if let Some(code) = error_code {
            metric = metric.with_error_code(code);
        }
        self.telemetry.record_call(metric);
        metrics::record_provider_call(ENDPOINT, status, latency);
    }
}
