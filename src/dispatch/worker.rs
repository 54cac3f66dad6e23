//! Worker loop: one job end-to-end per iteration.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;

use crate::dispatch::job::MessageJob;
use crate::dispatch::queue::{Outcome, QueueShared};
use crate::observability::metrics;
use crate::provider::payload::build_payload;
use crate::provider::types::{ProviderError, SendMessageResponse};
use crate::resilience::RetryAction;
use crate::telemetry::CallMetric;

const ENDPOINT: &str = "messages";
const CONTEXT: &str = "send_message";

pub(crate) async fn run(shared: Arc<QueueShared>, worker_id: usize) {
    tracing::debug!(worker_id, "Dispatch worker started");
    while let Some(job) = shared.next_job().await {
        let outcome = process(&shared, &job).await;
        shared.settle(job, outcome);
    }
    tracing::debug!(worker_id, "Dispatch worker stopped");
}

async fn process(shared: &QueueShared, job: &MessageJob) -> Outcome {
    let components = &shared.components;

    if let Err(e) = components.limiter.wait_for_clearance(&job.tenant_id, 1).await {
        return Outcome::Failed { error: e.to_string() };
    }

    let payload = match build_payload(&job.recipient, &job.message) {
        Ok(payload) => payload,
        Err(e) => return Outcome::Failed { error: e.to_string() },
    };

    let tenant = match components.credentials.credentials(&job.tenant_id).await {
        Ok(tenant) => tenant,
        Err(e) => return Outcome::Failed { error: e.to_string() },
    };

    let started = Instant::now();
    let result = components
        .api
        .send_message(&tenant.phone_number_id, &tenant.credential, &payload)
        .await;
    let latency = started.elapsed();

    let (status, error) = match result {
        Ok(response) if response.is_success() => {
            record_call(shared, job, response.status, latency, None);
            return Outcome::Completed {
                message_id: SendMessageResponse::message_id(&response.body),
            };
        }
        Ok(response) => (
            response.status,
            ProviderError::from_response(response.status, &response.body),
        ),
        Err(e) => (0, ProviderError::transport(e.to_string())),
    };
    record_call(shared, job, status, latency, Some(error.code));

    let decision = components
        .classifier
        .handle_error(&error, CONTEXT, Some(&job.id));
    if !decision.should_retry {
        return Outcome::Failed {
            error: components.classifier.user_message(&error),
        };
    }

    if job.attempts >= shared.max_attempts {
        tracing::warn!(
            job_id = %job.id,
            attempts = job.attempts,
            code = error.code,
            "Attempt ceiling reached"
        );
        return Outcome::Failed {
            error: components.classifier.user_message(&error),
        };
    }

    match decision.action {
        Some(RetryAction::RefreshToken) => {
            if let Err(e) = components.credentials.refresh(&job.tenant_id).await {
                return Outcome::Failed { error: e.to_string() };
            }
            Outcome::Retry {
                delay: Duration::ZERO,
                action: RetryAction::RefreshToken.as_str(),
            }
        }
        Some(action) => Outcome::Retry {
            delay: Duration::ZERO,
            action: action.as_str(),
        },
        None => Outcome::Retry {
            delay: Duration::from_millis(decision.delay_ms.unwrap_or(0)),
            action: "backoff",
        },
    }
}

fn record_call(shared: &QueueShared, job: &MessageJob, status: u16, latency: Duration, error_code: Option<i64>) {
    let mut metric = CallMetric::new(ENDPOINT, "POST", job.tenant_id.clone())
        .with_status(status)
        .with_latency_ms(latency.as_millis() as u64);
    if let Some(code) = error_code {
        metric = metric.with_error_code(code);
    }
    shared.components.telemetry.record_call(metric);
    metrics::record_provider_call(ENDPOINT, status, latency);
}
