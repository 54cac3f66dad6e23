//! Service assembly.
//!
//! `DispatchService` builds and owns every component. There are no global
//! singletons: tests construct isolated services with their own transport.

use std::sync::Arc;

use crate::config::DispatchConfig;
use crate::dispatch::{DispatchQueue, QueueComponents};
use crate::error::{DispatchError, DispatchResult};
use crate::provider::{CredentialStore, HttpMessagingApi, MessagingApi, StaticCredentialStore};
use crate::rate_limit::RateLimiter;
use crate::resilience::{ErrorClassifier, StrategyTable};
use crate::subscription::{SubscriptionManager, SubscriptionResult};
use crate::telemetry::TelemetryAggregator;

pub struct DispatchService {
    limiter: Arc<RateLimiter>,
    classifier: Arc<ErrorClassifier>,
    telemetry: Arc<TelemetryAggregator>,
    credentials: Arc<dyn CredentialStore>,
    static_credentials: Option<Arc<StaticCredentialStore>>,
    queue: DispatchQueue,
    subscriptions: SubscriptionManager,
    concurrency: usize,
}

impl DispatchService {
    /// Build a service that talks to the configured provider over HTTP, with
    /// credentials taken from the `[tenants]` section.
    pub fn from_config(config: &DispatchConfig) -> DispatchResult<Self> {
        let api = HttpMessagingApi::new(&config.provider)
            .map_err(|e| DispatchError::Config(format!("provider client: {}", e)))?;
        let store = Arc::new(StaticCredentialStore::from_config(&config.tenants));

        let mut service = Self::with_components(config, Arc::new(api), store.clone())?;
        service.static_credentials = Some(store);
        Ok(service)
    }

    /// Build a service around an injected transport and credential store.
    pub fn with_components(
        config: &DispatchConfig,
        api: Arc<dyn MessagingApi>,
        credentials: Arc<dyn CredentialStore>,
    ) -> DispatchResult<Self> {
        let limiter = Arc::new(RateLimiter::from_config(&config.rate_limit)?);
        let classifier = Arc::new(ErrorClassifier::new(StrategyTable::from_config(&config.retry)));
        let telemetry = Arc::new(TelemetryAggregator::new(&config.telemetry));

        let queue = DispatchQueue::new(
            &config.workers,
            QueueComponents {
                limiter: limiter.clone(),
                classifier: classifier.clone(),
                telemetry: telemetry.clone(),
                api: api.clone(),
                credentials: credentials.clone(),
            },
        );
        let subscriptions = SubscriptionManager::new(
            &config.subscription,
            api,
            classifier.clone(),
            telemetry.clone(),
        );

        Ok(Self {
            limiter,
            classifier,
            telemetry,
            credentials,
            static_credentials: None,
            queue,
            subscriptions,
            concurrency: config.workers.concurrency,
        })
    }

    /// Start the worker pool.
    pub fn start(&self) -> DispatchResult<()> {
        self.queue.initialize_workers(self.concurrency)
    }

    /// Apply the parts of a reloaded config that can change live: the retry
    /// table, tenant bucket overrides and static credentials. Nothing is
    /// applied if the bucket overrides are unusable.
    pub fn apply_config(&self, config: &DispatchConfig) -> DispatchResult<()> {
        self.limiter.replace_overrides(&config.rate_limit.tenants)?;
        self.classifier
            .replace_table(StrategyTable::from_config(&config.retry));
        if let Some(store) = &self.static_credentials {
            store.replace(&config.tenants);
        }
        tracing::info!(
            retry_rules = config.retry.rules.len(),
            tenant_overrides = config.rate_limit.tenants.len(),
            tenants = config.tenants.len(),
            "Configuration reloaded"
        );
        Ok(())
    }

    pub fn queue(&self) -> &DispatchQueue {
        &self.queue
    }

    pub fn limiter(&self) -> &Arc<RateLimiter> {
        &self.limiter
    }

    pub fn classifier(&self) -> &Arc<ErrorClassifier> {
        &self.classifier
    }

    pub fn telemetry(&self) -> &Arc<TelemetryAggregator> {
        &self.telemetry
    }

    pub fn subscriptions(&self) -> &SubscriptionManager {
        &self.subscriptions
    }

    /// Subscribe a tenant using its stored credentials.
    pub async fn subscribe_tenant(&self, tenant_id: &str) -> DispatchResult<SubscriptionResult> {
        let tenant = self.credentials.credentials(tenant_id).await?;
        Ok(self.subscriptions.subscribe(tenant_id, &tenant.credential).await)
    }

    /// Unsubscribe a tenant using its stored credentials.
    pub async fn unsubscribe_tenant(&self, tenant_id: &str) -> DispatchResult<SubscriptionResult> {
        let tenant = self.credentials.credentials(tenant_id).await?;
        Ok(self.subscriptions.unsubscribe(tenant_id, &tenant.credential).await)
    }

    /// Check a tenant's subscription using its stored credentials.
    pub async fn verify_tenant(&self, tenant_id: &str) -> DispatchResult<bool> {
        let tenant = self.credentials.credentials(tenant_id).await?;
        Ok(self.subscriptions.verify(tenant_id, &tenant.credential).await)
    }

    /// Drain the worker pool and stop accepting jobs, then release bucket
    /// state and buffered call metrics.
    pub async fn shutdown(&self) {
        self.queue.close().await;
        self.limiter.clear();
        self.telemetry.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{BucketConfig, RetryRuleConfig, TenantConfig};
    use crate::provider::ProviderError;
    use crate::resilience::StrategyKind;

    fn config() -> DispatchConfig {
        let mut config = DispatchConfig::default();
        config.tenants.insert(
            "T1".into(),
            TenantConfig {
                phone_number_id: "1001".into(),
                access_token: "token".into(),
            },
        );
        config
    }

    #[tokio::test]
    async fn test_from_config_wires_credentials() {
        let service = DispatchService::from_config(&config()).unwrap();
        assert!(service.credentials.credentials("T1").await.is_ok());
        assert!(matches!(
            service.verify_tenant("T9").await,
            Err(DispatchError::UnknownTenant(_))
        ));
    }

    #[tokio::test]
    async fn test_apply_config_updates_live_components() {
        let service = DispatchService::from_config(&config()).unwrap();
        let unknown = ProviderError {
            code: 777,
            ..ProviderError::default()
        };
        assert!(!service.classifier().handle_error(&unknown, "test", Some("op")).should_retry);

        let mut next = config();
        next.retry.rules.push(RetryRuleConfig {
            code: 777,
            strategy: StrategyKind::RestartOperation,
            max_retries: 0,
            base_delay_ms: 0,
            log: true,
            alert: false,
            description: None,
        });
        next.rate_limit.tenants.insert(
            "T1".into(),
            BucketConfig {
                max_tokens: 2.0,
                refill_rate: 1.0,
            },
        );
        next.tenants.get_mut("T1").unwrap().access_token = "rotated".into();
        service.apply_config(&next).unwrap();

        assert!(service.classifier().handle_error(&unknown, "test", Some("op")).should_retry);
        assert_eq!(service.limiter().metrics("T1").max, 2.0);
        let creds = service.credentials.credentials("T1").await.unwrap();
        assert_eq!(creds.credential.access_token, "rotated");
    }

    #[tokio::test]
    async fn test_reload_drops_removed_override() {
        let mut first = config();
        first.rate_limit.tenants.insert(
            "T1".into(),
            BucketConfig {
                max_tokens: 2.0,
                refill_rate: 1.0,
            },
        );
        let service = DispatchService::from_config(&first).unwrap();
        assert_eq!(service.limiter().metrics("T1").max, 2.0);

        service.apply_config(&config()).unwrap();
        let default_max = DispatchConfig::default().rate_limit.max_tokens;
        assert_eq!(service.limiter().metrics("T1").max, default_max);
    }

    #[tokio::test]
    async fn test_unusable_reload_is_rejected_whole() {
        let service = DispatchService::from_config(&config()).unwrap();
        let mut next = config();
        next.tenants.get_mut("T1").unwrap().access_token = "rotated".into();
        next.rate_limit.tenants.insert(
            "T1".into(),
            BucketConfig {
                max_tokens: 5.0,
                refill_rate: 0.0,
            },
        );

        assert!(matches!(service.apply_config(&next), Err(DispatchError::Config(_))));
        let creds = service.credentials.credentials("T1").await.unwrap();
        assert_eq!(creds.credential.access_token, "token");
    }

    #[test]
    fn test_unusable_default_bucket_fails_construction() {
        let mut config = config();
        config.rate_limit.refill_rate = 0.0;
        assert!(matches!(
            DispatchService::from_config(&config),
            Err(DispatchError::Config(_))
        ));
    }

    #[tokio::test]
    async fn test_shutdown_releases_buckets_and_metrics() {
        let service = DispatchService::from_config(&config()).unwrap();
        assert!(service.limiter().try_consume("T1", 1));
        service
            .telemetry()
            .record_call(crate::telemetry::CallMetric::new("messages", "POST", "T1"));
        assert_eq!(service.limiter().tenant_count(), 1);

        service.shutdown().await;
        assert_eq!(service.limiter().tenant_count(), 0);
        assert!(service.telemetry().is_empty());
    }
}
