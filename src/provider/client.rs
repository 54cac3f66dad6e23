//! HTTP client for the provider's Graph-style API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Method;
use serde_json::Value;
use thiserror::Error;

use crate::config::ProviderConfig;
use crate::provider::types::{ApiResponse, Credential};

/// Failures below the HTTP status level.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request never produced a response (DNS, connect, timeout, reset).
    #[error("Transport error: {0}")]
    Transport(String),

    /// The HTTP client could not be constructed.
    #[error("Client build error: {0}")]
    Client(String),
}

/// Calls the provider makes on behalf of a tenant.
///
/// Every method returns the raw status and body; classification of non-2xx
/// responses is the caller's concern.
#[async_trait]
pub trait MessagingApi: Send + Sync {
    /// `POST {base}/{version}/{phone_number_id}/messages`
    async fn send_message(
        &self,
        phone_number_id: &str,
        credential: &Credential,
        payload: &Value,
    ) -> Result<ApiResponse, ApiError>;

    /// `POST {base}/{version}/{tenant_id}/subscribed_apps`
    async fn subscribe_app(&self, tenant_id: &str, credential: &Credential) -> Result<ApiResponse, ApiError>;

    /// `DELETE {base}/{version}/{tenant_id}/subscribed_apps`
    async fn unsubscribe_app(&self, tenant_id: &str, credential: &Credential) -> Result<ApiResponse, ApiError>;

    /// `GET {base}/{version}/{tenant_id}/subscribed_apps`
    async fn subscribed_apps(&self, tenant_id: &str, credential: &Credential) -> Result<ApiResponse, ApiError>;
}

/// `MessagingApi` over HTTPS with bearer authentication.
pub struct HttpMessagingApi {
    client: reqwest::Client,
    base_url: String,
    api_version: String,
}

impl HttpMessagingApi {
    pub fn new(config: &ProviderConfig) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| ApiError::Client(e.to_string()))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_version: config.api_version.clone(),
        })
    }

    fn url(&self, node_id: &str, edge: &str) -> String {
        format!("{}/{}/{}/{}", self.base_url, self.api_version, node_id, edge)
    }

    async fn execute(
        &self,
        method: Method,
        url: String,
        credential: &Credential,
        body: Option<&Value>,
    ) -> Result<ApiResponse, ApiError> {
        let mut request = self
            .client
            .request(method.clone(), &url)
            .bearer_auth(&credential.access_token);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(|e| {
            tracing::warn!(method = %method, url = %url, error = %e, "Provider request failed");
            ApiError::Transport(e.to_string())
        })?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        tracing::debug!(method = %method, url = %url, status, "Provider responded");
        Ok(ApiResponse::new(status, body))
    }
}

#[async_trait]
impl MessagingApi for HttpMessagingApi {
    async fn send_message(
        &self,
        phone_number_id: &str,
        credential: &Credential,
        payload: &Value,
    ) -> Result<ApiResponse, ApiError> {
        let url = self.url(phone_number_id, "messages");
        self.execute(Method::POST, url, credential, Some(payload)).await
    }

    async fn subscribe_app(&self, tenant_id: &str, credential: &Credential) -> Result<ApiResponse, ApiError> {
        let url = self.url(tenant_id, "subscribed_apps");
        self.execute(Method::POST, url, credential, None).await
    }

    async fn unsubscribe_app(&self, tenant_id: &str, credential: &Credential) -> Result<ApiResponse, ApiError> {
        let url = self.url(tenant_id, "subscribed_apps");
        self.execute(Method::DELETE, url, credential, None).await
    }

    async fn subscribed_apps(&self, tenant_id: &str, credential: &Credential) -> Result<ApiResponse, ApiError> {
        let url = self.url(tenant_id, "subscribed_apps");
        self.execute(Method::GET, url, credential, None).await
    }
}
