//! Provider wire types: responses, error envelopes and credentials.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::resilience::strategy::{TRANSPORT_ERROR_CODE, UNKNOWN_ERROR_CODE};

/// Raw HTTP response from the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: String,
}

impl ApiResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// The `error` object of a provider error response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProviderError {
    #[serde(default)]
    pub message: String,

    #[serde(rename = "type", default)]
    pub error_type: String,

    #[serde(default)]
    pub code: i64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_subcode: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_user_title: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_user_msg: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fbtrace_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProviderErrorEnvelope {
    error: ProviderError,
}

impl ProviderError {
    /// Parse the error envelope of a non-2xx response.
    ///
    /// Bodies that are not a provider envelope (proxies, load balancers) map to
    /// the transport code for 5xx/429 and to the unknown code otherwise.
    pub fn from_response(status: u16, body: &str) -> Self {
        match serde_json::from_str::<ProviderErrorEnvelope>(body) {
            Ok(envelope) => envelope.error,
            Err(_) => {
                let code = if status >= 500 || status == 429 {
                    TRANSPORT_ERROR_CODE
                } else {
                    UNKNOWN_ERROR_CODE
                };
                Self {
                    message: format!("HTTP {} from provider", status),
                    error_type: "HttpError".to_string(),
                    code,
                    ..Self::default()
                }
            }
        }
    }

    /// Error for a request that never produced a response.
    pub fn transport(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            error_type: "TransportError".to_string(),
            code: TRANSPORT_ERROR_CODE,
            ..Self::default()
        }
    }
}

/// Body of a successful messages call.
#[derive(Debug, Clone, Deserialize)]
pub struct SendMessageResponse {
    #[serde(default)]
    pub messages: Vec<MessageRef>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MessageRef {
    pub id: String,
}

impl SendMessageResponse {
    /// First provider message id in the body, if any.
    pub fn message_id(body: &str) -> Option<String> {
        serde_json::from_str::<Self>(body)
            .ok()
            .and_then(|r| r.messages.into_iter().next())
            .map(|m| m.id)
    }
}

/// Body of a `GET subscribed_apps` call.
#[derive(Debug, Clone, Deserialize)]
pub struct SubscribedAppsResponse {
    #[serde(default)]
    pub data: Vec<serde_json::Value>,
}

/// Bearer credential for one tenant.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    pub access_token: String,
}

impl Credential {
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
        }
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("access_token", &"<redacted>")
            .finish()
    }
}

/// Everything needed to send on behalf of a tenant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TenantCredentials {
    pub phone_number_id: String,
    pub credential: Credential,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_error_envelope() {
        let body = r#"{"error":{"message":"(#132018) There was an issue with the parameters","type":"OAuthException","code":132018,"error_subcode":2494010,"error_user_title":"Bad params","error_user_msg":"Check the template parameters.","fbtrace_id":"AbC"}}"#;
        let error = ProviderError::from_response(400, body);
        assert_eq!(error.code, 132018);
        assert_eq!(error.error_type, "OAuthException");
        assert_eq!(error.error_subcode, Some(2494010));
        assert_eq!(error.error_user_msg.as_deref(), Some("Check the template parameters."));
        assert_eq!(error.fbtrace_id.as_deref(), Some("AbC"));
    }

    #[test]
    fn test_unparseable_bodies() {
        assert_eq!(ProviderError::from_response(502, "<html>").code, TRANSPORT_ERROR_CODE);
        assert_eq!(ProviderError::from_response(429, "").code, TRANSPORT_ERROR_CODE);
        assert_eq!(ProviderError::from_response(404, "nope").code, UNKNOWN_ERROR_CODE);
    }

    #[test]
    fn test_message_id_extraction() {
        let body = r#"{"messaging_product":"whatsapp","contacts":[{"input":"1555","wa_id":"1555"}],"messages":[{"id":"wamid.ABC"}]}"#;
        assert_eq!(SendMessageResponse::message_id(body).as_deref(), Some("wamid.ABC"));
        assert_eq!(SendMessageResponse::message_id("{}"), None);
    }

    #[test]
    fn test_credential_debug_redacts() {
        let rendered = format!("{:?}", Credential::new("EAAG-secret"));
        assert!(!rendered.contains("EAAG"));
    }
}
