//! A single recorded provider call.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::Serialize;

/// Milliseconds since the Unix epoch.
pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CallMetric {
    /// Logical endpoint name (`messages`, `subscribed_apps`).
    pub endpoint: String,
    pub method: String,
    /// HTTP status, or 0 when no response arrived.
    pub status_code: u16,
    pub latency_ms: u64,
    pub success: bool,
    pub error_code: Option<i64>,
    /// Epoch milliseconds at completion.
    pub timestamp: u64,
    pub tenant_id: String,
}

impl CallMetric {
    pub fn new(endpoint: impl Into<String>, method: impl Into<String>, tenant_id: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            method: method.into(),
            status_code: 0,
            latency_ms: 0,
            success: false,
            error_code: None,
            timestamp: now_ms(),
            tenant_id: tenant_id.into(),
        }
    }

    pub fn with_status(mut self, status_code: u16) -> Self {
        self.status_code = status_code;
        self.success = (200..300).contains(&status_code);
        self
    }

    pub fn with_latency_ms(mut self, latency_ms: u64) -> Self {
        self.latency_ms = latency_ms;
        self
    }

    pub fn with_error_code(mut self, code: i64) -> Self {
        self.error_code = Some(code);
        self.success = false;
        self
    }

    pub fn at(mut self, timestamp: u64) -> Self {
        self.timestamp = timestamp;
        self
    }
}
