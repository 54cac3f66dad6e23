//! Shared utilities for integration tests.
#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::Notify;

use message_dispatch::provider::{ApiError, ApiResponse, Credential, MessagingApi};

/// A request as seen by the mock provider.
#[derive(Debug, Clone)]
pub struct CapturedRequest {
    pub method: String,
    pub path: String,
    pub headers: HashMap<String, String>,
    pub body: String,
}

impl CapturedRequest {
    pub fn json(&self) -> Value {
        serde_json::from_str(&self.body).unwrap()
    }
}

/// Start a programmable mock provider on an ephemeral port.
///
/// `f` maps each captured request to `(status, body)`.
pub async fn start_mock_provider<F, Fut>(f: F) -> (SocketAddr, Arc<Mutex<Vec<CapturedRequest>>>)
where
    F: Fn(CapturedRequest) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = (u16, String)> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let captured = Arc::new(Mutex::new(Vec::new()));
    let f = Arc::new(f);

    let log = captured.clone();
    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let f = f.clone();
                    let log = log.clone();
                    tokio::spawn(async move {
                        let Some(request) = read_request(&mut socket).await else {
                            return;
                        };
                        log.lock().unwrap().push(request.clone());
                        let (status, body) = f(request).await;
                        let status_text = match status {
                            200 => "200 OK",
                            400 => "400 Bad Request",
                            401 => "401 Unauthorized",
                            404 => "404 Not Found",
                            429 => "429 Too Many Requests",
                            500 => "500 Internal Server Error",
                            502 => "502 Bad Gateway",
                            503 => "503 Service Unavailable",
                            _ => "200 OK",
                        };

                        let response_str = format!(
                            "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            status_text,
                            body.len(),
                            body
                        );
                        let _ = socket.write_all(response_str.as_bytes()).await;
                        let _ = socket.shutdown().await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    (addr, captured)
}

async fn read_request(socket: &mut tokio::net::TcpStream) -> Option<CapturedRequest> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    let header_end = loop {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
    let mut lines = head.split("\r\n");
    let mut request_line = lines.next()?.split_whitespace();
    let method = request_line.next()?.to_string();
    let path = request_line.next()?.to_string();

    let headers: HashMap<String, String> = lines
        .filter_map(|line| line.split_once(':'))
        .map(|(k, v)| (k.trim().to_ascii_lowercase(), v.trim().to_string()))
        .collect();

    let content_length: usize = headers
        .get("content-length")
        .and_then(|v| v.parse().ok())
        .unwrap_or(0);
    while buf.len() < header_end + content_length {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }
    let body_end = (header_end + content_length).min(buf.len());
    let body = String::from_utf8_lossy(&buf[header_end..body_end]).to_string();

    Some(CapturedRequest {
        method,
        path,
        headers,
        body,
    })
}

/// Provider error envelope for `code`.
pub fn error_body(code: i64) -> String {
    serde_json::json!({
        "error": {
            "message": format!("provider error {}", code),
            "type": "OAuthException",
            "code": code,
            "fbtrace_id": "trace"
        }
    })
    .to_string()
}

/// Successful messages response with the given id.
pub fn sent_body(message_id: &str) -> String {
    serde_json::json!({
        "messaging_product": "whatsapp",
        "messages": [{ "id": message_id }]
    })
    .to_string()
}

/// In-process `MessagingApi` that replays scripted responses keyed by recipient.
///
/// Unscripted recipients succeed. The last scripted response repeats.
#[derive(Default)]
pub struct ScriptedApi {
    scripts: Mutex<HashMap<String, VecDeque<ApiResponse>>>,
    sent: Mutex<Vec<(String, Value)>>,
    holds: Mutex<HashMap<String, Arc<Notify>>>,
}

impl ScriptedApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn script(self, recipient: &str, responses: Vec<ApiResponse>) -> Self {
        self.scripts
            .lock()
            .unwrap()
            .insert(recipient.to_string(), responses.into());
        self
    }

    /// Sends to `recipient` block until `gate` is notified.
    pub fn hold(self, recipient: &str, gate: Arc<Notify>) -> Self {
        self.holds
            .lock()
            .unwrap()
            .insert(recipient.to_string(), gate);
        self
    }

    /// `(phone_number_id, payload)` of every send.
    pub fn sent(&self) -> Vec<(String, Value)> {
        self.sent.lock().unwrap().clone()
    }

    pub fn sends_to(&self, recipient: &str) -> usize {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, payload)| payload["to"] == recipient)
            .count()
    }
}

#[async_trait]
impl MessagingApi for ScriptedApi {
    async fn send_message(
        &self,
        phone_number_id: &str,
        _credential: &Credential,
        payload: &Value,
    ) -> Result<ApiResponse, ApiError> {
        self.sent
            .lock()
            .unwrap()
            .push((phone_number_id.to_string(), payload.clone()));
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;

        let recipient = payload["to"].as_str().unwrap_or_default().to_string();
        let gate = self.holds.lock().unwrap().get(&recipient).cloned();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        let mut scripts = self.scripts.lock().unwrap();
        match scripts.get_mut(&recipient) {
            Some(queue) if queue.len() > 1 => Ok(queue.pop_front().unwrap()),
            Some(queue) => Ok(queue.front().cloned().unwrap()),
            None => Ok(ApiResponse::new(200, sent_body(&format!("wamid.{}", recipient)))),
        }
    }

    async fn subscribe_app(&self, _: &str, _: &Credential) -> Result<ApiResponse, ApiError> {
        Ok(ApiResponse::new(200, r#"{"success":true}"#))
    }

    async fn unsubscribe_app(&self, _: &str, _: &Credential) -> Result<ApiResponse, ApiError> {
        Ok(ApiResponse::new(200, r#"{"success":true}"#))
    }

    async fn subscribed_apps(&self, _: &str, _: &Credential) -> Result<ApiResponse, ApiError> {
        Ok(ApiResponse::new(200, r#"{"data":[]}"#))
    }
}
