//! Wire format of provider calls against a raw TCP mock.

mod common;

use std::time::Duration;

use serde_json::json;

use common::{error_body, sent_body, start_mock_provider};
use message_dispatch::config::ProviderConfig;
use message_dispatch::provider::payload::{build_payload, OutboundMessage};
use message_dispatch::provider::{ApiError, Credential, HttpMessagingApi, MessagingApi, ProviderError};

fn api_for(addr: std::net::SocketAddr) -> HttpMessagingApi {
    HttpMessagingApi::new(&ProviderConfig {
        base_url: format!("http://{}", addr),
        api_version: "v21.0".into(),
        connect_timeout_secs: 2,
        request_timeout_secs: 5,
    })
    .unwrap()
}

#[tokio::test]
async fn test_send_message_request_shape() {
    let (addr, captured) = start_mock_provider(|_| async { (200, sent_body("wamid.XYZ")) }).await;
    let api = api_for(addr);

    let message = OutboundMessage::new(
        "template",
        json!({"name": "order_update", "language": {"code": "en_US"}}),
    );
    let payload = build_payload("15551234567", &message).unwrap();
    let response = api
        .send_message("1001", &Credential::new("EAAG-token"), &payload)
        .await
        .unwrap();

    assert!(response.is_success());
    assert_eq!(
        message_dispatch::provider::SendMessageResponse::message_id(&response.body).as_deref(),
        Some("wamid.XYZ")
    );

    let requests = captured.lock().unwrap().clone();
    assert_eq!(requests.len(), 1);
    let request = &requests[0];
    assert_eq!(request.method, "POST");
    assert_eq!(request.path, "/v21.0/1001/messages");
    assert_eq!(request.headers["authorization"], "Bearer EAAG-token");
    assert_eq!(
        request.json(),
        json!({
            "messaging_product": "whatsapp",
            "recipient_type": "individual",
            "to": "15551234567",
            "type": "template",
            "template": {"name": "order_update", "language": {"code": "en_US"}}
        })
    );
}

#[tokio::test]
async fn test_subscribed_apps_methods() {
    let (addr, captured) = start_mock_provider(|_| async { (200, r#"{"success":true}"#.to_string()) }).await;
    let api = api_for(addr);
    let credential = Credential::new("token");

    api.subscribe_app("WABA1", &credential).await.unwrap();
    api.subscribed_apps("WABA1", &credential).await.unwrap();
    api.unsubscribe_app("WABA1", &credential).await.unwrap();

    let requests = captured.lock().unwrap().clone();
    let calls: Vec<(String, String)> = requests
        .iter()
        .map(|r| (r.method.clone(), r.path.clone()))
        .collect();
    assert_eq!(
        calls,
        vec![
            ("POST".to_string(), "/v21.0/WABA1/subscribed_apps".to_string()),
            ("GET".to_string(), "/v21.0/WABA1/subscribed_apps".to_string()),
            ("DELETE".to_string(), "/v21.0/WABA1/subscribed_apps".to_string()),
        ]
    );
    assert!(requests.iter().all(|r| r.body.is_empty()));
}

#[tokio::test]
async fn test_error_responses_are_values() {
    let (addr, _) = start_mock_provider(|_| async { (400, error_body(132018)) }).await;
    let api = api_for(addr);

    let response = api
        .send_message("1001", &Credential::new("t"), &json!({}))
        .await
        .unwrap();
    assert_eq!(response.status, 400);
    let error = ProviderError::from_response(response.status, &response.body);
    assert_eq!(error.code, 132018);
    assert_eq!(error.fbtrace_id.as_deref(), Some("trace"));
}

#[tokio::test]
async fn test_unreachable_provider_is_transport_error() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let api = api_for(addr);
    let result = tokio::time::timeout(
        Duration::from_secs(10),
        api.send_message("1001", &Credential::new("t"), &json!({})),
    )
    .await
    .unwrap();
    assert!(matches!(result, Err(ApiError::Transport(_))));
}
