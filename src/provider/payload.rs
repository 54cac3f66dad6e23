//! Outbound message payloads.
//!
//! Maps a typed job message onto the provider's send body:
//! `{messaging_product, recipient_type, to, type, <type>: content}`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::{DispatchError, DispatchResult};

/// Message content as submitted by a caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboundMessage {
    /// One of the supported [`MessageType`] names; validated at send time.
    #[serde(rename = "type")]
    pub message_type: String,

    /// Type-specific object placed under the `<type>` key.
    pub content: Value,
}

impl OutboundMessage {
    pub fn new(message_type: impl Into<String>, content: Value) -> Self {
        Self {
            message_type: message_type.into(),
            content,
        }
    }
}

/// Message variants the provider accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageType {
    Text,
    Template,
    Interactive,
    Image,
    Video,
    Document,
}

impl MessageType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageType::Text => "text",
            MessageType::Template => "template",
            MessageType::Interactive => "interactive",
            MessageType::Image => "image",
            MessageType::Video => "video",
            MessageType::Document => "document",
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MessageType {
    type Err = DispatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" => Ok(MessageType::Text),
            "template" => Ok(MessageType::Template),
            "interactive" => Ok(MessageType::Interactive),
            "image" => Ok(MessageType::Image),
            "video" => Ok(MessageType::Video),
            "document" => Ok(MessageType::Document),
            other => Err(DispatchError::UnsupportedMessageType(other.to_string())),
        }
    }
}

/// Build the provider send body for `recipient`.
pub fn build_payload(recipient: &str, message: &OutboundMessage) -> DispatchResult<Value> {
    let message_type: MessageType = message.message_type.parse()?;
    let key = message_type.as_str();

    let mut payload = json!({
        "messaging_product": "whatsapp",
        "recipient_type": "individual",
        "to": recipient,
        "type": key,
    });
    payload[key] = message.content.clone();
    Ok(payload)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_payload() {
        let message = OutboundMessage::new("text", json!({"body": "hello"}));
        let payload = build_payload("15551234567", &message).unwrap();
        assert_eq!(
            payload,
            json!({
                "messaging_product": "whatsapp",
                "recipient_type": "individual",
                "to": "15551234567",
                "type": "text",
                "text": {"body": "hello"}
            })
        );
    }

    #[test]
    fn test_template_payload_nests_content() {
        let content = json!({"name": "order_update", "language": {"code": "en_US"}});
        let message = OutboundMessage::new("template", content.clone());
        let payload = build_payload("1555", &message).unwrap();
        assert_eq!(payload["type"], "template");
        assert_eq!(payload["template"], content);
    }

    #[test]
    fn test_every_supported_type_parses() {
        for name in ["text", "template", "interactive", "image", "video", "document"] {
            let parsed: MessageType = name.parse().unwrap();
            assert_eq!(parsed.to_string(), name);
        }
    }

    #[test]
    fn test_unsupported_type() {
        let message = OutboundMessage::new("sticker", json!({}));
        let err = build_payload("1555", &message).unwrap_err();
        assert!(matches!(err, DispatchError::UnsupportedMessageType(t) if t == "sticker"));
    }
}
