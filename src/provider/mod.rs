//! Upstream messaging provider.
//!
//! # Responsibilities
//! - Build outbound message payloads from typed job content
//! - Call the messages and subscribed_apps endpoints
//! - Parse provider error envelopes for the classifier
//! - Look up and refresh tenant credentials
//!
//! # Data Flow
//! ```text
//! Worker → payload::build_payload → MessagingApi::send_message → ApiResponse
//!                                                             ↓ non-2xx
//!                                        ProviderError::from_response → classifier
//! ```
//!
//! # Design Decisions
//! - `MessagingApi` is a trait so tests and alternative transports can stand in
//! - Non-2xx responses are values, not errors; only transport failures are `Err`

pub mod client;
pub mod credentials;
pub mod payload;
pub mod types;

pub use client::{ApiError, HttpMessagingApi, MessagingApi};
pub use credentials::{CredentialStore, StaticCredentialStore};
pub use payload::{build_payload, MessageType, OutboundMessage};
pub use types::{ApiResponse, Credential, ProviderError, SendMessageResponse, TenantCredentials};
