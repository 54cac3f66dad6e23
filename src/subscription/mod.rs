//! Webhook subscription management.
//!
//! Registers the application on a tenant's account so that delivery webhooks
//! fire. A tenant whose subscription silently failed accepts messages but never
//! reports their status, so every call here retries through the classifier and
//! reports an explicit result.

pub mod manager;

pub use manager::{SubscriptionManager, SubscriptionResult, SubscriptionTarget};
