//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (rates > 0, bucket capacity >= 1, percentages in 0..=100)
//! - Detect conflicting retry rules
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: DispatchConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use std::fmt;

use url::Url;

use crate::config::schema::{BucketConfig, DispatchConfig, HealthThresholds};

/// A single semantic problem, tagged with the offending field path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validate a parsed configuration.
pub fn validate_config(config: &DispatchConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if let Err(e) = Url::parse(&config.provider.base_url) {
        errors.push(ValidationError::new("provider.base_url", format!("invalid URL: {}", e)));
    }
    if config.provider.api_version.trim().is_empty() {
        errors.push(ValidationError::new("provider.api_version", "must not be empty"));
    }
    if config.provider.request_timeout_secs == 0 {
        errors.push(ValidationError::new("provider.request_timeout_secs", "must be > 0"));
    }
    if config.provider.connect_timeout_secs == 0 {
        errors.push(ValidationError::new("provider.connect_timeout_secs", "must be > 0"));
    }

    check_bucket(
        "rate_limit",
        &BucketConfig {
            max_tokens: config.rate_limit.max_tokens,
            refill_rate: config.rate_limit.refill_rate,
        },
        &mut errors,
    );
    for (tenant, bucket) in &config.rate_limit.tenants {
        check_bucket(&format!("rate_limit.tenants.{}", tenant), bucket, &mut errors);
    }

    if config.workers.concurrency == 0 {
        errors.push(ValidationError::new("workers.concurrency", "must be > 0"));
    }
    if config.workers.max_attempts == 0 {
        errors.push(ValidationError::new("workers.max_attempts", "must be > 0"));
    }

    if config.telemetry.capacity == 0 {
        errors.push(ValidationError::new("telemetry.capacity", "must be > 0"));
    }
    if config.telemetry.window_ms == 0 {
        errors.push(ValidationError::new("telemetry.window_ms", "must be > 0"));
    }
    check_thresholds(&config.telemetry.thresholds, &mut errors);

    let mut seen = HashSet::new();
    for rule in &config.retry.rules {
        if !seen.insert(rule.code) {
            errors.push(ValidationError::new(
                "retry.rules",
                format!("duplicate rule for code {}", rule.code),
            ));
        }
    }

    if config.subscription.max_attempts == 0 {
        errors.push(ValidationError::new("subscription.max_attempts", "must be > 0"));
    }

    for (tenant, creds) in &config.tenants {
        if creds.phone_number_id.trim().is_empty() {
            errors.push(ValidationError::new(
                format!("tenants.{}.phone_number_id", tenant),
                "must not be empty",
            ));
        }
        if creds.access_token.trim().is_empty() {
            errors.push(ValidationError::new(
                format!("tenants.{}.access_token", tenant),
                "must not be empty",
            ));
        }
    }

    if config.admin.enabled && config.admin.api_key == "CHANGE_ME_IN_PRODUCTION" {
        errors.push(ValidationError::new("admin.api_key", "placeholder key must be replaced"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_bucket(prefix: &str, bucket: &BucketConfig, errors: &mut Vec<ValidationError>) {
    // Every job asks for one token
    if !bucket.max_tokens.is_finite() || bucket.max_tokens < 1.0 {
        errors.push(ValidationError::new(format!("{}.max_tokens", prefix), "must be >= 1"));
    }
    if !bucket.refill_rate.is_finite() || bucket.refill_rate <= 0.0 {
        errors.push(ValidationError::new(format!("{}.refill_rate", prefix), "must be > 0"));
    }
}

fn check_thresholds(thresholds: &HealthThresholds, errors: &mut Vec<ValidationError>) {
    let percent = 0.0..=100.0;
    if !percent.contains(&thresholds.min_success_rate) {
        errors.push(ValidationError::new(
            "telemetry.thresholds.min_success_rate",
            "must be within 0..=100",
        ));
    }
    if !percent.contains(&thresholds.max_error_rate) {
        errors.push(ValidationError::new(
            "telemetry.thresholds.max_error_rate",
            "must be within 0..=100",
        ));
    }
    if thresholds.max_avg_latency_ms < 0.0 {
        errors.push(ValidationError::new(
            "telemetry.thresholds.max_avg_latency_ms",
            "must be >= 0",
        ));
    }
}
