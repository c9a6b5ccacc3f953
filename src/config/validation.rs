//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (rate > 0, windows > 0, timeouts > 0)
//! - Require the secrets the gateway cannot start without
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use thiserror::Error;

use crate::config::schema::GatewayConfig;

/// A single semantic problem with the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required value is missing or empty.
    #[error("{0} is required")]
    Missing(&'static str),

    /// A value that must be strictly positive is zero.
    #[error("{0} must be greater than zero")]
    NotPositive(&'static str),

    /// A value could not be interpreted.
    #[error("{field} is invalid: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Validate a fully merged configuration.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.auth.api_key.is_empty() {
        errors.push(ValidationError::Missing("APP_API_KEY"));
    }
    if config.recaptcha.api_key.is_empty() {
        errors.push(ValidationError::Missing("GOOGLE_RECAPTCHA_API_KEY"));
    }
    if config.recaptcha.project_id.is_empty() && config.recaptcha.endpoint.is_none() {
        errors.push(ValidationError::Missing("GOOGLE_RECAPTCHA_PROJECT_ID"));
    }
    if let Some(endpoint) = &config.recaptcha.endpoint {
        if let Err(e) = url::Url::parse(endpoint) {
            errors.push(ValidationError::Invalid {
                field: "recaptcha.endpoint",
                reason: e.to_string(),
            });
        }
    }

    if config.rate_limit.requests == 0 {
        errors.push(ValidationError::NotPositive("rate_limit.requests"));
    }
    if config.rate_limit.window_secs == 0 {
        errors.push(ValidationError::NotPositive("rate_limit.window_secs"));
    }
    if config.recaptcha.timeout_secs == 0 {
        errors.push(ValidationError::NotPositive("recaptcha.timeout_secs"));
    }
    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::NotPositive("timeouts.request_secs"));
    }
    if config.security.max_body_size == 0 {
        errors.push(ValidationError::NotPositive("security.max_body_size"));
    }

    if config.observability.metrics_enabled
        && config
            .observability
            .metrics_address
            .parse::<std::net::SocketAddr>()
            .is_err()
    {
        errors.push(ValidationError::Invalid {
            field: "observability.metrics_address",
            reason: format!("'{}' is not a socket address", config.observability.metrics_address),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
