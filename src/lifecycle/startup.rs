//! Startup orchestration.
//!
//! # Responsibilities
//! - Turn a validated configuration into a ready-to-run server
//! - Build the assessment client
//! - Start background tasks (rate limiter reclamation)
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Listeners are bound by the caller, after construction succeeds

use std::sync::Arc;

use thiserror::Error;

use crate::assessment::{AssessmentError, RecaptchaClient};
use crate::config::{GatewayConfig, ValidationError};
use crate::http::HttpServer;

/// Errors that prevent the gateway from starting.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ValidationError),

    #[error("assessment client: {0}")]
    Assessment(#[from] AssessmentError),
}

/// Build the production server: reCAPTCHA client plus admission layers.
pub fn build_server(config: GatewayConfig) -> Result<HttpServer, StartupError> {
    let client = RecaptchaClient::new(&config.recaptcha)?;
    tracing::info!(endpoint = %client.endpoint(), "Assessment client ready");

    HttpServer::new(config, Arc::new(client))
}
