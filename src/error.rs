//! HTTP-facing errors.
//!
//! Every rejection the gateway sends carries a machine-readable `code` next
//! to a user-safe message. Internal causes are logged, and surfaced as
//! `details` only where the caller can act on them.

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::assessment::AssessmentError;
use crate::security::AdmissionError;

pub const ERR_CODE_VALIDATION_FAILED: &str = "VALIDATION_FAILED";
pub const ERR_CODE_INVALID_REQUEST: &str = "INVALID_REQUEST";
pub const ERR_CODE_RECAPTCHA_FAILED: &str = "RECAPTCHA_FAILED";
pub const ERR_CODE_INTERNAL_ERROR: &str = "INTERNAL_ERROR";
pub const ERR_CODE_RATE_LIMIT_EXCEEDED: &str = "RATE_LIMIT_EXCEEDED";
pub const ERR_CODE_UNAUTHORIZED: &str = "UNAUTHORIZED";
pub const ERR_CODE_FORBIDDEN: &str = "FORBIDDEN";

/// JSON body of every error response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    pub error: String,
    pub code: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after: Option<u64>,
}

/// An error with a user-safe message, a status and an optional cause.
#[derive(Debug)]
pub struct AppError {
    pub code: &'static str,
    pub message: String,
    pub status: StatusCode,
    pub details: Option<String>,
    pub retry_after: Option<u64>,
}

impl AppError {
    fn new(code: &'static str, message: impl Into<String>, status: StatusCode) -> Self {
        Self {
            code,
            message: message.into(),
            status,
            details: None,
            retry_after: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ERR_CODE_VALIDATION_FAILED, message, StatusCode::BAD_REQUEST)
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(ERR_CODE_INVALID_REQUEST, message, StatusCode::BAD_REQUEST)
    }

    pub fn recaptcha(message: impl Into<String>) -> Self {
        Self::new(ERR_CODE_RECAPTCHA_FAILED, message, StatusCode::BAD_GATEWAY)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ERR_CODE_INTERNAL_ERROR, message, StatusCode::INTERNAL_SERVER_ERROR)
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.details {
            Some(details) => write!(f, "{}: {}", self.message, details),
            None => write!(f, "{}", self.message),
        }
    }
}

impl std::error::Error for AppError {}

impl From<AdmissionError> for AppError {
    fn from(err: AdmissionError) -> Self {
        match err {
            AdmissionError::RateLimited { retry_after_secs } => {
                let mut app = Self::new(
                    ERR_CODE_RATE_LIMIT_EXCEEDED,
                    err.to_string(),
                    StatusCode::TOO_MANY_REQUESTS,
                );
                app.retry_after = Some(retry_after_secs);
                app
            }
            AdmissionError::MissingCredential => {
                Self::new(ERR_CODE_UNAUTHORIZED, err.to_string(), StatusCode::UNAUTHORIZED)
            }
            AdmissionError::CredentialMismatch => {
                Self::new(ERR_CODE_FORBIDDEN, err.to_string(), StatusCode::FORBIDDEN)
            }
        }
    }
}

impl From<AssessmentError> for AppError {
    fn from(err: AssessmentError) -> Self {
        match err {
            AssessmentError::EmptyToken => Self::validation(err.to_string()),
            AssessmentError::Client(_) => Self::internal("assessment client unavailable"),
            _ => Self::recaptcha("recaptcha verification failed").with_details(err.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!(code = self.code, error = %self, "Request failed");
        }

        let retry_after = self.retry_after;
        let body = ErrorBody {
            error: self.message,
            code: self.code,
            details: self.details,
            retry_after,
        };

        let mut response = (self.status, Json(body)).into_response();
        if let Some(secs) = retry_after {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(secs));
        }
        response
    }
}
