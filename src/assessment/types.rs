//! Assessment request/response types and error definitions.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Maximum number of upstream error-body bytes kept in an error.
pub const MAX_ERROR_BODY_BYTES: usize = 1024;

/// Normalized assessment outcome returned to callers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssessmentResult {
    pub valid: bool,

    #[serde(default, skip_serializing_if = "is_zero")]
    pub score: f64,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub action: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub invalid_reason: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub reasons: Vec<String>,

    /// RFC 3339 timestamp as reported by the provider.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create_time: Option<String>,
}

fn is_zero(value: &f64) -> bool {
    *value == 0.0
}

/// Body of a create-assessment call.
#[derive(Debug, Serialize)]
pub(crate) struct AssessmentRequest<'a> {
    pub event: AssessmentEvent<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AssessmentEvent<'a> {
    pub token: &'a str,
    pub site_key: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected_action: Option<&'a str>,
}

/// Subset of the provider's assessment resource that we read.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub(crate) struct AssessmentResponse {
    pub token_properties: TokenProperties,
    pub risk_analysis: RiskAnalysis,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub(crate) struct TokenProperties {
    pub valid: bool,
    pub action: String,
    pub invalid_reason: String,
    pub create_time: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct RiskAnalysis {
    pub score: f64,
    pub reasons: Vec<String>,
}

impl From<AssessmentResponse> for AssessmentResult {
    fn from(response: AssessmentResponse) -> Self {
        Self {
            valid: response.token_properties.valid,
            score: response.risk_analysis.score,
            action: response.token_properties.action,
            invalid_reason: response.token_properties.invalid_reason,
            reasons: response.risk_analysis.reasons,
            create_time: response.token_properties.create_time,
        }
    }
}

/// Errors that can occur while obtaining an assessment.
#[derive(Debug, Error)]
pub enum AssessmentError {
    /// The token was empty or whitespace.
    #[error("token is required")]
    EmptyToken,

    /// The HTTP client could not be built.
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    /// The request could not be sent or the response body not read.
    #[error("request to reCAPTCHA Enterprise failed: {0}")]
    Request(#[source] reqwest::Error),

    /// The provider answered with a non-200 status.
    #[error("reCAPTCHA Enterprise returned status {status}: {body}")]
    Status { status: u16, body: String },

    /// The provider's body was not a valid assessment.
    #[error("failed to decode assessment response: {0}")]
    Decode(#[source] serde_json::Error),
}

/// Truncate `body` to at most [`MAX_ERROR_BODY_BYTES`] bytes on a char boundary.
pub(crate) fn truncate_body(body: &str) -> String {
    if body.len() <= MAX_ERROR_BODY_BYTES {
        return body.to_string();
    }
    let mut end = MAX_ERROR_BODY_BYTES;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    body[..end].to_string()
}
