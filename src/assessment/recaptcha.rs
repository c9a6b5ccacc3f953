//! reCAPTCHA Enterprise client.
//!
//! # Responsibilities
//! - Build the create-assessment request for a token
//! - Enforce the outbound timeout
//! - Map provider failures to `AssessmentError`
//!
//! The Google API key is sent as a query parameter and must never be logged;
//! log the endpoint without it.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};

use crate::assessment::types::{
    truncate_body, AssessmentError, AssessmentEvent, AssessmentRequest, AssessmentResponse,
    AssessmentResult,
};
use crate::assessment::Assessor;
use crate::config::RecaptchaConfig;

/// Client for the assessments endpoint of one project.
#[derive(Clone)]
pub struct RecaptchaClient {
    client: Client,
    api_key: String,
    site_key: String,
    endpoint: String,
}

impl RecaptchaClient {
    pub fn new(config: &RecaptchaConfig) -> Result<Self, AssessmentError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(AssessmentError::Client)?;

        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            site_key: config.site_key.clone(),
            endpoint: config.assessments_endpoint(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl std::fmt::Debug for RecaptchaClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecaptchaClient")
            .field("endpoint", &self.endpoint)
            .field("site_key", &self.site_key)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Assessor for RecaptchaClient {
    async fn assess(&self, token: &str, action: &str) -> Result<AssessmentResult, AssessmentError> {
        if token.trim().is_empty() {
            return Err(AssessmentError::EmptyToken);
        }

        let action = action.trim();
        let payload = AssessmentRequest {
            event: AssessmentEvent {
                token,
                site_key: &self.site_key,
                expected_action: (!action.is_empty()).then_some(action),
            },
        };

        let response = self
            .client
            .post(&self.endpoint)
            .query(&[("key", self.api_key.as_str())])
            .json(&payload)
            .send()
            .await
            .map_err(|e| AssessmentError::Request(e.without_url()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| AssessmentError::Request(e.without_url()))?;

        if status != StatusCode::OK {
            tracing::warn!(
                endpoint = %self.endpoint,
                status = status.as_u16(),
                "Assessment provider returned an error"
            );
            return Err(AssessmentError::Status {
                status: status.as_u16(),
                body: truncate_body(&body),
            });
        }

        let assessment: AssessmentResponse =
            serde_json::from_str(&body).map_err(AssessmentError::Decode)?;
        Ok(assessment.into())
    }
}
