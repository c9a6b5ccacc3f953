//! Token verification endpoint.
//!
//! Only reached after admission; forwards the token to the assessment
//! provider and relays the normalized result.

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::assessment::{AssessmentError, AssessmentResult};
use crate::error::AppError;
use crate::http::server::AppState;
use crate::observability::metrics;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifyRequest {
    pub token: String,
    #[serde(default)]
    pub action: String,
}

pub async fn verify(
    State(state): State<AppState>,
    payload: Result<Json<VerifyRequest>, JsonRejection>,
) -> Result<Json<AssessmentResult>, AppError> {
    let Json(payload) = payload.map_err(|rejection| {
        AppError::invalid_request("invalid request body").with_details(rejection.body_text())
    })?;

    if payload.token.trim().is_empty() {
        return Err(AssessmentError::EmptyToken.into());
    }

    match state.assessor.assess(&payload.token, &payload.action).await {
        Ok(result) => {
            metrics::record_assessment(if result.valid { "valid" } else { "invalid" });
            tracing::debug!(
                valid = result.valid,
                score = result.score,
                action = %result.action,
                "Assessment completed"
            );
            Ok(Json(result))
        }
        Err(e) => {
            metrics::record_assessment("error");
            tracing::warn!(error = %e, "Assessment failed");
            Err(e.into())
        }
    }
}
