//! Assessment provider integration.
//!
//! # Data Flow
//! ```text
//! verify handler (token, action)
//!     → Assessor::assess
//!     → recaptcha.rs (POST create-assessment, timeout)
//!     → types.rs (normalize provider response)
//!     → AssessmentResult back to the handler
//! ```
//!
//! Handlers depend on the `Assessor` trait, not the concrete client, so
//! tests can substitute a canned provider.

pub mod recaptcha;
pub mod types;

use async_trait::async_trait;

pub use recaptcha::RecaptchaClient;
pub use types::{AssessmentError, AssessmentResult};

/// Something that can score a client-side token.
#[async_trait]
pub trait Assessor: Send + Sync {
    async fn assess(&self, token: &str, action: &str) -> Result<AssessmentResult, AssessmentError>;
}
