//! Admission decision for protected endpoints.
//!
//! Rate limit first, then credential. Both run before any handler work, so
//! rejected requests never reach the assessment provider.

use thiserror::Error;

use crate::security::credential::CredentialGate;
use crate::security::rate_limit::AdmissionLimiter;

/// Why a request was not admitted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AdmissionError {
    /// The client has used its quota for the current window.
    #[error("rate limit exceeded")]
    RateLimited { retry_after_secs: u64 },

    /// No API key was presented.
    #[error("missing API key")]
    MissingCredential,

    /// An API key was presented but did not match.
    #[error("invalid API key")]
    CredentialMismatch,
}

impl AdmissionError {
    /// Stable label for logs and metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            AdmissionError::RateLimited { .. } => "rate_limited",
            AdmissionError::MissingCredential => "missing_credential",
            AdmissionError::CredentialMismatch => "credential_mismatch",
        }
    }
}

/// The two admission layers composed in request order.
#[derive(Debug)]
pub struct Gatekeeper {
    limiter: AdmissionLimiter,
    credentials: CredentialGate,
}

impl Gatekeeper {
    pub fn new(limiter: AdmissionLimiter, credentials: CredentialGate) -> Self {
        Self {
            limiter,
            credentials,
        }
    }

    /// Decide whether a request from `client_key` carrying `presented` may
    /// proceed. A request rejected by the credential check has still spent
    /// a rate limit token.
    pub fn admit(&self, client_key: &str, presented: Option<&[u8]>) -> Result<(), AdmissionError> {
        if !self.limiter.allow(client_key) {
            return Err(AdmissionError::RateLimited {
                retry_after_secs: self.limiter.retry_after_secs(),
            });
        }

        match presented {
            None | Some([]) => Err(AdmissionError::MissingCredential),
            Some(key) if self.credentials.check(key) => Ok(()),
            Some(_) => Err(AdmissionError::CredentialMismatch),
        }
    }

    pub fn limiter(&self) -> &AdmissionLimiter {
        &self.limiter
    }

    /// Stop background work owned by the admission layers.
    pub fn shutdown(&self) {
        self.limiter.stop();
    }
}
