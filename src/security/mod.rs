//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request to a protected route:
//!     → rate_limit.rs (per-client fixed-window quota)
//!     → credential.rs (constant-time API key check)
//!     → admission.rs (single admit/reject decision)
//!     → Pass to handler
//! ```
//!
//! # Design Decisions
//! - Fail closed: reject on any security check failure
//! - Spent quota is never refunded
//! - Secrets are never logged

pub mod admission;
pub mod credential;
pub mod rate_limit;

pub use admission::{AdmissionError, Gatekeeper};
pub use credential::{CredentialGate, API_KEY_HEADER};
pub use rate_limit::{AdmissionLimiter, LimiterConfig};
