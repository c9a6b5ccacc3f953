//! reCAPTCHA verification gateway.
//!
//! Admission control (per-client rate limiting, constant-time API key
//! check) in front of a reCAPTCHA Enterprise assessment call.

pub mod assessment;
pub mod config;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod security;

pub use config::schema::GatewayConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
