//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, tracing, timeout, body limit)
//!     → middleware/cors.rs (CORS headers, preflight)
//!     → middleware/admission.rs (protected routes only)
//!     → handlers/ (health, verify)
//!     → Send to client
//! ```

pub mod handlers;
pub mod middleware;
pub mod server;

pub use server::{AppState, HttpServer};
