//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! defaults (schema.rs)
//!     → optional TOML file (loader.rs)
//!     → environment overrides (loader.rs)
//!     → validation.rs (semantic checks)
//!     → GatewayConfig (validated, immutable)
//!     → shared via Arc to all subsystems
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require a restart
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks
//! - Secrets never appear in `Debug` output

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError, LoadedConfig};
pub use schema::{
    AuthConfig, CorsConfig, GatewayConfig, ListenerConfig, LogFormat, ObservabilityConfig,
    RateLimitConfig, RecaptchaConfig, SecurityConfig, TimeoutConfig,
};
pub use validation::ValidationError;
