//! Configuration loading from disk and the process environment.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::{GatewayConfig, DEVELOPMENT_SITE_KEY};
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// A validated configuration plus the non-fatal notices produced while
/// assembling it. Notices are returned rather than logged because logging
/// is configured from the result.
#[derive(Debug)]
pub struct LoadedConfig {
    pub config: GatewayConfig,
    pub warnings: Vec<String>,
}

/// Load configuration: defaults, then the optional TOML file, then the
/// process environment. The merged result is validated.
pub fn load_config(path: Option<&Path>) -> Result<LoadedConfig, ConfigError> {
    let config = match path {
        Some(path) => {
            let content = fs::read_to_string(path)?;
            toml::from_str(&content)?
        }
        None => GatewayConfig::default(),
    };

    finalize(config, |key| std::env::var(key).ok())
}

/// Apply environment overrides and defaults, then validate.
pub fn finalize<F>(mut config: GatewayConfig, lookup: F) -> Result<LoadedConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut warnings = apply_env_overrides(&mut config, lookup);

    if config.recaptcha.site_key.is_empty() {
        warnings.push(
            "GOOGLE_RECAPTCHA_SITE_KEY not set, using default (not recommended for production)"
                .to_string(),
        );
        config.recaptcha.site_key = DEVELOPMENT_SITE_KEY.to_string();
    }

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(LoadedConfig { config, warnings })
}

/// Overlay environment variables onto `config`.
///
/// Empty variables count as unset. Unparseable numeric values are ignored
/// and reported as warnings so the previous value stays in effect.
pub fn apply_env_overrides<F>(config: &mut GatewayConfig, lookup: F) -> Vec<String>
where
    F: Fn(&str) -> Option<String>,
{
    let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
    let mut warnings = Vec::new();

    if let Some(v) = get("APP_API_KEY") {
        config.auth.api_key = v;
    }
    if let Some(v) = get("GOOGLE_RECAPTCHA_API_KEY") {
        config.recaptcha.api_key = v;
    }
    if let Some(v) = get("GOOGLE_RECAPTCHA_SITE_KEY") {
        config.recaptcha.site_key = v;
    }
    if let Some(v) = get("GOOGLE_RECAPTCHA_PROJECT_ID") {
        config.recaptcha.project_id = v;
    }

    if let Some(v) = get("PORT") {
        match v.trim().parse::<u16>() {
            Ok(port) => config.listener.port = port,
            Err(_) => warnings.push(format!("ignoring invalid PORT '{}'", v)),
        }
    }

    if let Some(v) = get("RATE_LIMIT_REQUESTS") {
        match v.trim().parse::<u32>() {
            Ok(n) if n > 0 => config.rate_limit.requests = n,
            _ => warnings.push(format!("ignoring invalid RATE_LIMIT_REQUESTS '{}'", v)),
        }
    }

    if let Some(v) = get("RATE_LIMIT_WINDOW_SECONDS") {
        match v.trim().parse::<u64>() {
            Ok(n) if n > 0 => config.rate_limit.window_secs = n,
            _ => warnings.push(format!("ignoring invalid RATE_LIMIT_WINDOW_SECONDS '{}'", v)),
        }
    }

    if let Some(v) = get("CORS_ALLOWED_ORIGINS") {
        config.cors.allowed_origins = v
            .split(',')
            .map(|origin| origin.trim().to_string())
            .collect();
    }

    if let Some(v) = get("LOG_LEVEL") {
        config.observability.log_level = v.trim().to_ascii_lowercase();
    }

    warnings
}
