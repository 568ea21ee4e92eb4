//! Configuration loading from disk and the process environment.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::GatewayConfig;
use crate::config::validation::{validate_config, ConfigIssue};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid value '{value}' for {var}")]
    Env { var: &'static str, value: String },

    #[error("Validation failed: {}", join_issues(.0))]
    Validation(Vec<ConfigIssue>),
}

fn join_issues(issues: &[ConfigIssue]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

pub const ENV_BIND_ADDRESS: &str = "SAAKRA_BIND_ADDRESS";
pub const ENV_RATE_LIMIT_WINDOW_MS: &str = "SAAKRA_RATE_LIMIT_WINDOW_MS";
pub const ENV_RATE_LIMIT_MAX_REQUESTS: &str = "SAAKRA_RATE_LIMIT_MAX_REQUESTS";
pub const ENV_DEVELOPMENT: &str = "SAAKRA_DEVELOPMENT";
pub const ENV_ADMIN_API_KEY: &str = "SAAKRA_ADMIN_API_KEY";

/// Load a configuration file, apply environment overrides and validate.
///
/// Without a path the built-in defaults are used as the base.
pub fn load_config(path: Option<&Path>) -> Result<GatewayConfig, ConfigError> {
    let mut config = match path {
        Some(path) => {
            let content = fs::read_to_string(path)?;
            toml::from_str(&content)?
        }
        None => GatewayConfig::default(),
    };

    apply_env_overrides(&mut config, |var| std::env::var(var).ok())?;
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Overlay knobs the calling environment may set on top of the file.
///
/// `lookup` abstracts `std::env::var` so tests do not touch process state.
pub fn apply_env_overrides<F>(config: &mut GatewayConfig, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(addr) = lookup(ENV_BIND_ADDRESS) {
        config.listener.bind_address = addr;
    }

    if let Some(raw) = lookup(ENV_RATE_LIMIT_WINDOW_MS) {
        config.rate_limit.window_ms = raw.trim().parse().map_err(|_| ConfigError::Env {
            var: ENV_RATE_LIMIT_WINDOW_MS,
            value: raw.clone(),
        })?;
    }

    if let Some(raw) = lookup(ENV_RATE_LIMIT_MAX_REQUESTS) {
        config.rate_limit.max_requests = raw.trim().parse().map_err(|_| ConfigError::Env {
            var: ENV_RATE_LIMIT_MAX_REQUESTS,
            value: raw.clone(),
        })?;
    }

    if let Some(raw) = lookup(ENV_DEVELOPMENT) {
        config.security.development_mode = match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "development" => true,
            "0" | "false" | "no" | "production" => false,
            _ => {
                return Err(ConfigError::Env {
                    var: ENV_DEVELOPMENT,
                    value: raw,
                })
            }
        };
    }

    if let Some(key) = lookup(ENV_ADMIN_API_KEY) {
        config.admin.api_key = key;
    }

    Ok(())
}
