//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (window > 0, limits > 0)
//! - Check URLs parse before any subsystem is built from them
//!
//! # Design Decisions
//! - Returns all validation errors, not just the first
//! - Validation is a pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use url::Url;

use crate::config::schema::GatewayConfig;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// A single semantic validation failure.
#[derive(Debug, PartialEq, Eq)]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validate a parsed configuration.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.is_empty() {
        errors.push(ValidationError {
            field: "listener.bind_address",
            message: "must not be empty".into(),
        });
    }

    if config.listener.max_connections == 0 {
        errors.push(ValidationError {
            field: "listener.max_connections",
            message: "must be greater than zero".into(),
        });
    }

    if let Err(e) = Url::parse(&config.upstream.base_url) {
        errors.push(ValidationError {
            field: "upstream.base_url",
            message: format!("not a valid URL: {}", e),
        });
    }

    if config.upstream.timeout_secs == 0 {
        errors.push(ValidationError {
            field: "upstream.timeout_secs",
            message: "must be greater than zero".into(),
        });
    }

    if config.rate_limit.window_ms == 0 {
        errors.push(ValidationError {
            field: "rate_limit.window_ms",
            message: "must be greater than zero".into(),
        });
    }

    if config.rate_limit.max_requests == 0 {
        errors.push(ValidationError {
            field: "rate_limit.max_requests",
            message: "must be greater than zero".into(),
        });
    }

    if let Some(redis_url) = &config.rate_limit.redis_url {
        if let Err(e) = Url::parse(redis_url) {
            errors.push(ValidationError {
                field: "rate_limit.redis_url",
                message: format!("not a valid URL: {}", e),
            });
        }
    }

    if config.secrets.api_key_secret_id.is_empty() {
        errors.push(ValidationError {
            field: "secrets.api_key_secret_id",
            message: "must not be empty".into(),
        });
    }

    if config.secrets.jwt_secret_id.is_empty() {
        errors.push(ValidationError {
            field: "secrets.jwt_secret_id",
            message: "must not be empty".into(),
        });
    }

    let log_level = config.observability.log_level.to_ascii_lowercase();
    if !LOG_LEVELS.contains(&log_level.as_str()) {
        errors.push(ValidationError {
            field: "observability.log_level",
            message: format!(
                "must be one of trace, debug, info, warn, error (got {:?})",
                config.observability.log_level
            ),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
