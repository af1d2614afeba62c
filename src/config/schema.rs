//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the
//! gateway. All types derive Serde traits for deserialization from
//! config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener configuration (bind address, connection backpressure).
    pub listener: ListenerConfig,

    /// Upstream API settings.
    pub upstream: UpstreamConfig,

    /// Rate limiting settings.
    pub rate_limit: RateLimitConfig,

    /// Secret identifiers resolved through the secret store.
    pub secrets: SecretsConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Maximum concurrent connections (backpressure).
    pub max_connections: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            max_connections: 10_000,
        }
    }
}

/// Upstream API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Base URL requests are forwarded to. The inbound path is appended
    /// verbatim after stripping leading slashes.
    pub base_url: String,

    /// Total request timeout in seconds; a stalled upstream must not
    /// hang a caller indefinitely.
    pub timeout_secs: u64,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com".to_string(),
            timeout_secs: 30,
        }
    }
}

/// Rate limiting configuration (sliding window log).
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Window duration in milliseconds.
    pub window_ms: u64,

    /// Maximum admitted requests per client per window.
    pub max_requests: u32,

    /// Redis connection URL for the persistent store. When absent, an
    /// in-process store is used (single-instance deployments only).
    pub redis_url: Option<String>,

    /// Key prefix for per-client records in the store.
    pub key_prefix: String,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            window_ms: 60_000,
            max_requests: 60,
            redis_url: None,
            key_prefix: "rate_limit:".to_string(),
        }
    }
}

/// Secret identifiers. These name entries in the backing secret store,
/// not the secret values themselves.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SecretsConfig {
    /// Identifier of the upstream API credential.
    pub api_key_secret_id: String,

    /// Identifier of the token-signing key.
    pub jwt_secret_id: String,
}

impl Default for SecretsConfig {
    fn default() -> Self {
        Self {
            api_key_secret_id: "UPSTREAM_API_KEY".to_string(),
            jwt_secret_id: "JWT_SIGNING_SECRET".to_string(),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_deployment_environment() {
        let config = GatewayConfig::default();
        assert_eq!(config.rate_limit.window_ms, 60_000);
        assert_eq!(config.rate_limit.max_requests, 60);
        assert_eq!(config.upstream.timeout_secs, 30);
    }

    #[test]
    fn test_minimal_toml_parses_with_defaults() {
        let config: GatewayConfig = toml::from_str(
            r#"
            [upstream]
            base_url = "http://127.0.0.1:9100"
            "#,
        )
        .unwrap();
        assert_eq!(config.upstream.base_url, "http://127.0.0.1:9100");
        assert_eq!(config.rate_limit.key_prefix, "rate_limit:");
        assert!(config.rate_limit.redis_url.is_none());
    }
}
