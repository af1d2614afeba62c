//! Inbound request normalization.
//!
//! # Responsibilities
//! - Resolve the inbound body (base64, raw text, or already-parsed)
//!   into one canonical JSON value
//! - Strip transport-only headers before forwarding
//! - Strip leading path separators
//!
//! # Design Decisions
//! - The body shape is a tagged enum resolved exactly once here; later
//!   stages never re-sniff what kind of body arrived
//! - All three body forms of the same document normalize to the
//!   identical canonical value

use axum::http::{HeaderMap, Method};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde_json::Value;

use crate::error::{GatewayError, GatewayResult};

/// Headers that carry transport concerns of the inbound hop and must
/// not reach the upstream. The forwarder sets its own authorization
/// and accept-encoding.
const TRANSPORT_HEADERS: &[&str] = &[
    "host",
    "content-length",
    "x-api-key",
    "authorization",
    "connection",
    "accept-encoding",
    "content-transfer-encoding",
];

/// Inbound body before canonicalization.
#[derive(Debug, Clone)]
pub enum RawBody {
    /// Base64-encoded JSON document.
    Base64(String),
    /// Raw JSON text.
    Text(String),
    /// Already-structured value.
    Json(Value),
}

impl RawBody {
    /// Resolve to the canonical JSON value.
    fn canonicalize(self) -> GatewayResult<Value> {
        match self {
            RawBody::Json(value) => Ok(value),
            RawBody::Text(text) => serde_json::from_str(&text)
                .map_err(|e| GatewayError::RequestParse(format!("body is not valid JSON: {}", e))),
            RawBody::Base64(encoded) => {
                let bytes = BASE64
                    .decode(encoded.trim())
                    .map_err(|e| GatewayError::RequestParse(format!("invalid base64 body: {}", e)))?;
                serde_json::from_slice(&bytes).map_err(|e| {
                    GatewayError::RequestParse(format!("decoded body is not valid JSON: {}", e))
                })
            }
        }
    }
}

/// Canonical request produced by normalization, consumed by the
/// forwarder.
#[derive(Debug, Clone)]
pub struct ProxyRequest {
    /// Upstream path, no leading separators.
    pub path: String,
    pub method: Method,
    /// Inbound headers minus transport-only keys.
    pub headers: HeaderMap,
    pub body: Option<Value>,
}

/// Build the canonical request from inbound parts.
pub fn normalize(
    path: &str,
    method: Method,
    headers: &HeaderMap,
    body: Option<RawBody>,
) -> GatewayResult<ProxyRequest> {
    let mut forwarded = HeaderMap::new();
    for (name, value) in headers {
        if TRANSPORT_HEADERS.contains(&name.as_str()) {
            continue;
        }
        forwarded.append(name.clone(), value.clone());
    }

    let body = body.map(RawBody::canonicalize).transpose()?;

    Ok(ProxyRequest {
        path: path.trim_start_matches('/').to_string(),
        method,
        headers: forwarded,
        body,
    })
}
