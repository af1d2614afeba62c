//! Gateway pipeline subsystem.
//!
//! # Data Flow
//! ```text
//! inbound request
//!     → authenticate (bearer token, signing secret from provider)
//!     → resolve upstream credential (secret provider)
//!     → derive client id (X-Api-Key → peer address → "anonymous")
//!     → admit or reject (sliding-window limiter)
//!     → normalize (canonical path/headers/body)
//!     → forward (credential injection, explicit decompression)
//!     → format (uniform JSON envelope)
//! ```
//!
//! Each stage can short-circuit; every failure renders through the
//! same envelope with its fixed status. No stage retries.

pub mod forward;
pub mod normalize;
pub mod respond;
pub mod server;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{header, HeaderMap, Method, Request},
    response::{IntoResponse, Response},
};
use chrono::Utc;

use crate::auth;
use crate::config::GatewayConfig;
use crate::error::{GatewayError, GatewayResult};
use crate::gateway::forward::Forwarder;
use crate::gateway::normalize::RawBody;
use crate::observability::metrics;
use crate::rate_limit::{Admission, SlidingWindowLimiter, StoreBackend};
use crate::secrets::SecretProvider;

pub use server::HttpServer;

/// Inbound bodies above this size are rejected during normalization.
const MAX_BODY_SIZE: usize = 2 * 1024 * 1024;

/// Shared per-process gateway state.
pub struct GatewayState {
    pub config: GatewayConfig,
    pub secrets: SecretProvider,
    pub limiter: SlidingWindowLimiter<StoreBackend>,
    pub forwarder: Forwarder,
}

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub inner: Arc<GatewayState>,
}

/// Main gateway handler. Runs the pipeline and renders any failure as
/// the uniform envelope.
pub async fn proxy_handler(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    request: Request<Body>,
) -> Response {
    let start = Instant::now();
    let method = request.method().clone();

    // Preflights are answered at the edge, before auth or admission.
    if method == Method::OPTIONS {
        return respond::preflight_response();
    }

    let response = match handle(&state, addr, request).await {
        Ok(response) => response,
        Err(err) => {
            tracing::debug!(error = %err, status = err.status().as_u16(), "Request short-circuited");
            err.into_response()
        }
    };

    metrics::record_request(method.as_str(), response.status().as_u16(), start);
    response
}

async fn handle(
    state: &AppState,
    addr: SocketAddr,
    request: Request<Body>,
) -> GatewayResult<Response> {
    let s = &state.inner;
    let (parts, body) = request.into_parts();

    // Authenticate.
    let signing_secret = s.secrets.get(&s.config.secrets.jwt_secret_id)?;
    let authorization = parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());
    let claims = auth::verify(authorization, &signing_secret)?;
    tracing::debug!(subject = %claims.sub, "Caller authenticated");

    // Resolve the protected upstream credential.
    let credential = s.secrets.get(&s.config.secrets.api_key_secret_id)?;

    // Admit or reject.
    let client_id = derive_client_id(&parts.headers, Some(addr));
    let now_ms = Utc::now().timestamp_millis();
    if s.limiter.admit(&client_id, now_ms).await == Admission::Limited {
        tracing::info!(client = %client_id, "Rate limit exceeded");
        return Err(GatewayError::RateLimited);
    }

    // Normalize.
    let bytes = axum::body::to_bytes(body, MAX_BODY_SIZE)
        .await
        .map_err(|e| GatewayError::RequestParse(format!("failed reading body: {}", e)))?;
    let raw_body = if bytes.is_empty() {
        None
    } else {
        let text = String::from_utf8(bytes.to_vec())
            .map_err(|_| GatewayError::RequestParse("body is not valid UTF-8".into()))?;
        if is_base64_transfer(&parts.headers) {
            Some(RawBody::Base64(text))
        } else {
            Some(RawBody::Text(text))
        }
    };
    let path = parts
        .uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");
    let proxy_request = normalize::normalize(path, parts.method, &parts.headers, raw_body)?;

    // Forward.
    let upstream = s.forwarder.forward(proxy_request, &credential).await?;

    // Format: mirror the upstream status and body.
    Ok(respond::format_response(upstream.status, &upstream.body))
}

/// Rate-limiting identity: `X-Api-Key` header, else the caller's source
/// address, else the literal `anonymous`.
fn derive_client_id(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    headers
        .get("x-api-key")
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .or_else(|| peer.map(|a| a.ip().to_string()))
        .unwrap_or_else(|| "anonymous".to_string())
}

fn is_base64_transfer(headers: &HeaderMap) -> bool {
    headers
        .get("content-transfer-encoding")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.eq_ignore_ascii_case("base64"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_client_id_prefers_api_key() {
        let mut headers = HeaderMap::new();
        headers.insert("x-api-key", HeaderValue::from_static("abc"));
        let peer: SocketAddr = "10.0.0.7:51000".parse().unwrap();
        assert_eq!(derive_client_id(&headers, Some(peer)), "abc");
    }

    #[test]
    fn test_client_id_falls_back_to_peer_address() {
        let peer: SocketAddr = "10.0.0.7:51000".parse().unwrap();
        assert_eq!(derive_client_id(&HeaderMap::new(), Some(peer)), "10.0.0.7");
    }

    #[test]
    fn test_client_id_falls_back_to_anonymous() {
        assert_eq!(derive_client_id(&HeaderMap::new(), None), "anonymous");

        let mut headers = HeaderMap::new();
        headers.insert("x-api-key", HeaderValue::from_static("  "));
        assert_eq!(derive_client_id(&headers, None), "anonymous");
    }

    #[test]
    fn test_base64_transfer_detection() {
        let mut headers = HeaderMap::new();
        headers.insert("content-transfer-encoding", HeaderValue::from_static("BASE64"));
        assert!(is_base64_transfer(&headers));
        assert!(!is_base64_transfer(&HeaderMap::new()));
    }
}
