//! Response formatting: the uniform JSON envelope.
//!
//! # Responsibilities
//! - Serialize any outcome to a JSON body the client can always parse
//! - Force `Content-Encoding: identity` (compressed upstream bytes are
//!   never relayed verbatim)
//! - Attach permissive cross-origin headers and the allowed-methods
//!   list on every response, including errors and preflights
//!
//! # Design Decisions
//! - Serialization failure downgrades to a fixed 500 generic envelope
//!   rather than ever emitting a non-JSON or empty body

use axum::{
    body::Body,
    http::{header, StatusCode},
    response::Response,
};
use serde_json::Value;

const ALLOW_METHODS: &str = "GET, POST, PUT, DELETE, OPTIONS";
const ALLOW_HEADERS: &str = "Content-Type, Authorization, X-Api-Key";
const GENERIC_ERROR_BODY: &str = "{\"error\":\"Internal server error\"}";

/// Wrap an outcome into the wire response.
pub fn format_response(status: StatusCode, body: &Value) -> Response {
    match serde_json::to_string(body) {
        Ok(json) => build(status, json),
        Err(e) => {
            tracing::error!(error = %e, "Response serialization failed, downgrading to generic envelope");
            build(StatusCode::INTERNAL_SERVER_ERROR, GENERIC_ERROR_BODY.to_string())
        }
    }
}

/// Error envelope: `{"error": "<message>"}`.
pub fn error_response(status: StatusCode, message: &str) -> Response {
    format_response(status, &serde_json::json!({ "error": message }))
}

/// Answer a CORS preflight directly at the gateway edge.
pub fn preflight_response() -> Response {
    let mut response = build(StatusCode::NO_CONTENT, String::new());
    response.headers_mut().remove(header::CONTENT_TYPE);
    response
}

fn build(status: StatusCode, json: String) -> Response {
    // Static header values; the builder cannot fail here.
    Response::builder()
        .status(status)
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::CONTENT_ENCODING, "identity")
        .header(header::ACCESS_CONTROL_ALLOW_ORIGIN, "*")
        .header(header::ACCESS_CONTROL_ALLOW_METHODS, ALLOW_METHODS)
        .header(header::ACCESS_CONTROL_ALLOW_HEADERS, ALLOW_HEADERS)
        .body(Body::from(json))
        .unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_body_serialized_with_identity_encoding() {
        let response = format_response(StatusCode::OK, &json!({"result": "ok"}));
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CONTENT_ENCODING).unwrap(),
            "identity"
        );
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "application/json"
        );
    }

    #[test]
    fn test_cors_headers_present() {
        let response = format_response(StatusCode::OK, &json!({}));
        assert_eq!(
            response
                .headers()
                .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
                .unwrap(),
            "*"
        );
        assert_eq!(
            response
                .headers()
                .get(header::ACCESS_CONTROL_ALLOW_METHODS)
                .unwrap(),
            ALLOW_METHODS
        );
    }

    #[test]
    fn test_error_envelope_shape() {
        let response = error_response(StatusCode::TOO_MANY_REQUESTS, "Rate limit exceeded");
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    }

    #[test]
    fn test_preflight_no_content() {
        let response = preflight_response();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert!(response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_METHODS)
            .is_some());
    }

    #[tokio::test]
    async fn test_error_body_is_parseable_json() {
        let response = error_response(StatusCode::UNAUTHORIZED, "Unauthorized: missing bearer token");
        let bytes = axum::body::to_bytes(response.into_body(), 1024).await.unwrap();
        let value: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(value["error"], "Unauthorized: missing bearer token");
    }
}
