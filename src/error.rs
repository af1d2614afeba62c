//! Gateway-wide error taxonomy and HTTP envelope mapping.
//!
//! # Responsibilities
//! - Define the errors each pipeline stage can produce
//! - Map every error to a fixed HTTP status
//! - Render errors as the uniform `{"error": "..."}` JSON envelope
//!
//! # Design Decisions
//! - Every error is caught at the handler boundary; nothing propagates
//!   unhandled to the caller
//! - Upstream failures carry the upstream status when it is known,
//!   otherwise surface as 502

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::gateway::respond;

/// Authentication failures. Messages begin with "Unauthorized: " so the
/// envelope body matches the wire contract for 401 responses.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    /// No Authorization header, or no bearer token inside it.
    #[error("Unauthorized: missing bearer token")]
    MissingHeader,

    /// Token signature did not verify against the signing secret.
    #[error("Unauthorized: invalid token signature")]
    InvalidSignature,

    /// Token expiry claim is in the past.
    #[error("Unauthorized: token expired")]
    Expired,
}

/// Errors that can occur anywhere in the gateway pipeline.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Caller failed bearer-token authentication.
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// Caller exhausted its sliding-window quota.
    #[error("Rate limit exceeded, retry later")]
    RateLimited,

    /// Inbound body could not be decoded as JSON.
    #[error("Invalid request body: {0}")]
    RequestParse(String),

    /// Secret store unreachable or the secret is absent.
    #[error("Secret unavailable: {0}")]
    SecretUnavailable(String),

    /// Upstream call failed: network error, timeout, or a reply that
    /// could not be decompressed/parsed.
    #[error("Upstream error: {message}")]
    Upstream {
        status: Option<StatusCode>,
        message: String,
    },

    /// Response serialization failed. Recoverable: the formatter falls
    /// back to a generic envelope.
    #[error("Response formatting failed")]
    Format,
}

impl GatewayError {
    /// Fixed status code for each failure state.
    pub fn status(&self) -> StatusCode {
        match self {
            GatewayError::Auth(_) => StatusCode::UNAUTHORIZED,
            GatewayError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            GatewayError::RequestParse(_) => StatusCode::BAD_REQUEST,
            GatewayError::SecretUnavailable(_) => StatusCode::INTERNAL_SERVER_ERROR,
            GatewayError::Upstream { status, .. } => status.unwrap_or(StatusCode::BAD_GATEWAY),
            GatewayError::Format => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        respond::error_response(self.status(), &self.to_string())
    }
}

/// Result type for gateway operations.
pub type GatewayResult<T> = Result<T, GatewayError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            GatewayError::Auth(AuthError::Expired).status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(GatewayError::RateLimited.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(
            GatewayError::RequestParse("bad".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            GatewayError::SecretUnavailable("k".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_upstream_status_propagation() {
        let known = GatewayError::Upstream {
            status: Some(StatusCode::SERVICE_UNAVAILABLE),
            message: "overloaded".into(),
        };
        assert_eq!(known.status(), StatusCode::SERVICE_UNAVAILABLE);

        let unknown = GatewayError::Upstream {
            status: None,
            message: "connection refused".into(),
        };
        assert_eq!(unknown.status(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn test_auth_messages_start_with_unauthorized() {
        for err in [
            AuthError::MissingHeader,
            AuthError::InvalidSignature,
            AuthError::Expired,
        ] {
            assert!(err.to_string().starts_with("Unauthorized: "));
        }
    }
}
