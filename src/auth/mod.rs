//! Bearer-token authentication.
//!
//! # Responsibilities
//! - Extract the bearer token from the Authorization header
//! - Verify the HS256 signature against the signing secret
//! - Check the expiry claim against the current time
//!
//! # Design Decisions
//! - The expiry claim is checked explicitly even though signature
//!   validation already enforces it; the redundant check is a
//!   deliberate defense-in-depth measure and must stay
//! - Claims are ephemeral, scoped to a single call

use chrono::Utc;
use jsonwebtoken::{decode, errors::ErrorKind, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

use crate::error::AuthError;

/// Claims carried by a verified token.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Client subject identifier.
    pub sub: String,
    /// Expiry, seconds since the Unix epoch.
    pub exp: usize,
}

/// Verify an `Authorization` header value and return its claims.
pub fn verify(
    authorization: Option<&str>,
    signing_secret: &str,
) -> Result<Claims, AuthError> {
    let header = authorization.ok_or(AuthError::MissingHeader)?;
    let token = header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or(AuthError::MissingHeader)?;

    let decoded = decode::<Claims>(
        token,
        &DecodingKey::from_secret(signing_secret.as_bytes()),
        &Validation::new(Algorithm::HS256),
    )
    .map_err(|e| match e.kind() {
        ErrorKind::ExpiredSignature => AuthError::Expired,
        _ => AuthError::InvalidSignature,
    })?;

    // Independent expiry check on top of signature validation.
    if (decoded.claims.exp as i64) <= Utc::now().timestamp() {
        return Err(AuthError::Expired);
    }

    Ok(decoded.claims)
}
