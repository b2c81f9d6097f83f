//! Admin key middleware
//!
//! Dataset upload and export are restricted to holders of the admin key.
//! The configuration stores only the hex SHA-256 of the key. The key itself
//! arrives in the `x-admin-key` header or as a bearer token.

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};
use sha2::{Digest, Sha256};
use tracing::warn;

use crate::error::ApiError;
use crate::AppState;

/// Header carrying the plain admin key
pub const ADMIN_KEY_HEADER: &str = "x-admin-key";

/// Hex SHA-256 of a key, as stored in the configuration
pub fn hash_admin_key(key: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(key.as_bytes());
    format!("{:x}", hasher.finalize())
}

fn presented_key(headers: &HeaderMap) -> Option<&str> {
    if let Some(value) = headers.get(ADMIN_KEY_HEADER).and_then(|v| v.to_str().ok()) {
        return Some(value.trim());
    }

    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
}

/// Admin key middleware
///
/// Passes every request through when no key hash is configured.
pub async fn admin_auth_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let Some(expected) = state.admin_key_sha256.as_deref() else {
        return Ok(next.run(request).await);
    };

    let Some(key) = presented_key(request.headers()) else {
        return Err(ApiError::Unauthorized("Admin key required".to_string()));
    };

    if !hash_admin_key(key).eq_ignore_ascii_case(expected.trim()) {
        warn!(uri = %request.uri(), "Rejected request with wrong admin key");
        return Err(ApiError::Unauthorized("Invalid admin key".to_string()));
    }

    Ok(next.run(request).await)
}
