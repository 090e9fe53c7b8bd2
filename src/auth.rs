//! Bearer-token authentication for `/convert`.
//!
//! Checks run in a fixed order so each failure maps to exactly one
//! [`ApiError`] kind: absent header → [`ApiError::AuthMissing`], wrong scheme →
//! [`ApiError::AuthMalformed`], wrong token → [`ApiError::AuthInvalid`].
//! Neither the configured secret nor the presented token is ever logged.

use crate::error::ApiError;

/// Scheme prefix expected at the start of the `Authorization` header.
pub const BEARER_PREFIX: &str = "Bearer ";

/// Validate a raw `Authorization` header value against `secret`.
///
/// Returns the presented token on success.
pub fn authenticate<'a>(header: Option<&'a str>, secret: &str) -> Result<&'a str, ApiError> {
    let header = match header {
        Some(h) if !h.is_empty() => h,
        _ => return Err(ApiError::AuthMissing),
    };

    let token = header
        .strip_prefix(BEARER_PREFIX)
        .ok_or(ApiError::AuthMalformed)?;

    if !constant_time_eq(token.as_bytes(), secret.as_bytes()) {
        return Err(ApiError::AuthInvalid);
    }

    Ok(token)
}

/// Byte comparison whose running time does not depend on where the inputs
/// first differ.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        result |= x ^ y;
    }
    result == 0
}
