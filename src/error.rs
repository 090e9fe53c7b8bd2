//! Error types for the edgequake-doc2md service.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`ApiError`] — **Rejection**: the request is refused before any
//!   conversion work starts (missing or wrong credentials, empty or oversized
//!   upload, malformed multipart body). Each variant maps to a specific HTTP
//!   status and a `{"detail": ...}` body.
//!
//! * [`ProcessingError`] — **Enveloped**: the request was accepted but the
//!   pipeline failed (temp file could not be written, converter faulted or
//!   produced nothing). These never change the HTTP status; they are reported
//!   inside [`crate::output::ConversionResponse`] with `success: false`, so
//!   clients only ever branch on one field.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

/// Request rejections surfaced with an explicit HTTP status.
#[derive(Debug, Error)]
pub enum ApiError {
    // ── Authentication ────────────────────────────────────────────────────
    /// No `Authorization` header was sent.
    #[error("Missing authorization header")]
    AuthMissing,

    /// The header does not use the `Bearer ` scheme.
    #[error("Invalid authorization format")]
    AuthMalformed,

    /// The bearer token does not match the configured secret.
    #[error("Invalid API token")]
    AuthInvalid,

    // ── Upload validation ─────────────────────────────────────────────────
    /// Uploaded file exceeds the configured limit.
    #[error("File too large. Max size: {:.1}MB", mebibytes(.limit_bytes))]
    PayloadTooLarge { limit_bytes: u64 },

    /// Uploaded file has zero bytes.
    #[error("Empty file")]
    EmptyPayload,

    // ── Request shape ─────────────────────────────────────────────────────
    /// The multipart body could not be parsed.
    #[error("Failed to parse multipart data: {detail}")]
    InvalidMultipart { detail: String },

    /// The multipart body has no `file` field.
    #[error("Missing required multipart field 'file'")]
    MissingFile,

    /// A request parameter has a value of the wrong type.
    #[error("Invalid value for '{name}': {value:?} is not a boolean")]
    InvalidParameter { name: &'static str, value: String },
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::AuthMissing | ApiError::AuthMalformed => StatusCode::UNAUTHORIZED,
            ApiError::AuthInvalid => StatusCode::FORBIDDEN,
            ApiError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::EmptyPayload | ApiError::InvalidMultipart { .. } => StatusCode::BAD_REQUEST,
            ApiError::MissingFile | ApiError::InvalidParameter { .. } => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
        }
    }

    /// True for the three authentication variants.
    pub fn is_auth(&self) -> bool {
        matches!(
            self,
            ApiError::AuthMissing | ApiError::AuthMalformed | ApiError::AuthInvalid
        )
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.is_auth() {
            tracing::info!("Authorization error: {}", self);
        } else {
            tracing::debug!("Client error: {}", self);
        }

        let status = self.status_code();
        (status, Json(json!({ "detail": self.to_string() }))).into_response()
    }
}

fn mebibytes(bytes: &u64) -> f64 {
    *bytes as f64 / 1024.0 / 1024.0
}

/// Pipeline failures reported inside the `success: false` envelope.
///
/// The `Display` output becomes the envelope's `error` field verbatim.
#[derive(Debug, Error)]
pub enum ProcessingError {
    /// The upload could not be written to a temporary file.
    #[error("Failed to stage upload: {source}")]
    StagingFailed {
        #[source]
        source: std::io::Error,
    },

    /// The converter returned nothing, or an empty string.
    #[error("Conversion failed: empty result")]
    ConversionFailed,

    /// The converter reported a fault. `message` is passed through untouched.
    #[error("{message}")]
    ConversionError { message: String },

    /// The converter did not finish within the configured timeout.
    #[error("Conversion timed out after {secs}s")]
    ConversionTimeout { secs: u64 },

    /// Unexpected internal error (join failure, panic inside the pipeline).
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Invalid server configuration, detected when the config is built.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}
