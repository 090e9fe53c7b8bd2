//! Upload Guard: read the multipart body and enforce the size limits.
//!
//! The streaming reader aborts as soon as the accumulated file bytes pass the
//! limit, so an oversized upload never lands in memory in full.
//! [`validate_size`] then applies the same rule, plus the emptiness check, to
//! the completed payload. Both produce the same [`ApiError`] kinds.

use crate::error::ApiError;
use axum::extract::multipart::{Field, Multipart};
use bytes::{Bytes, BytesMut};
use tracing::{debug, warn};

/// Multipart field carrying the document.
pub const FILE_FIELD: &str = "file";

/// Multipart field (or query parameter) carrying the data-URI flag.
pub const KEEP_DATA_URIS_FIELD: &str = "keep_data_uris";

/// A fully-read upload, owned by exactly one request.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub payload: Bytes,
    /// Filename as declared by the client, if any.
    pub file_name: Option<String>,
    /// Content-Type as declared by the client, if any.
    pub content_type: Option<String>,
    /// Forwarded to the converter.
    pub keep_data_uris: bool,
}

impl UploadRequest {
    pub fn size(&self) -> u64 {
        self.payload.len() as u64
    }
}

/// Check a payload length against the configured maximum.
///
/// Returns the validated size.
pub fn validate_size(len: u64, max_bytes: u64) -> Result<u64, ApiError> {
    if len > max_bytes {
        return Err(ApiError::PayloadTooLarge {
            limit_bytes: max_bytes,
        });
    }
    if len == 0 {
        return Err(ApiError::EmptyPayload);
    }
    Ok(len)
}

/// Parse a boolean flag the way form and query values are usually spelled.
pub fn parse_flag(name: &'static str, value: &str) -> Result<bool, ApiError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" | "t" | "y" => Ok(true),
        "false" | "0" | "no" | "off" | "f" | "n" => Ok(false),
        _ => Err(ApiError::InvalidParameter {
            name,
            value: value.to_string(),
        }),
    }
}

/// Drain `multipart` into an [`UploadRequest`].
///
/// `keep_data_uris` is the value already taken from the query string; a
/// multipart field of the same name overrides it. Unknown fields are skipped.
pub async fn read_upload(
    mut multipart: Multipart,
    max_bytes: u64,
    keep_data_uris: bool,
) -> Result<UploadRequest, ApiError> {
    let mut file: Option<(Bytes, Option<String>, Option<String>)> = None;
    let mut keep_data_uris = keep_data_uris;

    while let Some(field) = multipart.next_field().await.map_err(invalid_multipart)? {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            FILE_FIELD if file.is_none() => {
                let file_name = field.file_name().map(str::to_string);
                let content_type = field.content_type().map(str::to_string);
                let payload = read_capped(field, max_bytes).await?;
                file = Some((payload, file_name, content_type));
            }
            KEEP_DATA_URIS_FIELD => {
                let value = field.text().await.map_err(invalid_multipart)?;
                keep_data_uris = parse_flag(KEEP_DATA_URIS_FIELD, &value)?;
            }
            other => debug!("Ignoring multipart field {:?}", other),
        }
    }

    let (payload, file_name, content_type) = file.ok_or(ApiError::MissingFile)?;
    validate_size(payload.len() as u64, max_bytes)?;

    Ok(UploadRequest {
        payload,
        file_name,
        content_type,
        keep_data_uris,
    })
}

/// Read one field chunk by chunk, failing as soon as it exceeds `max_bytes`.
async fn read_capped(mut field: Field<'_>, max_bytes: u64) -> Result<Bytes, ApiError> {
    let mut buf = BytesMut::new();

    while let Some(chunk) = field.chunk().await.map_err(invalid_multipart)? {
        let total = (buf.len() + chunk.len()) as u64;
        if total > max_bytes {
            warn!(
                total_size = total,
                max_file_size = max_bytes,
                "File size limit exceeded, aborting upload"
            );
            return Err(ApiError::PayloadTooLarge {
                limit_bytes: max_bytes,
            });
        }
        buf.extend_from_slice(&chunk);
    }

    Ok(buf.freeze())
}

fn invalid_multipart(e: axum::extract::multipart::MultipartError) -> ApiError {
    ApiError::InvalidMultipart {
        detail: e.body_text(),
    }
}
