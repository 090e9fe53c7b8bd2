//! Response types returned by the HTTP API.
//!
//! Every `/convert` call that gets past authentication and upload validation
//! answers with the same [`ConversionResponse`] shape, success or not. Clients
//! parse one JSON object and branch on `success`.

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

/// Best-effort guess at the kind of document that was converted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DetectedFormat {
    Spreadsheet,
    Presentation,
    Html,
    Document,
}

/// Statistics derived from one conversion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    /// Filename declared by the client.
    pub file_name: Option<String>,
    /// Size of the uploaded payload.
    pub file_size_bytes: u64,
    /// Content-Type declared by the client.
    pub file_type: Option<String>,
    /// Characters in the Markdown output.
    pub characters: usize,
    /// Whitespace-separated words in the Markdown output.
    pub words: usize,
    /// Plain-text length divided by 2000, at least 1.
    pub estimated_pages: usize,
    pub detected_format: DetectedFormat,
}

/// The uniform `/convert` envelope.
///
/// Built once by [`ConversionResponse::success`] or
/// [`ConversionResponse::failure`] and serialized straight away. On failure
/// `markdown` and `plain_text` are `null` and `metadata` is `{}`.
#[derive(Debug, Clone, Serialize)]
pub struct ConversionResponse {
    pub success: bool,
    pub markdown: Option<String>,
    pub plain_text: Option<String>,
    #[serde(serialize_with = "metadata_or_empty_object")]
    pub metadata: Option<DocumentMetadata>,
    pub processing_time_ms: u64,
    pub error: Option<String>,
}

impl ConversionResponse {
    pub fn success(
        markdown: String,
        plain_text: String,
        metadata: DocumentMetadata,
        processing_time_ms: u64,
    ) -> Self {
        Self {
            success: true,
            markdown: Some(markdown),
            plain_text: Some(plain_text),
            metadata: Some(metadata),
            processing_time_ms,
            error: None,
        }
    }

    pub fn failure(error: impl Into<String>, processing_time_ms: u64) -> Self {
        Self {
            success: false,
            markdown: None,
            plain_text: None,
            metadata: None,
            processing_time_ms,
            error: Some(error.into()),
        }
    }
}

fn metadata_or_empty_object<S>(
    metadata: &Option<DocumentMetadata>,
    serializer: S,
) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match metadata {
        Some(m) => m.serialize(serializer),
        None => serializer.serialize_map(Some(0))?.end(),
    }
}

/// Body of `GET /` and `GET /health`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
}

impl HealthResponse {
    pub fn healthy(uptime_seconds: u64) -> Self {
        Self {
            status: "healthy".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            uptime_seconds,
        }
    }
}
