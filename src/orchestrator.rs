//! Request orchestration for `POST /convert`.
//!
//! ```text
//! Received ─▶ Authenticated ─▶ Validated ─▶ Staged ─▶ Converted ─▶ Normalized ─▶ Responded
//!     │              │              │           │           │
//!     └── 401/403 ───┴── 400/413 ───┘           └───────────┴──▶ ErrorCaptured (200, success:false)
//! ```
//!
//! Authentication and upload validation reject the request with a specific
//! status before anything touches the disk. Once a file is staged, every
//! failure (including a panic inside the converter) is turned into the
//! uniform `success: false` envelope. The staged file is owned by
//! [`run_pipeline`] and is always deleted before the envelope is built.

use crate::auth::authenticate;
use crate::converter::ConvertOptions;
use crate::error::{ApiError, ProcessingError};
use crate::output::{ConversionResponse, DocumentMetadata};
use crate::pipeline::{invoke, metadata, normalize};
use crate::server::AppState;
use crate::staging;
use crate::upload::{self, UploadRequest, KEEP_DATA_URIS_FIELD};
use axum::extract::multipart::MultipartRejection;
use axum::extract::rejection::QueryRejection;
use axum::extract::{Multipart, Query, State};
use axum::http::header::AUTHORIZATION;
use axum::http::HeaderMap;
use axum::Json;
use futures::FutureExt;
use serde::Deserialize;
use std::any::Any;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::time::Instant;
use tracing::{debug, error, info};

/// States a `/convert` request moves through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Received,
    Authenticated,
    Validated,
    Staged,
    Converted,
    Normalized,
    Responded,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Stage::Received => "received",
            Stage::Authenticated => "authenticated",
            Stage::Validated => "validated",
            Stage::Staged => "staged",
            Stage::Converted => "converted",
            Stage::Normalized => "normalized",
            Stage::Responded => "responded",
        };
        f.write_str(s)
    }
}

/// Query string accepted by `/convert`.
#[derive(Debug, Default, Deserialize)]
pub struct ConvertParams {
    pub keep_data_uris: Option<String>,
}

/// `POST /convert` handler.
///
/// The query and multipart extractors are taken as `Result`s so that a
/// request without credentials is answered with 401 even when its body or
/// query string is also malformed.
pub async fn convert_document(
    State(state): State<AppState>,
    headers: HeaderMap,
    query: Result<Query<ConvertParams>, QueryRejection>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<ConversionResponse>, ApiError> {
    let received = Instant::now();
    debug!(stage = %Stage::Received, "Convert request");

    let header = headers
        .get(AUTHORIZATION)
        .map(|v| v.to_str().map_err(|_| ApiError::AuthMalformed))
        .transpose()?;
    authenticate(header, &state.config.api_token)?;
    debug!(stage = %Stage::Authenticated, "Token accepted");

    let keep_data_uris = match query {
        Ok(Query(params)) => match params.keep_data_uris.as_deref() {
            Some(v) => upload::parse_flag(KEEP_DATA_URIS_FIELD, v)?,
            None => false,
        },
        Err(e) => {
            return Err(ApiError::InvalidParameter {
                name: KEEP_DATA_URIS_FIELD,
                value: e.body_text(),
            })
        }
    };
    let multipart = multipart.map_err(|e| ApiError::InvalidMultipart {
        detail: e.body_text(),
    })?;
    let upload =
        upload::read_upload(multipart, state.config.max_upload_bytes, keep_data_uris).await?;
    debug!(stage = %Stage::Validated, size = upload.size(), "Upload accepted");

    Ok(Json(process(&state, &upload, received).await))
}

/// Run the pipeline for an accepted upload and build the envelope.
///
/// Never fails: every error, and any panic raised by the converter, becomes a
/// `success: false` response. `received` is when the request arrived;
/// `processing_time_ms` is measured from it.
pub async fn process(state: &AppState, upload: &UploadRequest, received: Instant) -> ConversionResponse {
    let outcome = AssertUnwindSafe(run_pipeline(state, upload))
        .catch_unwind()
        .await;
    let elapsed_ms = received.elapsed().as_millis() as u64;

    match outcome {
        Ok(Ok(done)) => {
            info!("Converted {} in {}ms", display_name(upload), elapsed_ms);
            debug!(stage = %Stage::Responded, "Sending success envelope");
            ConversionResponse::success(done.markdown, done.plain_text, done.metadata, elapsed_ms)
        }
        Ok(Err(failed)) => {
            error!(
                stage = %failed.stage,
                elapsed_ms,
                "Conversion failed: {}",
                failed.error
            );
            ConversionResponse::failure(failed.error.to_string(), elapsed_ms)
        }
        Err(panic) => {
            let e = ProcessingError::Internal(panic_message(panic.as_ref()));
            error!(elapsed_ms, "Conversion failed: {}", e);
            ConversionResponse::failure(e.to_string(), elapsed_ms)
        }
    }
}

/// Output of a successful pipeline run.
struct Converted {
    markdown: String,
    plain_text: String,
    metadata: DocumentMetadata,
}

/// A pipeline error tagged with the stage that could not be reached.
struct Failed {
    stage: Stage,
    error: ProcessingError,
}

fn failed_at(stage: Stage) -> impl FnOnce(ProcessingError) -> Failed {
    move |error| Failed { stage, error }
}

async fn run_pipeline(state: &AppState, upload: &UploadRequest) -> Result<Converted, Failed> {
    // ── Stage: write the upload to a scoped temp file ────────────────────
    let suffix = staging::suffix_for(upload.file_name.as_deref());
    let staged = staging::stage(upload.payload.clone(), suffix, state.config.temp_dir.clone())
        .await
        .map_err(failed_at(Stage::Staged))?;
    info!(
        "Converting file: {} ({} bytes) at {}",
        display_name(upload),
        upload.size(),
        staged.path().display()
    );

    // ── Convert ──────────────────────────────────────────────────────────
    let options = ConvertOptions {
        keep_data_uris: upload.keep_data_uris,
    };
    let markdown = invoke::invoke(
        state.converter.as_ref(),
        staged.path(),
        &options,
        state.config.conversion_timeout,
    )
    .await
    .map_err(failed_at(Stage::Converted))?;
    drop(staged);
    debug!(stage = %Stage::Converted, chars = markdown.len(), "Converter returned");

    // ── Normalise + derive metadata ──────────────────────────────────────
    let plain_text = normalize::to_plain_text(&markdown);
    let metadata = metadata::derive(&markdown, &plain_text, upload);
    debug!(stage = %Stage::Normalized, "Plain text and metadata ready");

    Ok(Converted {
        markdown,
        plain_text,
        metadata,
    })
}

fn display_name(upload: &UploadRequest) -> &str {
    upload.file_name.as_deref().unwrap_or("<unnamed>")
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("converter panicked: {s}")
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("converter panicked: {s}")
    } else {
        "converter panicked".to_string()
    }
}
