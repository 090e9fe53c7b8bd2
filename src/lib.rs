//! # edgequake-doc2md
//!
//! An authenticated HTTP service that converts uploaded documents (PDF, DOCX,
//! XLSX, PPTX, HTML, …) to Markdown, a plain-text rendering, and a small set
//! of statistics.
//!
//! ## Why this crate?
//!
//! Document engines such as MarkItDown are good at turning office formats into
//! Markdown but are awkward to call from a fleet of services: they want a file
//! on disk, they fail with tracebacks, and they sometimes return nothing at
//! all. This crate puts one behind a small HTTP API with bearer-token auth,
//! upload limits, guaranteed temp-file cleanup and a single JSON envelope that
//! clients can parse the same way whether conversion worked or not.
//!
//! ## Pipeline Overview
//!
//! ```text
//! POST /convert (multipart)
//!  │
//!  ├─ 1. Auth       Bearer token, constant-time compare (401 / 403)
//!  ├─ 2. Upload     stream the `file` field, enforce size limits (400 / 413)
//!  ├─ 3. Stage      write to a scoped temp file (deleted on every path)
//!  ├─ 4. Invoke     DocumentConverter → Markdown (optional timeout)
//!  ├─ 5. Normalise  7-rule Markdown → plain text
//!  ├─ 6. Metadata   characters, words, estimated pages, detected format
//!  └─ 7. Envelope   { success, markdown, plain_text, metadata, processing_time_ms, error }
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_doc2md::{serve, MarkItDownCommand, ServerConfig};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ServerConfig::builder()
//!         .api_token("s3cret")
//!         .port(8000)
//!         .build()?;
//!     let converter = Arc::new(MarkItDownCommand::default());
//!     serve(config, converter, async {
//!         let _ = tokio::signal::ctrl_c().await;
//!     })
//!     .await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `doc2md-server` binary (clap + anyhow + tracing-subscriber) |
//!
//! Disable `cli` when embedding the router in another application:
//! ```toml
//! edgequake-doc2md = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod auth;
pub mod config;
pub mod converter;
pub mod error;
pub mod orchestrator;
pub mod output;
pub mod pipeline;
pub mod server;
pub mod staging;
pub mod upload;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{AllowedOrigins, ServerConfig, ServerConfigBuilder};
pub use converter::{ConvertOptions, ConverterFault, DocumentConverter, MarkItDownCommand};
pub use error::{ApiError, ConfigError, ProcessingError};
pub use output::{ConversionResponse, DetectedFormat, DocumentMetadata, HealthResponse};
pub use server::{build_router, serve, AppState};
pub use upload::UploadRequest;
