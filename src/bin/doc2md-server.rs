//! Server binary for edgequake-doc2md.
//!
//! A thin shim over the library crate that maps CLI flags and environment
//! variables to `ServerConfig` and runs the HTTP server until SIGINT/SIGTERM.

use anyhow::{Context, Result};
use clap::Parser;
use edgequake_doc2md::{serve, AllowedOrigins, MarkItDownCommand, ServerConfig};
use std::io;
use std::net::IpAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const AFTER_HELP: &str = r#"ENDPOINTS:
  GET  /          Health check
  GET  /health    Health check
  POST /convert   Multipart upload (field "file"), Authorization: Bearer <API_TOKEN>
                  Optional: keep_data_uris=true (query or form field)

EXAMPLE:
  API_TOKEN=s3cret doc2md-server --port 8000
  curl -H "Authorization: Bearer s3cret" -F file=@report.pdf http://localhost:8000/convert

CONVERTER:
  The `markitdown` executable must be on PATH (pip install 'markitdown[all]'),
  or point --converter at another command with the same calling convention:
  <converter> <file> [--keep-data-uris], Markdown on stdout.
"#;

/// Convert uploaded documents to Markdown over HTTP.
#[derive(Parser, Debug)]
#[command(
    name = "doc2md-server",
    version,
    about = "Convert uploaded documents to Markdown over HTTP",
    long_about = "Authenticated HTTP service that converts uploaded documents (PDF, DOCX, XLSX, \
PPTX, HTML, …) to Markdown, plain text and metadata using the MarkItDown engine.",
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Bearer token clients must present.
    #[arg(long, env = "API_TOKEN", default_value = edgequake_doc2md::config::DEFAULT_API_TOKEN,
          hide_env_values = true, hide_default_value = true)]
    api_token: String,

    /// Maximum upload size in bytes.
    #[arg(long, env = "MAX_FILE_SIZE",
          default_value_t = edgequake_doc2md::config::DEFAULT_MAX_UPLOAD_BYTES)]
    max_file_size: u64,

    /// Comma-separated CORS origins, or `*` for any.
    #[arg(long, env = "ALLOWED_ORIGINS", default_value = "*")]
    allowed_origins: String,

    /// Address to bind.
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    host: IpAddr,

    /// Port to listen on.
    #[arg(short, long, env = "PORT", default_value_t = edgequake_doc2md::config::DEFAULT_PORT)]
    port: u16,

    /// Converter executable.
    #[arg(long, env = "DOC2MD_CONVERTER", default_value = "markitdown")]
    converter: PathBuf,

    /// Per-conversion timeout in seconds (0 = no timeout).
    #[arg(long, env = "DOC2MD_CONVERSION_TIMEOUT", default_value_t = 0)]
    conversion_timeout: u64,

    /// Directory for staged uploads (defaults to the system temp dir).
    #[arg(long, env = "DOC2MD_TEMP_DIR")]
    temp_dir: Option<PathBuf>,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "DOC2MD_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "DOC2MD_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let config = build_config(&cli)?;

    info!("Starting doc2md server on port {}", config.port);
    info!("Max file size: {:.1}MB", config.max_upload_mb());
    info!("CORS origins: {}", config.allowed_origins);
    info!("Converter: {}", cli.converter.display());
    if config.uses_default_token() {
        warn!("API_TOKEN is the built-in default; set API_TOKEN before exposing this server");
    }

    let converter = Arc::new(MarkItDownCommand::new(cli.converter.clone()));
    serve(config, converter, shutdown_signal())
        .await
        .context("Server error")?;

    Ok(())
}

/// Map CLI args to `ServerConfig`.
fn build_config(cli: &Cli) -> Result<ServerConfig> {
    let mut builder = ServerConfig::builder()
        .api_token(cli.api_token.clone())
        .max_upload_bytes(cli.max_file_size)
        .allowed_origins(AllowedOrigins::parse(&cli.allowed_origins))
        .host(cli.host)
        .port(cli.port)
        .conversion_timeout_secs(cli.conversion_timeout);

    if let Some(ref dir) = cli.temp_dir {
        builder = builder.temp_dir(dir.clone());
    }

    builder.build().context("Invalid configuration")
}

/// Resolves on Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, draining in-flight requests");
}
