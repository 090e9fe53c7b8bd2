//! Server configuration.
//!
//! Everything the service needs at runtime lives in one immutable
//! [`ServerConfig`], built once at startup through [`ServerConfigBuilder`] and
//! then shared read-only by every request via [`crate::server::AppState`].
//! There are no process-wide globals: two servers with different configs can
//! run side by side in the same process (the integration tests rely on this).

use crate::error::ConfigError;
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

/// Token used when none is configured. The server warns at startup if it is
/// still in effect.
pub const DEFAULT_API_TOKEN: &str = "change-me-in-production";

/// Default upload limit: 50 MiB.
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 52_428_800;

/// Default listening port.
pub const DEFAULT_PORT: u16 = 8000;

/// Configuration for the conversion server.
///
/// # Example
/// ```rust
/// use edgequake_doc2md::{AllowedOrigins, ServerConfig};
///
/// let config = ServerConfig::builder()
///     .api_token("s3cret")
///     .max_upload_bytes(10 * 1024 * 1024)
///     .allowed_origins(AllowedOrigins::parse("https://app.example.com"))
///     .build()
///     .unwrap();
/// assert_eq!(config.port, 8000);
/// ```
#[derive(Clone)]
pub struct ServerConfig {
    /// Shared secret expected in `Authorization: Bearer <token>`.
    pub api_token: String,

    /// Maximum accepted upload size in bytes. Default: 52 428 800 (50 MiB).
    ///
    /// A payload of exactly this many bytes is accepted; one byte more is
    /// rejected with HTTP 413.
    pub max_upload_bytes: u64,

    /// Origins allowed to call the API from a browser. Default: any.
    pub allowed_origins: AllowedOrigins,

    /// Interface to bind. Default: 0.0.0.0.
    pub host: IpAddr,

    /// TCP port to bind. Default: 8000.
    pub port: u16,

    /// Upper bound on a single converter call. Default: None (wait for the
    /// converter however long it takes).
    pub conversion_timeout: Option<Duration>,

    /// Directory for staged uploads. Default: None (system temp dir).
    pub temp_dir: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            api_token: DEFAULT_API_TOKEN.to_string(),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            allowed_origins: AllowedOrigins::default(),
            host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: DEFAULT_PORT,
            conversion_timeout: None,
            temp_dir: None,
        }
    }
}

// The token never appears in logs.
impl fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerConfig")
            .field("api_token", &"<redacted>")
            .field("max_upload_bytes", &self.max_upload_bytes)
            .field("allowed_origins", &self.allowed_origins)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("conversion_timeout", &self.conversion_timeout)
            .field("temp_dir", &self.temp_dir)
            .finish()
    }
}

impl ServerConfig {
    /// Create a new builder for `ServerConfig`.
    pub fn builder() -> ServerConfigBuilder {
        ServerConfigBuilder {
            config: Self::default(),
        }
    }

    /// Socket address the server listens on.
    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Upload limit in MiB, for log lines.
    pub fn max_upload_mb(&self) -> f64 {
        self.max_upload_bytes as f64 / 1024.0 / 1024.0
    }

    /// True when the token is still the built-in placeholder.
    pub fn uses_default_token(&self) -> bool {
        self.api_token == DEFAULT_API_TOKEN
    }
}

/// Builder for [`ServerConfig`].
#[derive(Debug)]
pub struct ServerConfigBuilder {
    config: ServerConfig,
}

impl ServerConfigBuilder {
    pub fn api_token(mut self, token: impl Into<String>) -> Self {
        self.config.api_token = token.into();
        self
    }

    pub fn max_upload_bytes(mut self, bytes: u64) -> Self {
        self.config.max_upload_bytes = bytes;
        self
    }

    pub fn allowed_origins(mut self, origins: AllowedOrigins) -> Self {
        self.config.allowed_origins = origins;
        self
    }

    pub fn host(mut self, host: IpAddr) -> Self {
        self.config.host = host;
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    /// `0` disables the timeout.
    pub fn conversion_timeout_secs(mut self, secs: u64) -> Self {
        self.config.conversion_timeout = (secs > 0).then(|| Duration::from_secs(secs));
        self
    }

    pub fn temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.temp_dir = Some(dir.into());
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ServerConfig, ConfigError> {
        let c = &self.config;
        if c.api_token.is_empty() {
            return Err(ConfigError::Invalid("API token must not be empty".into()));
        }
        if c.max_upload_bytes == 0 {
            return Err(ConfigError::Invalid(
                "Max upload size must be ≥ 1 byte".into(),
            ));
        }
        if let AllowedOrigins::List(origins) = &c.allowed_origins {
            if origins.is_empty() {
                return Err(ConfigError::Invalid(
                    "Allowed origins list is empty; use \"*\" to allow any origin".into(),
                ));
            }
        }
        if let Some(dir) = &c.temp_dir {
            if !dir.is_dir() {
                return Err(ConfigError::Invalid(format!(
                    "Temp directory {} does not exist",
                    dir.display()
                )));
            }
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Cross-origin policy for browser clients.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum AllowedOrigins {
    /// Any origin may call the API. (default)
    #[default]
    Any,
    /// Only these exact origins, e.g. `https://app.example.com`.
    List(Vec<String>),
}

impl AllowedOrigins {
    /// Parse a comma-separated origin list. `*` anywhere in the list means any
    /// origin; blank entries are ignored.
    pub fn parse(s: &str) -> Self {
        let origins: Vec<String> = s
            .split(',')
            .map(str::trim)
            .filter(|o| !o.is_empty())
            .map(str::to_string)
            .collect();

        if origins.is_empty() || origins.iter().any(|o| o == "*") {
            AllowedOrigins::Any
        } else {
            AllowedOrigins::List(origins)
        }
    }
}

impl fmt::Display for AllowedOrigins {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AllowedOrigins::Any => f.write_str("*"),
            AllowedOrigins::List(origins) => f.write_str(&origins.join(",")),
        }
    }
}
