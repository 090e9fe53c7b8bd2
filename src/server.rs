//! HTTP surface: router, shared state, CORS and the health endpoints.

use crate::config::{AllowedOrigins, ServerConfig};
use crate::converter::DocumentConverter;
use crate::orchestrator::convert_document;
use crate::output::HealthResponse;
use axum::extract::{DefaultBodyLimit, State};
use axum::http::{HeaderValue, Method};
use axum::routing::{get, post};
use axum::{Json, Router};
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tower_http::cors::{AllowHeaders, Any, CorsLayer};
use tower_http::trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer};
use tracing::{info, warn, Level};

/// Room left in the request body limit for multipart boundaries and headers
/// on top of the file itself.
pub const MULTIPART_OVERHEAD_BYTES: u64 = 1024 * 1024;

/// State shared by every handler.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    pub converter: Arc<dyn DocumentConverter>,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(config: ServerConfig, converter: Arc<dyn DocumentConverter>) -> Self {
        Self {
            config: Arc::new(config),
            converter,
            started_at: Instant::now(),
        }
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}

/// Build the application router.
///
/// | Method | Path      | Handler              |
/// |--------|-----------|----------------------|
/// | GET    | `/`       | health               |
/// | GET    | `/health` | health               |
/// | POST   | `/convert`| [`convert_document`] |
pub fn build_router(state: AppState) -> Router {
    let body_limit = state
        .config
        .max_upload_bytes
        .saturating_add(MULTIPART_OVERHEAD_BYTES);
    let body_limit = usize::try_from(body_limit).unwrap_or(usize::MAX);

    Router::new()
        .route("/", get(health))
        .route("/health", get(health))
        .route(
            "/convert",
            post(convert_document).layer(DefaultBodyLimit::max(body_limit)),
        )
        .layer(cors_layer(&state.config.allowed_origins))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_request(DefaultOnRequest::new().level(Level::DEBUG))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .with_state(state)
}

/// `GET /` and `GET /health`.
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse::healthy(state.uptime_seconds()))
}

/// Wildcard origins cannot be combined with credentials, so credentials are
/// only allowed when an explicit origin list is configured.
fn cors_layer(origins: &AllowedOrigins) -> CorsLayer {
    let methods = [Method::GET, Method::POST];
    match origins {
        AllowedOrigins::Any => CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(methods)
            .allow_headers(Any),
        AllowedOrigins::List(list) => {
            let values: Vec<HeaderValue> = list
                .iter()
                .filter_map(|origin| match origin.parse::<HeaderValue>() {
                    Ok(v) => Some(v),
                    Err(_) => {
                        warn!("Ignoring invalid CORS origin {:?}", origin);
                        None
                    }
                })
                .collect();
            CorsLayer::new()
                .allow_origin(values)
                .allow_methods(methods)
                .allow_headers(AllowHeaders::mirror_request())
                .allow_credentials(true)
        }
    }
}

/// Bind `config.bind_addr()` and serve until `shutdown` resolves.
///
/// In-flight requests are allowed to finish; their temp files are cleaned up
/// as their handlers complete.
pub async fn serve<F>(
    config: ServerConfig,
    converter: Arc<dyn DocumentConverter>,
    shutdown: F,
) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = config.bind_addr();
    let router = build_router(AppState::new(config, converter));

    let listener = TcpListener::bind(addr).await?;
    info!("Listening on http://{}", listener.local_addr()?);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await?;

    info!("Server stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::converter::{ConvertOptions, ConverterFault};
    use async_trait::async_trait;
    use axum_test::TestServer;
    use std::path::Path;

    struct Echo;

    #[async_trait]
    impl DocumentConverter for Echo {
        async fn convert(
            &self,
            _path: &Path,
            _options: &ConvertOptions,
        ) -> Result<Option<String>, ConverterFault> {
            Ok(Some("ok".into()))
        }
    }

    fn server(origins: AllowedOrigins) -> TestServer {
        let config = ServerConfig::builder()
            .allowed_origins(origins)
            .build()
            .unwrap();
        TestServer::new(build_router(AppState::new(config, Arc::new(Echo)))).unwrap()
    }

    #[tokio::test]
    async fn health_on_both_paths() {
        let server = server(AllowedOrigins::Any);
        for path in ["/", "/health"] {
            let resp = server.get(path).await;
            resp.assert_status_ok();
            let body: HealthResponse = resp.json();
            assert_eq!(body.status, "healthy");
            assert_eq!(body.version, env!("CARGO_PKG_VERSION"));
        }
    }

    #[tokio::test]
    async fn wildcard_cors_allows_any_origin() {
        let server = server(AllowedOrigins::Any);
        let resp = server
            .get("/health")
            .add_header("origin", "https://app.example.com")
            .await;
        assert_eq!(
            resp.header("access-control-allow-origin").to_str().unwrap(),
            "*"
        );
    }

    #[tokio::test]
    async fn listed_cors_echoes_known_origin_with_credentials() {
        let server = server(AllowedOrigins::parse("https://a.example.com,https://b.example.com"));
        let resp = server
            .get("/health")
            .add_header("origin", "https://b.example.com")
            .await;
        assert_eq!(
            resp.header("access-control-allow-origin").to_str().unwrap(),
            "https://b.example.com"
        );
        assert_eq!(
            resp.header("access-control-allow-credentials")
                .to_str()
                .unwrap(),
            "true"
        );

        let resp = server
            .get("/health")
            .add_header("origin", "https://evil.example.com")
            .await;
        assert!(resp.maybe_header("access-control-allow-origin").is_none());
    }

    #[tokio::test]
    async fn convert_rejects_get() {
        let server = server(AllowedOrigins::Any);
        server
            .get("/convert")
            .expect_failure()
            .await
            .assert_status(axum::http::StatusCode::METHOD_NOT_ALLOWED);
    }
}
