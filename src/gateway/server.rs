//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Build the subsystems from config (secret provider, rate store,
//!   limiter, upstream forwarder)
//! - Create the Axum router with the catch-all gateway handler
//! - Wire up middleware (tracing, request timeout)
//! - Bind the server to a listener and serve with graceful shutdown

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::Request;
use axum::http::StatusCode;
use axum::middleware::{self, Next};
use axum::{routing::any, Router};
use thiserror::Error;
use tokio::net::TcpListener;
use tower::limit::GlobalConcurrencyLimitLayer;
use tower_http::trace::TraceLayer;
use url::Url;

use crate::config::GatewayConfig;
use crate::gateway::forward::Forwarder;
use crate::gateway::{proxy_handler, respond, AppState, GatewayState};
use crate::rate_limit::{MemoryRateStore, RedisRateStore, SlidingWindowLimiter, StoreBackend};
use crate::secrets::{EnvSecretStore, SecretProvider};

/// Errors building the server from config.
#[derive(Debug, Error)]
pub enum InitError {
    #[error("invalid upstream base URL: {0}")]
    InvalidUpstreamUrl(#[from] url::ParseError),

    #[error("invalid redis URL: {0}")]
    InvalidRedisUrl(#[from] redis::RedisError),

    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
}

/// HTTP server for the gateway.
pub struct HttpServer {
    router: Router,
    config: GatewayConfig,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: GatewayConfig) -> Result<Self, InitError> {
        let secrets = SecretProvider::new(Box::new(EnvSecretStore));

        let store = match &config.rate_limit.redis_url {
            Some(url) => StoreBackend::Redis(RedisRateStore::new(
                redis::Client::open(url.as_str())?,
                config.rate_limit.key_prefix.clone(),
            )),
            None => {
                tracing::warn!(
                    "No redis_url configured; rate limits are tracked in-process and reset on restart"
                );
                StoreBackend::Memory(MemoryRateStore::new())
            }
        };
        let limiter = SlidingWindowLimiter::new(
            store,
            config.rate_limit.window_ms,
            config.rate_limit.max_requests,
        );

        let base_url = Url::parse(&config.upstream.base_url)?;
        let forwarder = Forwarder::new(base_url, Duration::from_secs(config.upstream.timeout_secs))?;

        let state = AppState {
            inner: Arc::new(GatewayState {
                config: config.clone(),
                secrets,
                limiter,
                forwarder,
            }),
        };

        let router = Self::build_router(&config, state);
        Ok(Self { router, config })
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(config: &GatewayConfig, state: AppState) -> Router {
        // The request timeout sits above the forwarder's own timeout so
        // the upstream bound fires first and maps to an Upstream error.
        let request_timeout = Duration::from_secs(config.upstream.timeout_secs + 5);

        let router = Router::new()
            .route("/{*path}", any(proxy_handler))
            .route("/", any(proxy_handler))
            .with_state(state);

        with_request_timeout(router, request_timeout)
            .layer(GlobalConcurrencyLimitLayer::new(
                config.listener.max_connections,
            ))
            .layer(TraceLayer::new_for_http())
    }

    /// Run the server, accepting connections on the given listener.
    pub async fn run(self, listener: TcpListener) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            upstream = %self.config.upstream.base_url,
            "HTTP server starting"
        );

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }
}

/// Cap total request duration. A request that outlasts the window,
/// for example a client trickling its body over a stalled socket,
/// gets a 408 in the JSON error envelope rather than an empty body.
fn with_request_timeout(router: Router, request_timeout: Duration) -> Router {
    router.layer(middleware::from_fn(
        move |request: Request, next: Next| async move {
            match tokio::time::timeout(request_timeout, next.run(request)).await {
                Ok(response) => response,
                Err(_) => respond::error_response(StatusCode::REQUEST_TIMEOUT, "Request timed out"),
            }
        },
    ))
}

/// Wait for shutdown signal (Ctrl+C).
async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install Ctrl+C handler");
    tracing::info!("Shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::routing::get;
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_timed_out_request_gets_json_envelope() {
        let app = with_request_timeout(
            Router::new().route(
                "/",
                get(|| async {
                    tokio::time::sleep(Duration::from_millis(200)).await;
                    "late"
                }),
            ),
            Duration::from_millis(50),
        );

        let response = app
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::REQUEST_TIMEOUT);
        assert_eq!(
            response.headers().get("content-type").unwrap(),
            "application/json"
        );
        let bytes = to_bytes(response.into_body(), 1024).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"], "Request timed out");
    }
}
