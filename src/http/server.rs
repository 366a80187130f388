//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router mounted at the configured prefix
//! - Wire up middleware (request ID, tracing)
//! - Bind server to listener with graceful shutdown
//! - Translate each request (method, target, headers, timeouts)
//! - Relay it upstream and stream the answer back

use std::sync::Arc;
use std::time::Instant;

use axum::{
    body::Body,
    extract::State,
    http::Request,
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::config::ProxyConfig;
use crate::http::headers::HeaderFilter;
use crate::http::request::{request_id, select_method};
use crate::http::response::ProxyError;
use crate::lifecycle::shutdown;
use crate::observability::metrics;
use crate::resilience::TimeoutDirectives;
use crate::routing::{resolve_target, MountPoint};
use crate::upstream::{relay, OutboundRequest, UpstreamTransport};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub mount: Arc<MountPoint>,
    pub filter: Arc<HeaderFilter>,
    pub transport: UpstreamTransport,
    pub chunk_size: usize,
}

/// HTTP server for the streaming proxy.
pub struct HttpServer {
    router: Router,
    config: ProxyConfig,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: ProxyConfig) -> Result<Self, ProxyError> {
        let transport = UpstreamTransport::new(&config.timeouts, &config.transport)
            .map_err(ProxyError::Transport)?;

        let state = AppState {
            mount: Arc::new(MountPoint::new(&config.proxy.mount_path)),
            filter: Arc::new(HeaderFilter::new(&config.proxy)),
            transport,
            chunk_size: config.proxy.chunk_size,
        };

        let router = Self::build_router(state);
        Ok(Self { router, config })
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(state: AppState) -> Router {
        let mount = state.mount.clone();

        Router::new()
            .route(&mount.wildcard_route(), any(proxy_handler))
            .route(&mount.root_route(), any(proxy_handler))
            .with_state(state)
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                    .layer(TraceLayer::new_for_http())
                    .layer(PropagateRequestIdLayer::x_request_id()),
            )
    }

    /// The fully layered router, for in-process use.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server until the shutdown channel fires.
    pub async fn run(
        self,
        listener: TcpListener,
        shutdown_rx: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            mount = %self.config.proxy.mount_path,
            "HTTP server starting"
        );

        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown::wait(shutdown_rx))
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &ProxyConfig {
        &self.config
    }
}

/// Main proxy handler.
async fn proxy_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start_time = Instant::now();
    let request_id = request_id(request.headers());
    let method = request.method().clone();

    let response = match forward(&state, request, &request_id).await {
        Ok(response) => response,
        Err(e) => {
            record_failure(&e, &request_id);
            e.into_response()
        }
    };

    metrics::record_request(method.as_str(), response.status().as_u16(), start_time);
    response
}

/// Log a failed request and count it as rejected or as an upstream error.
fn record_failure(e: &ProxyError, request_id: &str) {
    if e.is_client_error() {
        tracing::info!(request_id = %request_id, error = %e, "Rejected request");
        metrics::record_rejected_request(e.kind());
    } else {
        tracing::error!(request_id = %request_id, error = %e, "Upstream error");
        metrics::record_upstream_error(e.kind());
    }
}

/// Translate the inbound request and relay it upstream.
async fn forward(
    state: &AppState,
    request: Request<Body>,
    request_id: &str,
) -> Result<Response, ProxyError> {
    let (parts, body) = request.into_parts();

    let method = select_method(&parts.method, &parts.headers)?;
    let path = parts.uri.path();
    let remainder = state.mount.strip(path).unwrap_or(path);
    let target = resolve_target(remainder, parts.uri.query(), &method)?;
    let timeouts = TimeoutDirectives::from_headers(&parts.headers)?;
    let headers = state.filter.outbound(&parts.headers);

    tracing::debug!(
        request_id = %request_id,
        method = %method,
        target = %target,
        timeouts = ?timeouts,
        "Proxying request"
    );

    let outbound = OutboundRequest {
        method,
        target,
        headers,
        timeouts,
    };
    relay(
        &state.transport,
        &state.filter,
        outbound,
        body,
        state.chunk_size,
        request_id,
    )
    .await
}
