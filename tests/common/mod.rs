//! Shared utilities for integration and load testing.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::time::Duration;

use axum::{
    body::Body,
    extract::Request,
    http::HeaderValue,
    response::{IntoResponse, Response},
    Router,
};
use path_proxy::{HttpServer, ProxyConfig, Shutdown};
use tokio::net::TcpListener;

/// Request headers the echo upstream does not mirror back because they
/// describe its own connection or framing.
const NOT_ECHOED: [&str; 4] = ["content-length", "transfer-encoding", "host", "connection"];

/// Start an upstream serving `router` on an ephemeral port.
pub async fn start_upstream(router: Router) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, router).await;
    });
    addr
}

/// Upstream that answers every request with the body it received, every
/// request header it received, and what it saw of the request line.
pub fn echo_router() -> Router {
    Router::new().fallback(echo)
}

async fn echo(request: Request) -> Response {
    let (parts, body) = request.into_parts();
    let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();

    let mut response = Body::from(bytes).into_response();
    let headers = response.headers_mut();
    for (name, value) in parts.headers.iter() {
        if !NOT_ECHOED.contains(&name.as_str()) {
            headers.append(name.clone(), value.clone());
        }
    }
    headers.insert(
        "x-echo-method",
        HeaderValue::from_str(parts.method.as_str()).unwrap(),
    );
    headers.insert(
        "x-echo-uri",
        HeaderValue::from_str(&parts.uri.to_string()).unwrap(),
    );
    if let Some(host) = parts.headers.get("host") {
        headers.insert("x-echo-host", host.clone());
    }
    response
}

/// Upstream that waits `delay` before answering `body`.
pub fn stalling_router(delay: Duration, body: &'static str) -> Router {
    Router::new().fallback(move || async move {
        tokio::time::sleep(delay).await;
        body
    })
}

/// A running proxy; shut down when dropped.
pub struct TestProxy {
    pub addr: SocketAddr,
    shutdown: Shutdown,
}

impl TestProxy {
    /// URL on the proxy for `upstream_path`, e.g. `http:/127.0.0.1:1234/foo`.
    pub fn url(&self, upstream_path: &str) -> String {
        format!("http://{}/stream/{}", self.addr, upstream_path)
    }
}

impl Drop for TestProxy {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

/// Start a proxy with `config` on an ephemeral port.
pub async fn start_proxy(config: ProxyConfig) -> TestProxy {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let server = HttpServer::new(config).unwrap();
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    TestProxy { addr, shutdown }
}

/// Client that never goes through an environment proxy.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder().no_proxy().build().unwrap()
}
