//! Response handling and error mapping.
//!
//! # Responsibilities
//! - Classify failures into client errors, gateway timeouts and bad gateways
//! - Render a proxy-generated error response
//!
//! # Design Decisions
//! - Failures before any upstream bytes are relayed become a clean error
//!   response; failures after that can only truncate the body
//! - Backend timeouts result in 504 Gateway Timeout
//! - Everything else on the upstream leg results in 502 Bad Gateway

use std::error::Error as StdError;
use std::fmt;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Where a rejected method came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MethodOrigin {
    /// The named directive header.
    Header(&'static str),
    /// The inbound request line.
    RequestLine,
}

impl fmt::Display for MethodOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MethodOrigin::Header(name) => write!(f, "header {}", name),
            MethodOrigin::RequestLine => write!(f, "the request line"),
        }
    }
}

/// Every way a proxied request can fail.
#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("unsupported method '{method}' supplied by {origin}")]
    UnsupportedMethod { method: String, origin: MethodOrigin },

    #[error("invalid value '{value}' for header {header}: expected a whole number of milliseconds")]
    InvalidTimeout { header: &'static str, value: String },

    #[error("invalid upstream target '{target}': {reason}")]
    InvalidTarget { target: String, reason: String },

    #[error("upstream timed out: {0}")]
    UpstreamTimeout(String),

    #[error("upstream request failed: {0}")]
    UpstreamUnavailable(String),

    #[error("failed to build upstream transport: {0}")]
    Transport(#[source] reqwest::Error),
}

impl ProxyError {
    /// Classify an error returned while sending the upstream request.
    pub fn from_upstream(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ProxyError::UpstreamTimeout(describe(&err))
        } else {
            ProxyError::UpstreamUnavailable(describe(&err))
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ProxyError::UnsupportedMethod { .. }
            | ProxyError::InvalidTimeout { .. }
            | ProxyError::InvalidTarget { .. } => StatusCode::BAD_REQUEST,
            ProxyError::UpstreamTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
            ProxyError::UpstreamUnavailable(_) => StatusCode::BAD_GATEWAY,
            ProxyError::Transport(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Short label used for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            ProxyError::UnsupportedMethod { .. } => "unsupported_method",
            ProxyError::InvalidTimeout { .. } => "invalid_timeout",
            ProxyError::InvalidTarget { .. } => "invalid_target",
            ProxyError::UpstreamTimeout(_) => "upstream_timeout",
            ProxyError::UpstreamUnavailable(_) => "upstream_unavailable",
            ProxyError::Transport(_) => "transport",
        }
    }

    pub fn is_client_error(&self) -> bool {
        self.status().is_client_error()
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        (self.status(), self.to_string()).into_response()
    }
}

/// Flatten an error and its sources into one line, e.g.
/// `error sending request: client error (Connect): Connection refused`.
pub fn describe(err: &dyn StdError) -> String {
    let mut description = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !description.contains(&text) {
            description.push_str(": ");
            description.push_str(&text);
        }
        source = cause.source();
    }
    description
}
