//! Request handling: directive headers and method selection.
//!
//! # Responsibilities
//! - Name the directive headers the proxy consumes
//! - Select the upstream method (request line or `X-METHOD` override)
//! - Extract the request ID assigned by the middleware stack
//!
//! # Design Decisions
//! - Only a fixed allow-list of methods is ever sent upstream
//! - Directive headers are control channels and are never forwarded

use axum::http::{HeaderMap, HeaderName, Method};

use crate::http::response::{MethodOrigin, ProxyError};

/// Overrides the method used for the upstream call.
pub const X_METHOD: HeaderName = HeaderName::from_static("x-method");

/// Per-request upstream connect timeout in milliseconds (`0` = infinite).
pub const X_CONNECT_TIMEOUT_MILLIS: HeaderName =
    HeaderName::from_static("x-connect-timeout-millis");

/// Per-request upstream read timeout in milliseconds (`0` = infinite).
pub const X_READ_TIMEOUT_MILLIS: HeaderName = HeaderName::from_static("x-read-timeout-millis");

/// Correlation header set by the middleware stack.
pub const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// Every header the proxy consumes itself.
pub const DIRECTIVE_HEADERS: [HeaderName; 3] =
    [X_METHOD, X_CONNECT_TIMEOUT_MILLIS, X_READ_TIMEOUT_MILLIS];

/// Methods that may be sent upstream.
pub const ALLOWED_METHODS: [Method; 7] = [
    Method::GET,
    Method::HEAD,
    Method::POST,
    Method::PUT,
    Method::PATCH,
    Method::DELETE,
    Method::OPTIONS,
];

/// Pick the upstream method: a non-empty `X-METHOD` header wins over the
/// request line. Either way the result must be on the allow-list.
pub fn select_method(inbound: &Method, headers: &HeaderMap) -> Result<Method, ProxyError> {
    let override_value = headers
        .get(&X_METHOD)
        .map(|v| String::from_utf8_lossy(v.as_bytes()).trim().to_string())
        .filter(|v| !v.is_empty());

    let (candidate, origin) = match override_value {
        Some(value) => (value.to_ascii_uppercase(), MethodOrigin::Header("X-METHOD")),
        None => (inbound.as_str().to_string(), MethodOrigin::RequestLine),
    };

    ALLOWED_METHODS
        .iter()
        .find(|m| m.as_str() == candidate)
        .cloned()
        .ok_or_else(|| ProxyError::UnsupportedMethod {
            method: candidate,
            origin,
        })
}

/// The request ID for log correlation, or `"unknown"` when absent.
pub fn request_id(headers: &HeaderMap) -> String {
    headers
        .get(&X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
        .to_string()
}
