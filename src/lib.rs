//! Path-based HTTP streaming reverse proxy.
//!
//! `GET /stream/https:/example.com/foo?x=1` is forwarded as
//! `GET https://example.com/foo?x=1`; the upstream status, headers and body
//! are streamed back to the caller as they arrive.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod resilience;
pub mod routing;
pub mod upstream;

pub use config::schema::ProxyConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
