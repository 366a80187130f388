//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! Inbound request
//!     → server.rs (Axum setup, request ID, tracing)
//!     → request.rs (select method, read directive headers)
//!     → [routing resolves the upstream target]
//!     → headers.rs (filter request headers)
//!     → [upstream relay streams the call]
//!     → headers.rs (filter response headers)
//!     → response.rs (errors → 400 / 502 / 504)
//!     → Send to client
//! ```

pub mod headers;
pub mod request;
pub mod response;
pub mod server;

pub use headers::HeaderFilter;
pub use request::{X_CONNECT_TIMEOUT_MILLIS, X_METHOD, X_READ_TIMEOUT_MILLIS, X_REQUEST_ID};
pub use response::ProxyError;
pub use server::HttpServer;
