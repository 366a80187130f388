//! Upstream subsystem.
//!
//! # Data Flow
//! ```text
//! OutboundRequest (method, target, filtered headers, timeout directives)
//!     → transport.rs (shared client, or a request-scoped one when the
//!                     request carries timeout directives)
//!     → relay.rs (inbound body → upstream, upstream body → caller,
//!                 in bounded chunks)
//!     → streamed axum Response
//! ```
//!
//! # Design Decisions
//! - Connection pooling, TLS and HTTP framing belong to reqwest/hyper
//! - Bodies are never collected; both legs are pull-based streams, so a slow
//!   reader applies backpressure all the way to the writer
//! - Dropping the response body (caller went away) drops the upstream stream

pub mod relay;
pub mod transport;

pub use relay::{relay, Direction, OutboundRequest, RelayStream};
pub use transport::UpstreamTransport;
