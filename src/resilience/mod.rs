//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Request to upstream:
//!     → timeouts.rs (default connect/read timeouts, per-request overrides)
//!     → upstream transport enforces them
//!     → on timeout: 504 before headers, truncation after
//! ```
//!
//! # Design Decisions
//! - Timeouts are configurable per request through directive headers
//! - No retries: a caller that wants one reissues the inbound request

pub mod timeouts;

pub use timeouts::{TimeoutDirectives, TimeoutOverride, TimeoutPolicy};
