//! Request routing subsystem.
//!
//! # Data Flow
//! ```text
//! Inbound request path
//!     → mount.rs (strip the mount point, e.g. "/stream")
//!     → target.rs (repair scheme separator, apply {method} template,
//!                  decode and append the query string, validate)
//!     → absolute upstream Url
//! ```
//!
//! # Design Decisions
//! - The upstream target is encoded in the path itself; there is no route table
//! - The raw (still percent-encoded) path is used so templates survive routing
//! - Anything that does not resolve to an absolute http(s) URL is a client error

pub mod mount;
pub mod target;

pub use mount::MountPoint;
pub use target::resolve_target;
