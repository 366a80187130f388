//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the proxy.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the streaming proxy.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ProxyConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Mount point, chunking and header filtering.
    pub proxy: RelayConfig,

    /// Default upstream timeouts.
    pub timeouts: TimeoutConfig,

    /// Upstream transport behaviour.
    pub transport: TransportConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Request translation and relay settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RelayConfig {
    /// Path prefix the proxy is mounted on. `/` mounts it as a catch-all.
    pub mount_path: String,

    /// Maximum size in bytes of a single relayed body chunk.
    pub chunk_size: usize,

    /// Request headers never forwarded upstream (case-insensitive).
    pub strip_request_headers: Vec<String>,

    /// Upstream response headers never relayed to the caller.
    pub strip_response_headers: Vec<String>,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            mount_path: "/stream".to_string(),
            chunk_size: 8 * 1024,
            strip_request_headers: vec!["cookie".to_string()],
            strip_response_headers: Vec::new(),
        }
    }
}

/// Default upstream timeouts. A value of `0` disables the timeout.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Connection establishment timeout in milliseconds.
    pub connect_millis: u64,

    /// Per-read timeout in milliseconds, reset after every successful read.
    pub read_millis: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_millis: 5_000,
            read_millis: 0,
        }
    }
}

/// Upstream transport configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TransportConfig {
    /// Follow upstream redirects instead of relaying the 3xx response.
    pub follow_redirects: bool,

    /// Honour `HTTP_PROXY`/`HTTPS_PROXY` from the environment.
    pub use_system_proxy: bool,

    /// How long idle pooled upstream connections are kept, in seconds.
    pub pool_idle_secs: u64,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            follow_redirects: false,
            use_system_proxy: false,
            pool_idle_secs: 90,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
