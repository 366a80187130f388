//! Timeout enforcement.
//!
//! # Responsibilities
//! - Parse the `X-CONNECT-TIMEOUT-MILLIS` / `X-READ-TIMEOUT-MILLIS` directives
//! - Combine them with the configured defaults into an effective policy
//!
//! # Design Decisions
//! - `0` means infinite, both in config and in directive headers
//! - An absent directive inherits the configured default
//! - Timed-out requests return 504 Gateway Timeout

use std::time::Duration;

use axum::http::{HeaderMap, HeaderName};

use crate::config::TimeoutConfig;
use crate::http::request::{X_CONNECT_TIMEOUT_MILLIS, X_READ_TIMEOUT_MILLIS};
use crate::http::response::ProxyError;

/// A single timeout setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeoutOverride {
    /// No deadline at all.
    Infinite,
    /// Fail once this much time has passed.
    Finite(Duration),
}

impl TimeoutOverride {
    pub fn from_millis(millis: u64) -> Self {
        if millis == 0 {
            TimeoutOverride::Infinite
        } else {
            TimeoutOverride::Finite(Duration::from_millis(millis))
        }
    }

    /// The deadline to hand to the transport, `None` for infinite.
    pub fn as_duration(self) -> Option<Duration> {
        match self {
            TimeoutOverride::Infinite => None,
            TimeoutOverride::Finite(d) => Some(d),
        }
    }
}

/// Timeout overrides carried by one inbound request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimeoutDirectives {
    pub connect: Option<TimeoutOverride>,
    pub read: Option<TimeoutOverride>,
}

impl TimeoutDirectives {
    /// Parse both directive headers. A present but malformed value is a
    /// client error naming the header.
    pub fn from_headers(headers: &HeaderMap) -> Result<Self, ProxyError> {
        Ok(Self {
            connect: parse_directive(
                headers,
                &X_CONNECT_TIMEOUT_MILLIS,
                "X-CONNECT-TIMEOUT-MILLIS",
            )?,
            read: parse_directive(headers, &X_READ_TIMEOUT_MILLIS, "X-READ-TIMEOUT-MILLIS")?,
        })
    }

    /// True when the request can use the shared default transport.
    pub fn is_empty(&self) -> bool {
        self.connect.is_none() && self.read.is_none()
    }
}

fn parse_directive(
    headers: &HeaderMap,
    name: &HeaderName,
    display: &'static str,
) -> Result<Option<TimeoutOverride>, ProxyError> {
    let Some(value) = headers.get(name) else {
        return Ok(None);
    };

    let text = String::from_utf8_lossy(value.as_bytes()).trim().to_string();
    text.parse::<u64>()
        .map(|millis| Some(TimeoutOverride::from_millis(millis)))
        .map_err(|_| ProxyError::InvalidTimeout {
            header: display,
            value: text,
        })
}

/// Effective connect and read timeouts for one upstream call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeoutPolicy {
    pub connect: TimeoutOverride,
    pub read: TimeoutOverride,
}

impl TimeoutPolicy {
    pub fn from_config(config: &TimeoutConfig) -> Self {
        Self {
            connect: TimeoutOverride::from_millis(config.connect_millis),
            read: TimeoutOverride::from_millis(config.read_millis),
        }
    }

    /// Apply request directives on top of this policy.
    pub fn with_directives(self, directives: TimeoutDirectives) -> Self {
        Self {
            connect: directives.connect.unwrap_or(self.connect),
            read: directives.read.unwrap_or(self.read),
        }
    }
}
