//! Header filtering for both legs of the relay.
//!
//! # Responsibilities
//! - Build the upstream header set from the inbound headers
//! - Build the caller's response header set from the upstream headers
//!
//! # Design Decisions
//! - `HeaderMap` keeps insertion order and repeated names, so every value is
//!   copied individually with `append`
//! - Directive headers, configured names (`cookie` by default), `Host` and
//!   hop-by-hop headers never reach the upstream; the transport recomputes
//!   `Host` and the body framing for the new authority
//! - `Content-Length` is kept: the body is relayed unmodified
//! - Response headers are relayed untouched unless explicitly configured

use axum::http::header::{CONNECTION, HOST, TE, TRAILER, TRANSFER_ENCODING, UPGRADE};
use axum::http::{HeaderMap, HeaderName};

use crate::config::RelayConfig;
use crate::http::request::DIRECTIVE_HEADERS;

const KEEP_ALIVE: HeaderName = HeaderName::from_static("keep-alive");
const PROXY_CONNECTION: HeaderName = HeaderName::from_static("proxy-connection");

/// Connection-scoped headers that only make sense on the inbound hop.
const HOP_BY_HOP: [HeaderName; 7] = [
    CONNECTION,
    KEEP_ALIVE,
    PROXY_CONNECTION,
    TE,
    TRAILER,
    TRANSFER_ENCODING,
    UPGRADE,
];

/// Immutable filter shared by every request.
#[derive(Debug, Clone)]
pub struct HeaderFilter {
    request_blocklist: Vec<HeaderName>,
    response_blocklist: Vec<HeaderName>,
}

impl HeaderFilter {
    /// Build the filter from configuration. Invalid names are skipped; they
    /// are rejected earlier by config validation.
    pub fn new(config: &RelayConfig) -> Self {
        let mut request_blocklist: Vec<HeaderName> = DIRECTIVE_HEADERS.to_vec();
        request_blocklist.push(HOST);
        request_blocklist.extend(HOP_BY_HOP);
        request_blocklist.extend(parse_names(&config.strip_request_headers));

        Self {
            request_blocklist,
            response_blocklist: parse_names(&config.strip_response_headers),
        }
    }

    /// Headers to send upstream, in inbound order with every value kept.
    pub fn outbound(&self, inbound: &HeaderMap) -> HeaderMap {
        let connection_scoped = connection_tokens(inbound);
        let mut outbound = HeaderMap::with_capacity(inbound.len());

        for (name, value) in inbound.iter() {
            if self.request_blocklist.contains(name) || connection_scoped.contains(name) {
                continue;
            }
            outbound.append(name.clone(), value.clone());
        }
        outbound
    }

    /// Headers to relay to the caller, value by value.
    pub fn response(&self, upstream: &HeaderMap) -> HeaderMap {
        let mut relayed = HeaderMap::with_capacity(upstream.len());
        for (name, value) in upstream.iter() {
            if self.response_blocklist.contains(name) {
                continue;
            }
            relayed.append(name.clone(), value.clone());
        }
        relayed
    }
}

fn parse_names(names: &[String]) -> Vec<HeaderName> {
    names
        .iter()
        .filter_map(|n| HeaderName::from_bytes(n.trim().as_bytes()).ok())
        .collect()
}

/// Extra hop-by-hop names listed in `Connection: close, x-foo`.
fn connection_tokens(headers: &HeaderMap) -> Vec<HeaderName> {
    headers
        .get_all(CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .filter_map(|token| HeaderName::from_bytes(token.trim().as_bytes()).ok())
        .collect()
}
