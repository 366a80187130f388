//! Streaming relay between the caller and the upstream.
//!
//! # Responsibilities
//! - Hand the inbound body to the upstream request as a lazily polled stream
//! - Relay upstream status, headers and body to the caller as they arrive
//! - Re-chunk both bodies so no single chunk exceeds the configured size
//!
//! # Design Decisions
//! - Status and headers are only read once upstream has answered; the body is
//!   never assumed to be buffered
//! - A body error after the response has started can only truncate the
//!   stream; it is logged and the connection is closed by hyper
//! - Dropping a relay stream before the end (caller disconnected) is logged

use std::fmt;
use std::pin::Pin;
use std::task::{ready, Context, Poll};

use axum::body::{Body, HttpBody as _};
use axum::http::{HeaderMap, Method};
use axum::response::Response;
use bytes::Bytes;
use futures_util::Stream;
use pin_project::{pin_project, pinned_drop};
use url::Url;

use crate::http::headers::HeaderFilter;
use crate::http::response::ProxyError;
use crate::observability::metrics;
use crate::resilience::TimeoutDirectives;
use crate::upstream::transport::UpstreamTransport;

/// Which leg of the relay a stream belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Caller → upstream.
    Upload,
    /// Upstream → caller.
    Download,
}

impl Direction {
    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Upload => "upload",
            Direction::Download => "download",
        }
    }
}

/// Everything needed to issue the upstream call, minus the body.
#[derive(Debug)]
pub struct OutboundRequest {
    pub method: Method,
    pub target: Url,
    pub headers: HeaderMap,
    pub timeouts: TimeoutDirectives,
}

/// Forward a body stream chunk by chunk, splitting oversized chunks.
///
/// The inner stream is only polled once the previous chunk has been taken,
/// so at most one inner chunk is held at a time.
#[pin_project(PinnedDrop)]
pub struct RelayStream<S> {
    #[pin]
    inner: S,
    pending: Bytes,
    chunk_size: usize,
    relayed: u64,
    finished: bool,
    direction: Direction,
    request_id: String,
}

impl<S> RelayStream<S> {
    pub fn new(
        inner: S,
        chunk_size: usize,
        direction: Direction,
        request_id: impl Into<String>,
    ) -> Self {
        Self {
            inner,
            pending: Bytes::new(),
            chunk_size: chunk_size.max(1),
            relayed: 0,
            finished: false,
            direction,
            request_id: request_id.into(),
        }
    }

    /// Bytes handed downstream so far.
    pub fn relayed(&self) -> u64 {
        self.relayed
    }
}

impl<S, E> Stream for RelayStream<S>
where
    S: Stream<Item = Result<Bytes, E>>,
    E: fmt::Display,
{
    type Item = Result<Bytes, E>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let mut this = self.project();
        loop {
            if !this.pending.is_empty() {
                let take = (*this.chunk_size).min(this.pending.len());
                let chunk = this.pending.split_to(take);
                *this.relayed += chunk.len() as u64;
                return Poll::Ready(Some(Ok(chunk)));
            }
            if *this.finished {
                return Poll::Ready(None);
            }

            match ready!(this.inner.as_mut().poll_next(cx)) {
                Some(Ok(bytes)) => *this.pending = bytes,
                Some(Err(e)) => {
                    *this.finished = true;
                    tracing::warn!(
                        request_id = %this.request_id,
                        direction = this.direction.as_str(),
                        relayed_bytes = *this.relayed,
                        error = %e,
                        "Body stream failed mid-relay, truncating"
                    );
                    metrics::record_upstream_error("mid_stream");
                    metrics::record_relayed_bytes(this.direction.as_str(), *this.relayed);
                    return Poll::Ready(Some(Err(e)));
                }
                None => {
                    *this.finished = true;
                    tracing::debug!(
                        request_id = %this.request_id,
                        direction = this.direction.as_str(),
                        relayed_bytes = *this.relayed,
                        "Body relay complete"
                    );
                    metrics::record_relayed_bytes(this.direction.as_str(), *this.relayed);
                    return Poll::Ready(None);
                }
            }
        }
    }
}

#[pinned_drop]
impl<S> PinnedDrop for RelayStream<S> {
    fn drop(self: Pin<&mut Self>) {
        if !self.finished {
            tracing::debug!(
                request_id = %self.request_id,
                direction = self.direction.as_str(),
                relayed_bytes = self.relayed,
                "Body relay dropped before end of stream"
            );
            metrics::record_relayed_bytes(self.direction.as_str(), self.relayed);
        }
    }
}

/// Issue the upstream call and turn its answer into a streamed response.
///
/// Resolves as soon as upstream headers arrive; the returned body pulls from
/// the upstream connection on demand.
pub async fn relay(
    transport: &UpstreamTransport,
    filter: &HeaderFilter,
    outbound: OutboundRequest,
    body: Body,
    chunk_size: usize,
    request_id: &str,
) -> Result<Response, ProxyError> {
    let client = transport
        .client_for(outbound.timeouts)
        .map_err(ProxyError::Transport)?;

    let mut request = client
        .request(outbound.method, outbound.target)
        .headers(outbound.headers);

    // An empty inbound body stays empty so GET/HEAD are not sent chunked.
    if !body.is_end_stream() {
        let upload = RelayStream::new(
            body.into_data_stream(),
            chunk_size,
            Direction::Upload,
            request_id,
        );
        request = request.body(reqwest::Body::wrap_stream(upload));
    }

    let upstream = request.send().await.map_err(ProxyError::from_upstream)?;
    let status = upstream.status();
    let headers = filter.response(upstream.headers());

    tracing::debug!(
        request_id = %request_id,
        status = status.as_u16(),
        "Upstream responded"
    );

    let download = RelayStream::new(
        upstream.bytes_stream(),
        chunk_size,
        Direction::Download,
        request_id,
    );

    let mut response = Response::new(Body::from_stream(download));
    *response.status_mut() = status;
    *response.headers_mut() = headers;
    Ok(response)
}
