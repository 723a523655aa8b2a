//! Minimal hyper-based HTTP/1.1 client used as the production transport.

mod client;
mod error;
mod estimate;

use bytes::Bytes;

pub use client::{DEFAULT_CONNECT_TIMEOUT, HttpClient};
pub use error::{Error, Result, TransportErrorKind};
pub use estimate::estimate_request_bytes;

/// A single `POST` towards the ingestion service.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub uri: http::Uri,
    pub headers: http::HeaderMap,
    pub body: Bytes,
}

impl HttpRequest {
    pub fn post(uri: http::Uri, headers: http::HeaderMap, body: Bytes) -> Self {
        Self { uri, headers, body }
    }
}

/// What the dispatcher reads back from a response. The body itself is drained and dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    /// Estimated bytes sent on the wire (HTTP/1.1 request line + headers + body).
    pub bytes_sent: u64,
    /// Estimated bytes received on the wire (HTTP/1.1 status line + headers + body).
    pub bytes_received: u64,
}

pub(crate) fn host_header_value(uri: &http::Uri) -> Option<String> {
    let host = uri.host()?;
    let default_port = match uri.scheme_str() {
        Some("https") => 443,
        _ => 80,
    };
    match uri.port_u16() {
        Some(port) if port != default_port => Some(format!("{host}:{port}")),
        _ => Some(host.to_string()),
    }
}
