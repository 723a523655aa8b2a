use std::time::Duration;

use bytes::Bytes;
use http_body_util::{BodyExt as _, Full};
use hyper::Request;
use hyper::body::Incoming;
use hyper_rustls::{HttpsConnector, HttpsConnectorBuilder};
use hyper_util::client::legacy::Client;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::rt::TokioExecutor;

use super::estimate::{estimate_request_bytes, estimate_response_head_bytes};
use super::{Error, HttpRequest, HttpResponse, Result, host_header_value};

/// Default TCP connect timeout. The OS-level one can be tens of seconds, which makes an
/// unreachable target look like a hung scenario.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(3);

/// Connection-pooling HTTP client. One instance is opened per scenario and dropped with it,
/// which releases every pooled connection.
#[derive(Debug, Clone)]
pub struct HttpClient {
    inner: Client<HttpsConnector<HttpConnector>, Full<Bytes>>,
}

impl HttpClient {
    /// `pool_size` caps the idle connections kept per host; it matches the scenario's
    /// concurrency limit so every in-flight slot can reuse a warm connection.
    #[must_use]
    pub fn new(pool_size: usize, connect_timeout: Option<Duration>) -> Self {
        let mut http_connector = HttpConnector::new();
        http_connector.enforce_http(false);
        http_connector.set_connect_timeout(connect_timeout);
        http_connector.set_nodelay(true);

        let https_connector = HttpsConnectorBuilder::new()
            .with_webpki_roots()
            .https_or_http()
            .enable_http1()
            .wrap_connector(http_connector);

        let inner = Client::builder(TokioExecutor::new())
            .pool_max_idle_per_host(pool_size.max(1))
            .build(https_connector);

        Self { inner }
    }

    pub async fn post(&self, req: HttpRequest) -> Result<HttpResponse> {
        let HttpRequest {
            uri,
            mut headers,
            body,
        } = req;

        match uri.scheme_str() {
            Some("http") | Some("https") => {}
            Some(_) => return Err(Error::UnsupportedScheme(uri.to_string())),
            None => return Err(Error::InvalidUrl(uri.to_string())),
        }

        // Make implicit headers explicit so byte accounting is deterministic.
        if !headers.contains_key(http::header::HOST)
            && let Some(host) = host_header_value(&uri)
        {
            headers.insert(http::header::HOST, http::HeaderValue::from_str(&host)?);
        }
        if !body.is_empty() && !headers.contains_key(http::header::CONTENT_LENGTH) {
            headers.insert(
                http::header::CONTENT_LENGTH,
                http::HeaderValue::from(body.len()),
            );
        }

        let bytes_sent =
            estimate_request_bytes(&http::Method::POST, &uri, &headers, body.len() as u64);

        let mut request: Request<Full<Bytes>> = Request::builder()
            .method(http::Method::POST)
            .uri(uri)
            .body(Full::new(body))?;
        *request.headers_mut() = headers;

        let res: hyper::Response<Incoming> = self.inner.request(request).await?;

        let (parts, body) = res.into_parts();
        let head_bytes = estimate_response_head_bytes(parts.version, parts.status, &parts.headers);

        // Drain fully so latency covers the whole response and the connection can be reused.
        let drained = body.collect().await?.to_bytes();

        Ok(HttpResponse {
            status: parts.status.as_u16(),
            bytes_sent,
            bytes_received: head_bytes.saturating_add(drained.len() as u64),
        })
    }
}
