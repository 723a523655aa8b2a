use std::future::Future;
use std::time::Duration;

use crate::error::Result;
use crate::http::{self, HttpClient, HttpRequest, HttpResponse};

/// The wire seam of the dispatcher: send one request, report status and byte counts.
///
/// Implementations must not apply their own retry policy. The dispatcher owns the deadline.
pub trait Transport: Send + Sync + 'static {
    fn send(
        &self,
        request: HttpRequest,
    ) -> impl Future<Output = http::Result<HttpResponse>> + Send;
}

impl Transport for HttpClient {
    fn send(
        &self,
        request: HttpRequest,
    ) -> impl Future<Output = http::Result<HttpResponse>> + Send {
        self.post(request)
    }
}

/// Opens one transport per scenario. The returned value owns the connection pool and releases
/// it when dropped.
pub trait TransportFactory: Send + Sync {
    type Transport: Transport;

    fn open(&self, pool_size: usize) -> Result<Self::Transport>;
}

impl<F, T> TransportFactory for F
where
    F: Fn(usize) -> Result<T> + Send + Sync,
    T: Transport,
{
    type Transport = T;

    fn open(&self, pool_size: usize) -> Result<T> {
        (self)(pool_size)
    }
}

/// Production factory: a fresh hyper client per scenario.
#[derive(Debug, Clone, Copy)]
pub struct HttpTransportFactory {
    connect_timeout: Option<Duration>,
}

impl Default for HttpTransportFactory {
    fn default() -> Self {
        Self {
            connect_timeout: Some(http::DEFAULT_CONNECT_TIMEOUT),
        }
    }
}

impl HttpTransportFactory {
    pub fn new(connect_timeout: Option<Duration>) -> Self {
        Self { connect_timeout }
    }
}

impl TransportFactory for HttpTransportFactory {
    type Transport = HttpClient;

    fn open(&self, pool_size: usize) -> Result<HttpClient> {
        Ok(HttpClient::new(pool_size, self.connect_timeout))
    }
}
