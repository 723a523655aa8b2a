//! In-process mock of the ingestion API, used by integration tests and local smoke runs.

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU16, AtomicU64, Ordering};

use axum::Router;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use serde::Serialize;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::time::{Duration, sleep};

pub const PATH_INGEST: &str = "/ingest";
pub const PATH_INGEST_BATCH: &str = "/ingest/batch";
pub const API_KEY_HEADER: &str = "x-api-key";

#[derive(Debug, Clone, Default)]
pub struct TestServerOptions {
    /// When set, requests without this exact `x-api-key` get 401.
    pub api_key: Option<String>,
    /// Status returned for accepted payloads (200 when unset).
    pub status: Option<u16>,
    /// Delay before each response.
    pub delay: Duration,
}

#[derive(Debug, Clone, Default)]
pub struct TestServerStats {
    requests_total: Arc<AtomicU64>,
    single_requests: Arc<AtomicU64>,
    batch_requests: Arc<AtomicU64>,
    events_total: Arc<AtomicU64>,
    unauthorized_total: Arc<AtomicU64>,
    bad_request_total: Arc<AtomicU64>,
    in_flight: Arc<AtomicU64>,
    max_in_flight: Arc<AtomicU64>,
}

impl TestServerStats {
    fn enter(&self) -> InFlightGuard {
        self.requests_total.fetch_add(1, Ordering::Relaxed);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        InFlightGuard(self.in_flight.clone())
    }

    pub fn requests_total(&self) -> u64 {
        self.requests_total.load(Ordering::Relaxed)
    }

    pub fn single_requests(&self) -> u64 {
        self.single_requests.load(Ordering::Relaxed)
    }

    pub fn batch_requests(&self) -> u64 {
        self.batch_requests.load(Ordering::Relaxed)
    }

    /// Events carried by accepted requests (one per single request, `events.len()` per batch).
    pub fn events_total(&self) -> u64 {
        self.events_total.load(Ordering::Relaxed)
    }

    pub fn unauthorized_total(&self) -> u64 {
        self.unauthorized_total.load(Ordering::Relaxed)
    }

    pub fn bad_request_total(&self) -> u64 {
        self.bad_request_total.load(Ordering::Relaxed)
    }

    /// Highest number of requests the server was handling at the same time.
    pub fn max_in_flight(&self) -> u64 {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

struct InFlightGuard(Arc<AtomicU64>);

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Live-adjustable response behavior.
#[derive(Debug, Clone)]
pub struct Behavior {
    api_key: Option<Arc<str>>,
    status: Arc<AtomicU16>,
    delay_ms: Arc<AtomicU64>,
}

impl Behavior {
    pub fn from_options(options: &TestServerOptions) -> Self {
        Self {
            api_key: options.api_key.as_deref().map(Arc::from),
            status: Arc::new(AtomicU16::new(options.status.unwrap_or(200))),
            delay_ms: Arc::new(AtomicU64::new(
                u64::try_from(options.delay.as_millis()).unwrap_or(u64::MAX),
            )),
        }
    }

    pub fn set_status(&self, status: u16) {
        self.status.store(status, Ordering::Relaxed);
    }

    pub fn set_delay(&self, delay: Duration) {
        self.delay_ms.store(
            u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
            Ordering::Relaxed,
        );
    }

    fn status(&self) -> StatusCode {
        StatusCode::from_u16(self.status.load(Ordering::Relaxed))
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms.load(Ordering::Relaxed))
    }

    fn authorized(&self, headers: &HeaderMap) -> bool {
        let Some(expected) = &self.api_key else {
            return true;
        };
        headers
            .get(API_KEY_HEADER)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v == expected.as_ref())
    }
}

#[derive(Debug, Clone)]
struct AppState {
    stats: TestServerStats,
    behavior: Behavior,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct IngestResponse {
    accepted: u64,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: &'static str,
}

fn json<T: Serialize>(status: StatusCode, value: &T) -> (StatusCode, Bytes) {
    match serde_json::to_vec(value) {
        Ok(bytes) => (status, Bytes::from(bytes)),
        Err(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Bytes::from_static(b"encode error"),
        ),
    }
}

/// Event count for a body, or `None` when it is not an acceptable payload for `batch`.
fn count_events(body: &[u8], batch: bool) -> Option<u64> {
    let value: serde_json::Value = serde_json::from_slice(body).ok()?;
    let object = value.as_object()?;
    if !batch {
        return Some(1);
    }
    let events = object.get("events")?.as_array()?;
    if object.get("batchId").and_then(|v| v.as_str()).is_none() {
        return None;
    }
    Some(events.len() as u64)
}

async fn ingest(
    state: &AppState,
    headers: &HeaderMap,
    body: &[u8],
    batch: bool,
) -> (StatusCode, Bytes) {
    let _guard = state.stats.enter();

    let delay = state.behavior.delay();
    if !delay.is_zero() {
        sleep(delay).await;
    }

    if !state.behavior.authorized(headers) {
        state.stats.unauthorized_total.fetch_add(1, Ordering::Relaxed);
        return json(
            StatusCode::UNAUTHORIZED,
            &ErrorResponse {
                error: "invalid api key",
            },
        );
    }

    let Some(events) = count_events(body, batch) else {
        state.stats.bad_request_total.fetch_add(1, Ordering::Relaxed);
        return json(
            StatusCode::BAD_REQUEST,
            &ErrorResponse {
                error: "invalid payload",
            },
        );
    };

    if batch {
        state.stats.batch_requests.fetch_add(1, Ordering::Relaxed);
    } else {
        state.stats.single_requests.fetch_add(1, Ordering::Relaxed);
    }
    state.stats.events_total.fetch_add(events, Ordering::Relaxed);

    json(state.behavior.status(), &IngestResponse { accepted: events })
}

async fn handle_ingest(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> (StatusCode, Bytes) {
    ingest(&state, &headers, &body, false).await
}

async fn handle_ingest_batch(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> (StatusCode, Bytes) {
    ingest(&state, &headers, &body, true).await
}

pub fn router(stats: TestServerStats, behavior: Behavior) -> Router {
    Router::new()
        .route(PATH_INGEST, post(handle_ingest))
        .route(PATH_INGEST_BATCH, post(handle_ingest_batch))
        .with_state(AppState { stats, behavior })
}

pub struct TestServer {
    addr: SocketAddr,
    base_url: String,
    stats: TestServerStats,
    behavior: Behavior,
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: Option<tokio::task::JoinHandle<()>>,
}

impl TestServer {
    pub async fn start() -> std::io::Result<Self> {
        Self::start_with(TestServerOptions::default()).await
    }

    pub async fn start_with(options: TestServerOptions) -> std::io::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;

        let stats = TestServerStats::default();
        let behavior = Behavior::from_options(&options);
        let app = router(stats.clone(), behavior.clone());

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let task = tokio::spawn(async move {
            let serve = axum::serve(listener, app).with_graceful_shutdown(async move {
                let _ = shutdown_rx.await;
            });
            let _ = serve.await;
        });

        Ok(Self {
            addr,
            base_url: format!("http://{addr}"),
            stats,
            behavior,
            shutdown_tx: Some(shutdown_tx),
            task: Some(task),
        })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn stats(&self) -> &TestServerStats {
        &self.stats
    }

    pub fn behavior(&self) -> &Behavior {
        &self.behavior
    }

    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }

        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if self.shutdown_tx.is_some()
            && let Some(task) = self.task.take()
        {
            task.abort();
        }
    }
}
