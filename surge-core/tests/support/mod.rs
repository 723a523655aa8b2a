#![allow(dead_code)]

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use bytes::Bytes;
use parking_lot::Mutex;
use surge_core::http::{self, HttpRequest, HttpResponse};
use surge_core::{DispatchSettings, IngestMode, PayloadSource, ProgressFn, ProgressUpdate, Transport};

pub fn settings() -> surge_core::Result<DispatchSettings> {
    DispatchSettings::new("http://ingest.test:4000", "ak_test")
}

/// Answers every request with `status` after `latency`.
#[derive(Debug, Clone, Copy)]
pub struct FixedLatency {
    pub status: u16,
    pub latency: Duration,
}

impl FixedLatency {
    pub fn ok(latency: Duration) -> Self {
        Self {
            status: 200,
            latency,
        }
    }
}

impl Transport for FixedLatency {
    fn send(&self, request: HttpRequest) -> impl Future<Output = http::Result<HttpResponse>> + Send {
        let this = *self;
        let sent = request.body.len() as u64;
        async move {
            tokio::time::sleep(this.latency).await;
            Ok(HttpResponse {
                status: this.status,
                bytes_sent: sent,
                bytes_received: 0,
            })
        }
    }
}

/// Never answers.
#[derive(Debug, Clone, Copy)]
pub struct Hang;

impl Transport for Hang {
    fn send(&self, _request: HttpRequest) -> impl Future<Output = http::Result<HttpResponse>> + Send {
        std::future::pending()
    }
}

/// Panics inside the dispatch task.
#[derive(Debug, Clone, Copy)]
pub struct Explode;

async fn explode() -> http::Result<HttpResponse> {
    panic!("transport exploded")
}

impl Transport for Explode {
    fn send(&self, _request: HttpRequest) -> impl Future<Output = http::Result<HttpResponse>> + Send {
        explode()
    }
}

/// Counts concurrently running sends.
#[derive(Debug, Clone, Default)]
pub struct InFlightProbe {
    latency: Duration,
    current: Arc<AtomicUsize>,
    max: Arc<AtomicUsize>,
    total: Arc<AtomicUsize>,
}

impl InFlightProbe {
    pub fn new(latency: Duration) -> Self {
        Self {
            latency,
            ..Self::default()
        }
    }

    pub fn max(&self) -> usize {
        self.max.load(Ordering::SeqCst)
    }

    pub fn total(&self) -> usize {
        self.total.load(Ordering::SeqCst)
    }
}

impl Transport for InFlightProbe {
    fn send(&self, _request: HttpRequest) -> impl Future<Output = http::Result<HttpResponse>> + Send {
        let this = self.clone();
        async move {
            let now = this.current.fetch_add(1, Ordering::SeqCst) + 1;
            this.max.fetch_max(now, Ordering::SeqCst);
            this.total.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(this.latency).await;
            this.current.fetch_sub(1, Ordering::SeqCst);
            Ok(HttpResponse {
                status: 200,
                bytes_sent: 0,
                bytes_received: 0,
            })
        }
    }
}

/// Remembers the event count of every work unit it produced.
#[derive(Debug, Default)]
pub struct RecordingPayload {
    sizes: Mutex<Vec<u64>>,
}

impl RecordingPayload {
    pub fn sizes(&self) -> Vec<u64> {
        self.sizes.lock().clone()
    }
}

impl PayloadSource for RecordingPayload {
    fn payload(&self, _mode: IngestMode, event_count: u64) -> Bytes {
        self.sizes.lock().push(event_count);
        Bytes::from_static(b"{}")
    }
}

/// Minimal bodies the test server accepts.
#[derive(Debug, Default)]
pub struct MinimalEvents;

impl PayloadSource for MinimalEvents {
    fn payload(&self, mode: IngestMode, event_count: u64) -> Bytes {
        match mode {
            IngestMode::Single => Bytes::from_static(br#"{"event_type":"cl"}"#),
            IngestMode::Batch => {
                let events = vec![r#"{"event_type":"cl"}"#; event_count as usize].join(",");
                Bytes::from(format!(r#"{{"batchId":"test","events":[{events}]}}"#))
            }
        }
    }
}

pub fn progress_log() -> (ProgressFn, Arc<Mutex<Vec<ProgressUpdate>>>) {
    let log = Arc::new(Mutex::new(Vec::new()));
    let sink_log = log.clone();
    let sink: ProgressFn = Arc::new(move |update: ProgressUpdate| sink_log.lock().push(update));
    (sink, log)
}
