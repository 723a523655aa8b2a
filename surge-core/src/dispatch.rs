use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;

use crate::config::{DispatchSettings, IngestMode};
use crate::error::Result;
use crate::http::{HttpRequest, TransportErrorKind};
use crate::metrics::MetricsAggregator;
use crate::payload::WorkUnit;
use crate::sample::{Outcome, ResultSample};
use crate::transport::Transport;

/// Sends work units, times them, and turns every outcome into a recorded sample.
#[derive(Debug)]
pub struct Dispatcher<T> {
    scenario: Arc<str>,
    transport: T,
    metrics: Arc<MetricsAggregator>,
    single_uri: http::Uri,
    batch_uri: http::Uri,
    headers: http::HeaderMap,
    timeout: Duration,
}

impl<T: Transport> Dispatcher<T> {
    pub fn new(
        settings: &DispatchSettings,
        scenario: impl Into<Arc<str>>,
        transport: T,
        metrics: Arc<MetricsAggregator>,
    ) -> Result<Self> {
        Ok(Self {
            scenario: scenario.into(),
            transport,
            metrics,
            single_uri: settings.endpoint_uri(IngestMode::Single)?,
            batch_uri: settings.endpoint_uri(IngestMode::Batch)?,
            headers: settings.request_headers()?,
            timeout: settings.request_timeout(),
        })
    }

    pub fn metrics(&self) -> &Arc<MetricsAggregator> {
        &self.metrics
    }

    pub fn scenario(&self) -> &str {
        &self.scenario
    }

    /// Sends one work unit and records exactly one sample for it. Never fails: every error
    /// mode becomes a failed sample.
    pub async fn dispatch(&self, unit: WorkUnit, event_count: u64) {
        let uri = match unit.mode {
            IngestMode::Single => self.single_uri.clone(),
            IngestMode::Batch => self.batch_uri.clone(),
        };
        let request = HttpRequest::post(uri, self.headers.clone(), unit.body);

        let started = Instant::now();
        let result = tokio::time::timeout(self.timeout, self.transport.send(request)).await;
        let observed_at = Instant::now();
        let latency = observed_at.saturating_duration_since(started);

        let sample = match result {
            Ok(Ok(res)) => {
                let sample =
                    ResultSample::new(Outcome::Status(res.status), latency, event_count, observed_at)
                        .with_bytes(res.bytes_sent, res.bytes_received);
                if !sample.success() {
                    tracing::debug!(
                        scenario = %self.scenario,
                        status = res.status,
                        event_count,
                        "dispatch rejected"
                    );
                }
                sample
            }
            Ok(Err(err)) => {
                let outcome = match err.transport_error_kind() {
                    TransportErrorKind::Timeout => Outcome::Timeout,
                    kind => Outcome::Transport(kind),
                };
                tracing::debug!(
                    scenario = %self.scenario,
                    error = %err,
                    event_count,
                    "dispatch failed"
                );
                ResultSample::new(outcome, latency, event_count, observed_at)
            }
            Err(_elapsed) => {
                tracing::debug!(
                    scenario = %self.scenario,
                    timeout = ?self.timeout,
                    event_count,
                    "dispatch timed out"
                );
                ResultSample::new(Outcome::Timeout, latency, event_count, observed_at)
            }
        };

        self.metrics.record(sample);
    }
}
