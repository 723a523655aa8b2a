use std::collections::BTreeMap;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::Instant;

use crate::error::{Error, Result};
use crate::latency::{
    HISTOGRAM_MIN_CEILING, LatencyRecorder, LatencyTracking, histogram_ceiling,
};
use crate::resources::{ResourceStats, ResourceUsage};
use crate::sample::{ErrorKind, ResultSample};

/// Finalized per-scenario statistics. Computed on demand, never mutated.
#[derive(Debug, Clone, PartialEq)]
pub struct ScenarioSnapshot {
    pub duration: Duration,
    pub total_events: u64,
    pub successful_events: u64,
    pub failed_events: u64,
    pub requests_total: u64,
    pub failed_requests_total: u64,
    /// `successful_events / total_events` in 0.0..=1.0 (0 when nothing was recorded).
    pub success_rate: f64,
    pub latency_mean: Duration,
    pub latency_min: Duration,
    pub latency_max: Duration,
    pub latency_p50: Duration,
    pub latency_p95: Duration,
    pub latency_p99: Duration,
    /// Successful events per second.
    pub throughput: f64,
    /// Failed events keyed by error kind.
    pub errors: BTreeMap<ErrorKind, u64>,
    /// Events keyed by the HTTP status they received (successes and HTTP-level failures).
    pub status_codes: BTreeMap<u16, u64>,
    pub bytes_sent_total: u64,
    pub bytes_received_total: u64,
    pub latency_tracking: LatencyTracking,
    /// CPU and memory of the load-generating process (empty when not sampled).
    pub resources: ResourceUsage,
}

impl ScenarioSnapshot {
    pub fn error_rate(&self) -> f64 {
        if self.total_events == 0 {
            0.0
        } else {
            1.0 - self.success_rate
        }
    }
}

#[derive(Debug)]
struct MetricsState {
    started: Option<Instant>,
    stopped: Option<Instant>,
    last_observed: Option<Instant>,

    successful_events: u64,
    failed_events: u64,
    requests_total: u64,
    failed_requests_total: u64,
    bytes_sent_total: u64,
    bytes_received_total: u64,

    latencies: LatencyRecorder,
    latency_sum: Duration,
    latency_min: Option<Duration>,
    latency_max: Duration,

    errors: BTreeMap<ErrorKind, u64>,
    status_codes: BTreeMap<u16, u64>,

    resources: ResourceStats,
}

impl MetricsState {
    fn new(latencies: LatencyRecorder) -> Self {
        Self {
            started: None,
            stopped: None,
            last_observed: None,
            successful_events: 0,
            failed_events: 0,
            requests_total: 0,
            failed_requests_total: 0,
            bytes_sent_total: 0,
            bytes_received_total: 0,
            latencies,
            latency_sum: Duration::ZERO,
            latency_min: None,
            latency_max: Duration::ZERO,
            errors: BTreeMap::new(),
            status_codes: BTreeMap::new(),
            resources: ResourceStats::default(),
        }
    }

    fn ingest(&mut self, sample: &ResultSample) {
        let events = sample.event_count();

        self.requests_total = self.requests_total.saturating_add(1);
        if sample.success() {
            self.successful_events = self.successful_events.saturating_add(events);
        } else {
            self.failed_events = self.failed_events.saturating_add(events);
            self.failed_requests_total = self.failed_requests_total.saturating_add(1);
        }

        if let Some(kind) = sample.error_kind() {
            *self.errors.entry(kind).or_insert(0) += events;
        }
        if let Some(status) = sample.status_code() {
            *self.status_codes.entry(status).or_insert(0) += events;
        }

        self.bytes_sent_total = self.bytes_sent_total.saturating_add(sample.bytes_sent());
        self.bytes_received_total = self
            .bytes_received_total
            .saturating_add(sample.bytes_received());

        let latency = sample.latency();
        self.latencies.record(latency);
        self.latency_sum = self.latency_sum.saturating_add(latency);
        self.latency_min = Some(self.latency_min.map_or(latency, |m| m.min(latency)));
        self.latency_max = self.latency_max.max(latency);

        let observed = sample.observed_at();
        self.last_observed = Some(self.last_observed.map_or(observed, |t| t.max(observed)));
    }

    fn snapshot(&self, started: Instant, stopped: Instant) -> ScenarioSnapshot {
        let duration = stopped.saturating_duration_since(started);
        let total_events = self.successful_events.saturating_add(self.failed_events);

        let success_rate = if total_events == 0 {
            0.0
        } else {
            self.successful_events as f64 / total_events as f64
        };

        let secs = duration.as_secs_f64();
        let throughput = if secs > 0.0 {
            self.successful_events as f64 / secs
        } else {
            0.0
        };

        let latency_mean = match u32::try_from(self.requests_total) {
            Ok(0) => Duration::ZERO,
            Ok(n) => self.latency_sum / n,
            Err(_) => self.latency_sum.div_f64(self.requests_total as f64),
        };

        let latency_min = self.latency_min.unwrap_or(Duration::ZERO);
        let latency_max = self.latency_max;

        let quantiles = self.latencies.quantiles(&[0.50, 0.95, 0.99]);
        // Histogram buckets can overshoot the exact extremes by their precision.
        let clamp = |d: Duration| d.clamp(latency_min, latency_max);

        ScenarioSnapshot {
            duration,
            total_events,
            successful_events: self.successful_events,
            failed_events: self.failed_events,
            requests_total: self.requests_total,
            failed_requests_total: self.failed_requests_total,
            success_rate,
            latency_mean,
            latency_min,
            latency_max,
            latency_p50: clamp(quantiles[0]),
            latency_p95: clamp(quantiles[1]),
            latency_p99: clamp(quantiles[2]),
            throughput,
            errors: self.errors.clone(),
            status_codes: self.status_codes.clone(),
            bytes_sent_total: self.bytes_sent_total,
            bytes_received_total: self.bytes_received_total,
            latency_tracking: self.latencies.tracking(),
            resources: self.resources.usage(),
        }
    }
}

/// Running statistics for one scenario.
///
/// `record` may be called from many tasks at once; each call holds the internal lock for its
/// full duration and never across an await point.
#[derive(Debug)]
pub struct MetricsAggregator {
    state: Mutex<MetricsState>,
}

impl Default for MetricsAggregator {
    fn default() -> Self {
        Self {
            state: Mutex::new(MetricsState::new(LatencyRecorder::Exact(Vec::new()))),
        }
    }
}

impl MetricsAggregator {
    pub fn new(tracking: LatencyTracking) -> Result<Self> {
        Self::with_ceiling(tracking, HISTOGRAM_MIN_CEILING)
    }

    /// Sizes histogram tracking so latencies up to twice `request_timeout` are not clamped.
    pub fn for_request_timeout(
        tracking: LatencyTracking,
        request_timeout: Duration,
    ) -> Result<Self> {
        Self::with_ceiling(tracking, histogram_ceiling(request_timeout))
    }

    fn with_ceiling(tracking: LatencyTracking, ceiling: Duration) -> Result<Self> {
        Ok(Self {
            state: Mutex::new(MetricsState::new(LatencyRecorder::new(tracking, ceiling)?)),
        })
    }

    pub fn start(&self) -> Result<()> {
        self.start_at(Instant::now())
    }

    pub fn start_at(&self, now: Instant) -> Result<()> {
        let mut state = self.state.lock();
        if state.started.is_some() {
            return Err(Error::InvalidState("metrics aggregator already started"));
        }
        state.started = Some(now);
        Ok(())
    }

    pub fn record(&self, sample: ResultSample) {
        let mut state = self.state.lock();
        if state.stopped.is_some() {
            tracing::warn!(
                event_count = sample.event_count(),
                "dropping sample recorded after metrics aggregator stopped"
            );
            return;
        }
        state.ingest(&sample);
    }

    /// Folds one CPU/RSS reading of the load-generating process. Ignored once stopped.
    pub fn record_resources(&self, cpu_percent: f64, memory_bytes: u64) {
        let mut state = self.state.lock();
        if state.started.is_none() || state.stopped.is_some() {
            return;
        }
        state.resources.fold(cpu_percent, memory_bytes);
    }

    pub fn stop(&self) -> Result<()> {
        self.stop_at(Instant::now())
    }

    /// `stop` is clamped to the latest `observed_at` so the snapshot window covers every sample.
    pub fn stop_at(&self, now: Instant) -> Result<()> {
        let mut state = self.state.lock();
        if state.started.is_none() {
            return Err(Error::InvalidState("metrics aggregator was never started"));
        }
        if state.stopped.is_some() {
            return Err(Error::InvalidState("metrics aggregator already stopped"));
        }

        let stop = state.last_observed.map_or(now, |t| t.max(now));
        state.stopped = Some(stop);
        Ok(())
    }

    /// Clears all recorded data and lifecycle timestamps.
    pub fn reset(&self) {
        let mut state = self.state.lock();
        let mut latencies =
            std::mem::replace(&mut state.latencies, LatencyRecorder::Exact(Vec::new()));
        latencies.clear();
        *state = MetricsState::new(latencies);
    }

    pub fn is_stopped(&self) -> bool {
        self.state.lock().stopped.is_some()
    }

    /// Derived statistics. After `stop` this is idempotent; before it, the window ends "now".
    pub fn snapshot(&self) -> Result<ScenarioSnapshot> {
        let state = self.state.lock();
        let Some(started) = state.started else {
            return Err(Error::InvalidState(
                "snapshot requested before metrics aggregator was started",
            ));
        };
        let stopped = state.stopped.unwrap_or_else(Instant::now);
        Ok(state.snapshot(started, stopped))
    }
}
