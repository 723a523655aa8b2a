//! Dispatch and measurement engine for load-testing an event-ingestion API.
//!
//! A [`SuiteOrchestrator`] runs [`ScenarioConfig`]s one at a time. Each scenario gets a
//! [`ScenarioRunner`] that partitions the events into work units, admits at most
//! `concurrency_limit` of them at once, and hands each to a [`Dispatcher`]. Every dispatch
//! ends up as exactly one [`ResultSample`] in the scenario's [`MetricsAggregator`].

mod config;
mod dispatch;
mod error;
mod latency;
mod metrics;
mod payload;
mod resources;
mod sample;
mod suite;
mod transport;

pub mod http;
pub mod runner;

pub use config::{
    API_KEY_HEADER, DEFAULT_REQUEST_TIMEOUT, DispatchSettings, IngestMode, PATH_INGEST,
    PATH_INGEST_BATCH, ScenarioConfig,
};
pub use dispatch::Dispatcher;
pub use error::{Error, Result};
pub use latency::{HISTOGRAM_MIN_CEILING, LatencyTracking, histogram_ceiling, percentile};
pub use metrics::{MetricsAggregator, ScenarioSnapshot};
pub use payload::{FixedPayload, PayloadSource, WorkUnit};
pub use resources::{ProcessSampler, ResourceUsage};
pub use runner::{ProgressFn, ProgressUpdate, ScenarioRunner, WorkPlan};
pub use sample::{ErrorKind, Outcome, ResultSample};
pub use suite::{ScenarioReport, SuiteEntry, SuiteObserver, SuiteOrchestrator, SuiteSummary};
pub use transport::{HttpTransportFactory, Transport, TransportFactory};
