//! Runs one scenario: partition, admit, dispatch, drain, snapshot.

mod plan;
mod progress;

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::Instant;

use crate::config::ScenarioConfig;
use crate::dispatch::Dispatcher;
use crate::error::{Error, Result};
use crate::metrics::{MetricsAggregator, ScenarioSnapshot};
use crate::payload::{PayloadSource, WorkUnit};
use crate::resources::ResourceMonitor;
use crate::transport::Transport;

pub use plan::WorkPlan;
pub use progress::{ProgressFn, ProgressUpdate};

use progress::ProgressTracker;

pub struct ScenarioRunner<T> {
    dispatcher: Arc<Dispatcher<T>>,
    progress: Option<ProgressFn>,
    resource_interval: Option<Duration>,
}

impl<T: Transport> ScenarioRunner<T> {
    pub fn new(dispatcher: Dispatcher<T>) -> Self {
        Self {
            dispatcher: Arc::new(dispatcher),
            progress: None,
            resource_interval: None,
        }
    }

    #[must_use]
    pub fn with_progress(mut self, progress: Option<ProgressFn>) -> Self {
        self.progress = progress;
        self
    }

    /// Samples CPU and RSS of this process every `interval` while a scenario runs.
    #[must_use]
    pub fn with_resource_interval(mut self, interval: Option<Duration>) -> Self {
        self.resource_interval = interval.filter(|every| !every.is_zero());
        self
    }

    pub fn metrics(&self) -> &Arc<MetricsAggregator> {
        self.dispatcher.metrics()
    }

    /// Drives `config` to completion and returns its snapshot.
    ///
    /// At most `concurrency_limit` dispatches are in flight at any moment: a permit is taken
    /// before each unit is produced and released when its dispatch finishes. Failed requests
    /// only show up in the snapshot. The aggregator must be fresh (or `reset`).
    pub async fn run(
        &self,
        config: &ScenarioConfig,
        payloads: &dyn PayloadSource,
    ) -> Result<ScenarioSnapshot> {
        config.validate()?;
        if config.concurrency_limit > Semaphore::MAX_PERMITS {
            return Err(Error::InvalidConcurrency);
        }

        let metrics = self.dispatcher.metrics();
        let started = Instant::now();
        metrics.start_at(started)?;

        let mode = config.mode();
        tracing::info!(
            scenario = %config.name,
            total_units = config.total_units,
            work_unit_size = config.work_unit_size,
            concurrency = config.concurrency_limit,
            %mode,
            "scenario started"
        );

        let tracker = Arc::new(ProgressTracker::new(
            &config.name,
            config.total_units,
            started,
            self.progress.clone(),
        ));
        let monitor = self
            .resource_interval
            .and_then(|every| ResourceMonitor::start(metrics.clone(), every));
        let gate = Arc::new(Semaphore::new(config.concurrency_limit));
        let mut tasks = JoinSet::new();

        for event_count in WorkPlan::new(config.total_units, config.work_unit_size) {
            let permit = gate
                .clone()
                .acquire_owned()
                .await
                .map_err(|_| Error::InvalidState("admission gate closed"))?;

            while let Some(done) = tasks.try_join_next() {
                done?;
            }

            let unit = WorkUnit::new(mode, payloads.payload(mode, event_count));
            let dispatcher = self.dispatcher.clone();
            let tracker = tracker.clone();
            tasks.spawn(async move {
                dispatcher.dispatch(unit, event_count).await;
                drop(permit);
                tracker.advance(event_count);
            });
        }

        while let Some(done) = tasks.join_next().await {
            done?;
        }
        if let Some(monitor) = monitor {
            monitor.finish();
        }

        metrics.stop()?;
        let snapshot = metrics.snapshot()?;

        tracing::info!(
            scenario = %config.name,
            processed_units = tracker.processed(),
            duration = ?snapshot.duration,
            success_rate = snapshot.success_rate,
            throughput = snapshot.throughput,
            "scenario finished"
        );

        Ok(snapshot)
    }
}
