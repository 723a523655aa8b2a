use std::sync::Arc;
use std::time::Duration;

use crate::config::{DispatchSettings, ScenarioConfig};
use crate::dispatch::Dispatcher;
use crate::error::{Error, Result};
use crate::metrics::{MetricsAggregator, ScenarioSnapshot};
use crate::payload::PayloadSource;
use crate::runner::{ProgressFn, ScenarioRunner};
use crate::transport::TransportFactory;

/// A scenario plus the payload generator that feeds it.
#[derive(Clone)]
pub struct SuiteEntry {
    pub config: ScenarioConfig,
    pub payloads: Arc<dyn PayloadSource>,
}

impl SuiteEntry {
    pub fn new(config: ScenarioConfig, payloads: Arc<dyn PayloadSource>) -> Self {
        Self { config, payloads }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScenarioReport {
    pub config: ScenarioConfig,
    pub snapshot: ScenarioSnapshot,
}

/// Reports in the order the scenarios were configured.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SuiteSummary {
    reports: Vec<ScenarioReport>,
}

impl SuiteSummary {
    pub fn reports(&self) -> &[ScenarioReport] {
        &self.reports
    }

    pub fn len(&self) -> usize {
        self.reports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reports.is_empty()
    }

    pub fn total_events(&self) -> u64 {
        self.reports.iter().map(|r| r.snapshot.total_events).sum()
    }

    pub fn successful_events(&self) -> u64 {
        self.reports.iter().map(|r| r.snapshot.successful_events).sum()
    }

    /// Event-weighted success rate across every scenario.
    pub fn success_rate(&self) -> f64 {
        let total = self.total_events();
        if total == 0 {
            0.0
        } else {
            self.successful_events() as f64 / total as f64
        }
    }

    fn push(&mut self, report: ScenarioReport) {
        self.reports.push(report);
    }
}

/// Hooks fired around each scenario of a suite.
pub trait SuiteObserver: Send + Sync {
    fn on_scenario_start(&self, _index: usize, _config: &ScenarioConfig) {}

    fn on_scenario_done(&self, _index: usize, _report: &ScenarioReport) {}
}

/// Runs scenarios one after another, each against its own aggregator and connection pool.
pub struct SuiteOrchestrator<F> {
    settings: DispatchSettings,
    factory: F,
    entries: Vec<SuiteEntry>,
    progress: Option<ProgressFn>,
    observer: Option<Arc<dyn SuiteObserver>>,
    resource_interval: Option<Duration>,
    summary: SuiteSummary,
}

impl<F: TransportFactory> SuiteOrchestrator<F> {
    pub fn new(settings: DispatchSettings, factory: F, entries: Vec<SuiteEntry>) -> Self {
        Self {
            settings,
            factory,
            entries,
            progress: None,
            observer: None,
            resource_interval: None,
            summary: SuiteSummary::default(),
        }
    }

    #[must_use]
    pub fn with_progress(mut self, progress: Option<ProgressFn>) -> Self {
        self.progress = progress;
        self
    }

    #[must_use]
    pub fn with_observer(mut self, observer: Arc<dyn SuiteObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Enables per-scenario CPU and memory sampling of this process.
    #[must_use]
    pub fn with_resource_interval(mut self, interval: Option<Duration>) -> Self {
        self.resource_interval = interval;
        self
    }

    pub fn entries(&self) -> &[SuiteEntry] {
        &self.entries
    }

    pub fn settings(&self) -> &DispatchSettings {
        &self.settings
    }

    /// Runs every entry in order. The summary starts empty on each call.
    pub async fn run_all(&mut self) -> Result<&SuiteSummary> {
        self.summary = SuiteSummary::default();
        tracing::info!(scenarios = self.entries.len(), "suite started");

        for index in 0..self.entries.len() {
            let report = self.run_entry(index).await?;
            self.summary.push(report);
        }

        tracing::info!(
            scenarios = self.summary.len(),
            success_rate = self.summary.success_rate(),
            "suite finished"
        );
        Ok(&self.summary)
    }

    /// Runs the scenario at `index` and appends its report to the summary.
    pub async fn run_one(&mut self, index: usize) -> Result<ScenarioSnapshot> {
        let report = self.run_entry(index).await?;
        let snapshot = report.snapshot.clone();
        self.summary.push(report);
        Ok(snapshot)
    }

    pub fn summary(&self) -> &SuiteSummary {
        &self.summary
    }

    pub fn into_summary(self) -> SuiteSummary {
        self.summary
    }

    async fn run_entry(&self, index: usize) -> Result<ScenarioReport> {
        let Some(entry) = self.entries.get(index) else {
            return Err(Error::ScenarioIndex {
                index,
                len: self.entries.len(),
            });
        };
        let config = &entry.config;
        config.validate()?;

        if let Some(observer) = &self.observer {
            observer.on_scenario_start(index, config);
        }

        let metrics = Arc::new(MetricsAggregator::for_request_timeout(
            self.settings.latency_tracking(),
            self.settings.request_timeout(),
        )?);
        let transport = self.factory.open(config.concurrency_limit)?;
        let dispatcher = Dispatcher::new(&self.settings, config.name.as_str(), transport, metrics)?;
        let runner = ScenarioRunner::new(dispatcher)
            .with_progress(self.progress.clone())
            .with_resource_interval(self.resource_interval);

        // The runner owns the transport; dropping it here releases the pool on both paths.
        let snapshot = runner.run(config, entry.payloads.as_ref()).await;
        drop(runner);
        let report = ScenarioReport {
            config: config.clone(),
            snapshot: snapshot?,
        };

        if let Some(observer) = &self.observer {
            observer.on_scenario_done(index, &report);
        }
        Ok(report)
    }
}
