use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::io::Write as _;
use std::sync::{Arc, Mutex};

use surge_core::{
    DispatchSettings, ProgressFn, ProgressUpdate, ScenarioConfig, ScenarioReport, SuiteObserver,
    SuiteSummary,
};

use super::OutputFormatter;

/// Last whole percent emitted per scenario name. A scenario's entry is cleared when it starts,
/// so repeated names in one suite each get their own progress lines.
#[derive(Debug, Default)]
pub(crate) struct ProgressThrottle {
    emitted: Mutex<HashMap<String, u64>>,
}

impl ProgressThrottle {
    pub(crate) fn should_emit(&self, u: &ProgressUpdate) -> bool {
        let percent = (u.fraction() * 100.0).floor() as u64;
        let mut inner = self
            .emitted
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let last = inner.get(&u.scenario).copied();
        let emit = u.is_complete() || last.is_none_or(|last| percent > last);
        if emit {
            inner.insert(u.scenario.clone(), percent);
        }
        emit
    }

    pub(crate) fn reset(&self, scenario: &str) {
        self.emitted
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .remove(scenario);
    }
}

pub(crate) struct JsonOutput {
    throttle: Arc<ProgressThrottle>,
}

impl JsonOutput {
    pub(crate) fn new() -> Self {
        Self {
            throttle: Arc::new(ProgressThrottle::default()),
        }
    }
}

impl OutputFormatter for JsonOutput {
    fn print_header(&self, _settings: &DispatchSettings, _scenarios: &[ScenarioConfig]) {}

    fn progress(&self) -> Option<ProgressFn> {
        let throttle = self.throttle.clone();
        Some(Arc::new(move |u: ProgressUpdate| {
            if throttle.should_emit(&u) {
                emit_json_line(&build_progress_line(&u));
            }
        }))
    }

    fn observer(&self) -> Arc<dyn SuiteObserver> {
        Arc::new(JsonObserver {
            throttle: self.throttle.clone(),
        })
    }

    fn print_summary(&self, summary: &SuiteSummary) -> anyhow::Result<()> {
        emit_json_line(&build_summary_line(summary));
        Ok(())
    }
}

struct JsonObserver {
    throttle: Arc<ProgressThrottle>,
}

impl SuiteObserver for JsonObserver {
    fn on_scenario_start(&self, _index: usize, config: &ScenarioConfig) {
        self.throttle.reset(&config.name);
    }

    fn on_scenario_done(&self, index: usize, report: &ScenarioReport) {
        emit_json_line(&JsonScenarioLine {
            kind: "scenario",
            index,
            scenario: build_scenario(report),
        });
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct JsonProgressLine {
    pub kind: &'static str,
    pub scenario: String,
    pub processed_events: u64,
    pub total_events: u64,
    pub percent: f64,
    pub elapsed_secs: f64,
}

fn build_progress_line(u: &ProgressUpdate) -> JsonProgressLine {
    JsonProgressLine {
        kind: "progress",
        scenario: u.scenario.clone(),
        processed_events: u.processed_units,
        total_events: u.total_units,
        percent: u.fraction() * 100.0,
        elapsed_secs: u.elapsed.as_secs_f64(),
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct JsonScenarioLine {
    pub kind: &'static str,
    pub index: usize,
    #[serde(flatten)]
    pub scenario: JsonScenarioSummary,
}

#[derive(Debug, Serialize)]
pub(crate) struct JsonScenarioSummary {
    pub scenario: String,
    pub batch_size: u64,
    pub concurrency: usize,

    pub duration_secs: f64,
    pub total_events: u64,
    pub successful_events: u64,
    pub failed_events: u64,
    pub requests_total: u64,
    pub failed_requests_total: u64,
    pub success_rate: f64,
    pub throughput: f64,
    pub bytes_sent_total: u64,
    pub bytes_received_total: u64,

    pub latency: JsonLatencySummary,
    pub resources: JsonResourceSummary,
    pub errors: BTreeMap<String, u64>,
    pub status_codes: BTreeMap<String, u64>,
}

/// Milliseconds.
#[derive(Debug, Serialize)]
pub(crate) struct JsonLatencySummary {
    pub tracking: String,
    pub mean: f64,
    pub min: f64,
    pub max: f64,
    pub p50: f64,
    pub p95: f64,
    pub p99: f64,
}

/// CPU in percent of one core, memory in bytes.
#[derive(Debug, Serialize)]
pub(crate) struct JsonResourceSummary {
    pub samples: u64,
    pub cpu_avg_percent: f64,
    pub cpu_peak_percent: f64,
    pub memory_avg_bytes: u64,
    pub memory_peak_bytes: u64,
}

fn ms(d: std::time::Duration) -> f64 {
    d.as_secs_f64() * 1e3
}

fn build_scenario(report: &ScenarioReport) -> JsonScenarioSummary {
    let s = &report.snapshot;
    JsonScenarioSummary {
        scenario: report.config.name.clone(),
        batch_size: report.config.work_unit_size,
        concurrency: report.config.concurrency_limit,
        duration_secs: s.duration.as_secs_f64(),
        total_events: s.total_events,
        successful_events: s.successful_events,
        failed_events: s.failed_events,
        requests_total: s.requests_total,
        failed_requests_total: s.failed_requests_total,
        success_rate: s.success_rate,
        throughput: s.throughput,
        bytes_sent_total: s.bytes_sent_total,
        bytes_received_total: s.bytes_received_total,
        latency: JsonLatencySummary {
            tracking: s.latency_tracking.to_string(),
            mean: ms(s.latency_mean),
            min: ms(s.latency_min),
            max: ms(s.latency_max),
            p50: ms(s.latency_p50),
            p95: ms(s.latency_p95),
            p99: ms(s.latency_p99),
        },
        resources: JsonResourceSummary {
            samples: s.resources.samples,
            cpu_avg_percent: s.resources.cpu_avg_percent,
            cpu_peak_percent: s.resources.cpu_peak_percent,
            memory_avg_bytes: s.resources.memory_avg_bytes,
            memory_peak_bytes: s.resources.memory_peak_bytes,
        },
        errors: s.errors.iter().map(|(k, v)| (k.to_string(), *v)).collect(),
        status_codes: s
            .status_codes
            .iter()
            .map(|(k, v)| (k.to_string(), *v))
            .collect(),
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct JsonSummaryLine {
    pub kind: &'static str,
    pub scenarios: Vec<JsonScenarioSummary>,
    pub totals: JsonTotals,
}

#[derive(Debug, Serialize, Default)]
pub(crate) struct JsonTotals {
    pub total_events: u64,
    pub successful_events: u64,
    pub failed_events: u64,
    pub requests_total: u64,
    pub failed_requests_total: u64,
    pub success_rate: f64,
}

fn build_summary_line(summary: &SuiteSummary) -> JsonSummaryLine {
    let mut totals = JsonTotals::default();
    let scenarios = summary
        .reports()
        .iter()
        .map(|r| {
            let s = &r.snapshot;
            totals.total_events = totals.total_events.saturating_add(s.total_events);
            totals.successful_events = totals
                .successful_events
                .saturating_add(s.successful_events);
            totals.failed_events = totals.failed_events.saturating_add(s.failed_events);
            totals.requests_total = totals.requests_total.saturating_add(s.requests_total);
            totals.failed_requests_total = totals
                .failed_requests_total
                .saturating_add(s.failed_requests_total);
            build_scenario(r)
        })
        .collect::<Vec<_>>();
    totals.success_rate = summary.success_rate();

    JsonSummaryLine {
        kind: "summary",
        scenarios,
        totals,
    }
}

fn emit_json_line<T: Serialize>(line: &T) {
    let mut out = std::io::stdout().lock();
    if serde_json::to_writer(&mut out, line).is_ok() {
        let _ = writeln!(out);
    }
}
