use std::sync::Arc;

mod format;
mod progress;
mod summary;

use format::{format_elapsed, format_latency};
use progress::HumanProgress;
use summary::{render_scenario, render_suite};
use surge_core::{
    DispatchSettings, ProgressFn, ProgressUpdate, ScenarioConfig, ScenarioReport, SuiteObserver,
    SuiteSummary,
};

use super::OutputFormatter;

pub(crate) struct HumanReadableOutput {
    progress: Arc<HumanProgress>,
}

impl HumanReadableOutput {
    pub(crate) fn new() -> Self {
        Self {
            progress: Arc::new(HumanProgress::new()),
        }
    }
}

impl OutputFormatter for HumanReadableOutput {
    fn print_header(&self, settings: &DispatchSettings, scenarios: &[ScenarioConfig]) {
        println!("target: {}", settings.base_url());
        println!(
            "scenarios: {} timeout={} latency={}",
            scenarios.len(),
            format_latency(settings.request_timeout()),
            settings.latency_tracking()
        );
    }

    fn progress(&self) -> Option<ProgressFn> {
        let progress = self.progress.clone();
        Some(Arc::new(move |u: ProgressUpdate| {
            progress.update(
                u.processed_units,
                format!("elapsed={}", format_elapsed(u.elapsed)),
            );
        }))
    }

    fn observer(&self) -> Arc<dyn SuiteObserver> {
        Arc::new(HumanObserver {
            progress: self.progress.clone(),
        })
    }

    fn print_summary(&self, summary: &SuiteSummary) -> anyhow::Result<()> {
        self.progress.finish();
        print!("{}", render_suite(summary));
        Ok(())
    }
}

struct HumanObserver {
    progress: Arc<HumanProgress>,
}

impl SuiteObserver for HumanObserver {
    fn on_scenario_start(&self, _index: usize, config: &ScenarioConfig) {
        println!();
        println!("Running scenario: {}", config.name);
        println!(
            "events: {} | batch size: {} | concurrency: {}",
            config.total_units, config.work_unit_size, config.concurrency_limit
        );
        self.progress.start(&config.name, config.total_units);
    }

    fn on_scenario_done(&self, _index: usize, report: &ScenarioReport) {
        self.progress.finish();
        print!("{}", render_scenario(report));
        println!();
    }
}
