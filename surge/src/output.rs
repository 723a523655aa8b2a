use std::sync::Arc;

use surge_core::{DispatchSettings, ProgressFn, ScenarioConfig, SuiteObserver, SuiteSummary};

use crate::cli::OutputFormat;

mod human;
mod json;

pub(crate) trait OutputFormatter: Send + Sync {
    fn print_header(&self, settings: &DispatchSettings, scenarios: &[ScenarioConfig]);
    fn progress(&self) -> Option<ProgressFn>;
    /// Per-scenario hooks (headers, results) fired by the suite between scenarios.
    fn observer(&self) -> Arc<dyn SuiteObserver>;
    fn print_summary(&self, summary: &SuiteSummary) -> anyhow::Result<()>;
}

pub(crate) fn formatter(format: OutputFormat) -> Box<dyn OutputFormatter> {
    match format {
        OutputFormat::HumanReadable => Box::new(human::HumanReadableOutput::new()),
        OutputFormat::Json => Box::new(json::JsonOutput::new()),
    }
}
