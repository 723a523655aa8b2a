use std::path::Path;
use std::sync::Arc;

use anyhow::Context as _;
use serde::{Deserialize, Serialize};
use surge_core::{ScenarioConfig, SuiteEntry};
use surge_payload::{EventGenerator, EventType};

/// One catalog entry as written in a scenario file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub(crate) struct ScenarioDef {
    pub name: String,
    #[serde(default)]
    pub event_type: EventType,
    pub batch_size: u64,
    pub total_events: u64,
    pub concurrency: usize,
}

impl ScenarioDef {
    fn new(
        name: &str,
        event_type: EventType,
        batch_size: u64,
        total_events: u64,
        concurrency: usize,
    ) -> Self {
        Self {
            name: name.to_string(),
            event_type,
            batch_size,
            total_events,
            concurrency,
        }
    }

    pub(crate) fn apply_overrides(
        &mut self,
        events: Option<u64>,
        batch_size: Option<u64>,
        concurrency: Option<usize>,
    ) {
        if let Some(events) = events {
            self.total_events = events;
        }
        if let Some(batch_size) = batch_size {
            self.batch_size = batch_size;
        }
        if let Some(concurrency) = concurrency {
            self.concurrency = concurrency;
        }
    }

    pub(crate) fn config(&self) -> ScenarioConfig {
        ScenarioConfig::new(
            self.name.clone(),
            self.batch_size,
            self.total_events,
            self.concurrency,
        )
    }

    pub(crate) fn entry(&self) -> SuiteEntry {
        SuiteEntry::new(self.config(), Arc::new(EventGenerator::new(self.event_type)))
    }
}

/// The default suite, from light single-event load to sustained batched load.
pub(crate) fn builtin() -> Vec<ScenarioDef> {
    vec![
        ScenarioDef::new("Click Events", EventType::Click, 1, 1_000, 20),
        ScenarioDef::new("Action Events", EventType::Action, 1, 1_000, 20),
        ScenarioDef::new("Impression Events", EventType::Impression, 1, 1_000, 20),
        ScenarioDef::new("Error Events", EventType::Error, 1, 1_000, 20),
        ScenarioDef::new("Mixed Batch", EventType::Mixed, 50, 5_000, 50),
        ScenarioDef::new("Large Batch", EventType::Mixed, 100, 10_000, 30),
        ScenarioDef::new("High Concurrency", EventType::Mixed, 10, 20_000, 100),
        ScenarioDef::new("Sustained Load", EventType::Mixed, 20, 50_000, 40),
    ]
}

pub(crate) fn parse_yaml(src: &str) -> anyhow::Result<Vec<ScenarioDef>> {
    let defs: Vec<ScenarioDef> =
        serde_yaml::from_str(src).context("expected a YAML list of scenarios")?;
    if defs.is_empty() {
        anyhow::bail!("scenario file defines no scenarios");
    }
    for (idx, def) in defs.iter().enumerate() {
        if def.name.trim().is_empty() {
            anyhow::bail!("scenario #{idx}: name must not be empty");
        }
        def.config()
            .validate()
            .with_context(|| format!("scenario #{idx} ({})", def.name))?;
    }
    Ok(defs)
}

pub(crate) async fn load(path: Option<&Path>) -> anyhow::Result<Vec<ScenarioDef>> {
    let Some(path) = path else {
        return Ok(builtin());
    };
    let src = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read scenario file: {}", path.display()))?;
    parse_yaml(&src).with_context(|| format!("invalid scenario file: {}", path.display()))
}

/// Plain listing for `surge list`.
pub(crate) fn render_list(defs: &[ScenarioDef]) -> String {
    use std::fmt::Write as _;

    let name_w = defs
        .iter()
        .map(|s| s.name.len())
        .max()
        .unwrap_or(0)
        .max("scenario".len());

    let mut out = String::new();
    writeln!(
        out,
        "{:>3}  {:<name_w$}  {:<6}  {:>6}  {:>8}  {:>11}",
        "#", "scenario", "type", "batch", "events", "concurrency"
    )
    .ok();
    for (idx, s) in defs.iter().enumerate() {
        writeln!(
            out,
            "{idx:>3}  {:<name_w$}  {:<6}  {:>6}  {:>8}  {:>11}",
            s.name,
            s.event_type.as_ref(),
            s.batch_size,
            s.total_events,
            s.concurrency
        )
        .ok();
    }
    out
}
