use anyhow::Context as _;
use surge_core::{DispatchSettings, HttpTransportFactory, SuiteOrchestrator};

use crate::cli::{ListArgs, PLACEHOLDER_API_KEY, RunArgs};
use crate::exit_codes::ExitCode;
use crate::output;
use crate::run_error::RunError;
use crate::scenarios;

pub async fn run(args: RunArgs) -> Result<ExitCode, RunError> {
    let api_key = resolve_api_key(args.api_key.as_deref()).map_err(RunError::InvalidInput)?;

    let mut defs = scenarios::load(args.scenarios.as_deref())
        .await
        .map_err(RunError::InvalidInput)?;
    for def in &mut defs {
        def.apply_overrides(args.events, args.batch_size, args.concurrency);
    }

    if let Some(index) = args.scenario
        && index >= defs.len()
    {
        return Err(RunError::InvalidInput(anyhow::anyhow!(
            "--scenario {index} is out of range: {} scenarios available (see `surge list`)",
            defs.len()
        )));
    }

    let settings = DispatchSettings::new(&args.base_url, api_key)
        .context("invalid --base-url/--api-key")
        .map_err(RunError::InvalidInput)?
        .with_request_timeout(args.timeout)
        .with_latency_tracking(args.latency);

    let configs: Vec<_> = match args.scenario {
        Some(index) => defs.get(index).map(|s| s.config()).into_iter().collect(),
        None => defs.iter().map(|s| s.config()).collect(),
    };
    for config in &configs {
        config
            .validate()
            .with_context(|| format!("scenario `{}`", config.name))
            .map_err(RunError::InvalidInput)?;
    }

    let out = output::formatter(args.output);
    out.print_header(&settings, &configs);

    let entries = defs.iter().map(|s| s.entry()).collect();
    let mut suite = SuiteOrchestrator::new(settings, HttpTransportFactory::default(), entries)
        .with_progress(out.progress())
        .with_observer(out.observer())
        .with_resource_interval((!args.no_resources).then_some(args.resource_interval));

    match args.scenario {
        Some(index) => {
            suite.run_one(index).await?;
        }
        None => {
            suite.run_all().await?;
        }
    }

    out.print_summary(suite.summary())
        .map_err(RunError::RuntimeError)?;
    Ok(ExitCode::Success)
}

pub async fn list(args: ListArgs) -> Result<ExitCode, RunError> {
    let defs = scenarios::load(args.scenarios.as_deref())
        .await
        .map_err(RunError::InvalidInput)?;
    print!("{}", scenarios::render_list(&defs));
    Ok(ExitCode::Success)
}

fn resolve_api_key(raw: Option<&str>) -> anyhow::Result<String> {
    let key = raw.map(str::trim).unwrap_or_default();
    if key.is_empty() {
        anyhow::bail!("an API key is required: pass --api-key or set API_KEY");
    }
    if key == PLACEHOLDER_API_KEY {
        anyhow::bail!("API_KEY is still the placeholder `{PLACEHOLDER_API_KEY}`; set a real key");
    }
    Ok(key.to_string())
}
