use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

use surge_core::LatencyTracking;

pub const DEFAULT_BASE_URL: &str = "http://localhost:4000";

/// Value shipped in sample configs; never a real key.
pub const PLACEHOLDER_API_KEY: &str = "your-api-key";

fn parse_duration(input: &str) -> Result<Duration, String> {
    let d = humantime::parse_duration(input.trim())
        .map_err(|err| format!("invalid duration '{input}' ({err}); expected e.g. 30s, 250ms"))?;
    if d.is_zero() {
        return Err("duration must be greater than zero".to_string());
    }
    Ok(d)
}

fn parse_latency(input: &str) -> Result<LatencyTracking, String> {
    input
        .parse()
        .map_err(|_| format!("invalid latency mode '{input}' (expected exact or histogram)"))
}

fn parse_positive_u64(input: &str) -> Result<u64, String> {
    match input.parse::<u64>() {
        Ok(0) => Err("value must be a positive integer".to_string()),
        Ok(v) => Ok(v),
        Err(err) => Err(format!("invalid number '{input}': {err}")),
    }
}

fn parse_positive_usize(input: &str) -> Result<usize, String> {
    let v = parse_positive_u64(input)?;
    usize::try_from(v).map_err(|_| format!("value '{input}' is too large"))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Progress bar, per-scenario tables and a suite summary.
    HumanReadable,
    /// NDJSON progress, scenario and summary lines on stdout.
    Json,
}

#[derive(Debug, Parser)]
#[command(
    name = "surge",
    author,
    version,
    about = "Pressure tester for event-ingestion APIs",
    long_about = "surge drives a catalog of load scenarios against an event-ingestion service.\n\nEach scenario sends a fixed number of synthetic analytics events, either one per request (POST /ingest) or grouped into batches (POST /ingest/batch), with a bounded number of requests in flight. Scenarios run one after another and each reports latency percentiles, success rate, throughput and an error breakdown.",
    after_help = "Examples:\n  surge list\n  API_KEY=ak_... surge run\n  surge run --api-key ak_... --scenario 4 --concurrency 10\n  surge run --api-key ak_... --scenarios load.yaml --output json"
)]
pub struct Cli {
    /// Increase log verbosity (-v info, -vv debug). RUST_LOG takes precedence.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the scenario suite (or one scenario) against the ingestion API
    Run(RunArgs),

    /// Print the scenario catalog with indexes
    List(ListArgs),
}

#[derive(Debug, Args)]
pub struct ListArgs {
    /// YAML scenario file replacing the built-in catalog
    #[arg(long, value_name = "FILE")]
    pub scenarios: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Base URL of the ingestion service
    #[arg(long, env = "SURGE_BASE_URL", default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    /// API key sent as X-API-Key on every request
    #[arg(long, env = "API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Run only the scenario at this index (see `surge list`)
    #[arg(long, value_name = "INDEX")]
    pub scenario: Option<usize>,

    /// YAML scenario file replacing the built-in catalog
    #[arg(long, value_name = "FILE")]
    pub scenarios: Option<PathBuf>,

    /// Override the total number of events of every selected scenario
    #[arg(long, value_parser = parse_positive_u64)]
    pub events: Option<u64>,

    /// Override the batch size of every selected scenario (1 = single-event requests)
    #[arg(long, value_parser = parse_positive_u64)]
    pub batch_size: Option<u64>,

    /// Override the number of in-flight requests of every selected scenario
    #[arg(long, value_parser = parse_positive_usize)]
    pub concurrency: Option<usize>,

    /// Per-request deadline (e.g. 30s, 500ms)
    #[arg(long, value_parser = parse_duration, default_value = "30s")]
    pub timeout: Duration,

    /// Latency tracking: exact (every sample kept) or histogram (bounded memory)
    #[arg(long, value_parser = parse_latency, default_value = "exact")]
    pub latency: LatencyTracking,

    /// How often CPU and memory of this process are sampled during a scenario
    #[arg(long, value_parser = parse_duration, default_value = "250ms")]
    pub resource_interval: Duration,

    /// Skip CPU and memory sampling
    #[arg(long)]
    pub no_resources: bool,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::HumanReadable)]
    pub output: OutputFormat,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_duration_accepts_humantime() {
        assert_eq!(parse_duration("250ms"), Ok(Duration::from_millis(250)));
        assert_eq!(parse_duration("30s"), Ok(Duration::from_secs(30)));
        assert_eq!(parse_duration("1m 30s"), Ok(Duration::from_secs(90)));
    }

    #[test]
    fn parse_duration_rejects_invalid_values() {
        assert!(parse_duration("").is_err());
        assert!(parse_duration("abc").is_err());
        assert!(parse_duration("0s").is_err());
    }

    #[test]
    fn positive_numbers_only() {
        assert_eq!(parse_positive_u64("5"), Ok(5));
        assert!(parse_positive_u64("0").is_err());
        assert!(parse_positive_u64("-1").is_err());
        assert!(parse_positive_usize("0").is_err());
    }

    #[test]
    fn cli_parses_run_with_overrides() {
        let parsed = Cli::try_parse_from([
            "surge",
            "run",
            "--base-url",
            "http://127.0.0.1:9000",
            "--api-key",
            "ak_test",
            "--scenario",
            "3",
            "--events",
            "200",
            "--batch-size",
            "20",
            "--concurrency",
            "8",
            "--timeout",
            "2s",
            "--latency",
            "histogram",
            "--output",
            "json",
            "-vv",
        ]);

        let cli = match parsed {
            Ok(v) => v,
            Err(err) => panic!("failed to parse args: {err}"),
        };

        assert_eq!(cli.verbose, 2);
        match cli.command {
            Command::Run(args) => {
                assert_eq!(args.base_url, "http://127.0.0.1:9000");
                assert_eq!(args.api_key.as_deref(), Some("ak_test"));
                assert_eq!(args.scenario, Some(3));
                assert_eq!(args.events, Some(200));
                assert_eq!(args.batch_size, Some(20));
                assert_eq!(args.concurrency, Some(8));
                assert_eq!(args.timeout, Duration::from_secs(2));
                assert_eq!(args.latency, LatencyTracking::Histogram);
                assert_eq!(args.output, OutputFormat::Json);
            }
            Command::List(_) => panic!("expected run command"),
        }
    }

    #[test]
    fn cli_run_defaults() {
        let parsed = Cli::try_parse_from(["surge", "run", "--base-url", DEFAULT_BASE_URL]);
        let cli = match parsed {
            Ok(v) => v,
            Err(err) => panic!("failed to parse args: {err}"),
        };

        match cli.command {
            Command::Run(args) => {
                assert_eq!(args.timeout, Duration::from_secs(30));
                assert_eq!(args.latency, LatencyTracking::Exact);
                assert_eq!(args.resource_interval, Duration::from_millis(250));
                assert!(!args.no_resources);
                assert_eq!(args.output, OutputFormat::HumanReadable);
                assert_eq!(args.scenario, None);
            }
            Command::List(_) => panic!("expected run command"),
        }
    }

    #[test]
    fn cli_rejects_zero_concurrency() {
        assert!(Cli::try_parse_from(["surge", "run", "--concurrency", "0"]).is_err());
    }
}
