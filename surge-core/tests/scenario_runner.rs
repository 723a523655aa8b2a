mod support;

use std::sync::Arc;
use std::time::Duration;

use anyhow::ensure;
use surge_core::{
    Dispatcher, Error, ErrorKind, FixedPayload, MetricsAggregator, ScenarioConfig,
    ScenarioRunner, Transport,
};
use support::{Explode, FixedLatency, Hang, InFlightProbe, RecordingPayload};

fn runner<T: Transport>(transport: T) -> anyhow::Result<ScenarioRunner<T>> {
    let settings = support::settings()?.with_request_timeout(Duration::from_secs(1));
    let metrics = Arc::new(MetricsAggregator::default());
    Ok(ScenarioRunner::new(Dispatcher::new(
        &settings, "test", transport, metrics,
    )?))
}

#[tokio::test(start_paused = true)]
async fn remainder_becomes_a_smaller_final_unit() -> anyhow::Result<()> {
    let (progress, log) = support::progress_log();
    let runner = runner(FixedLatency::ok(Duration::from_millis(5)))?.with_progress(Some(progress));
    let payloads = RecordingPayload::default();

    let snapshot = runner
        .run(&ScenarioConfig::new("partition", 50, 205, 2), &payloads)
        .await?;

    ensure!(payloads.sizes() == vec![50, 50, 50, 50, 5], "sizes: {:?}", payloads.sizes());
    ensure!(snapshot.requests_total == 5);
    ensure!(snapshot.total_events == 205);
    ensure!(snapshot.successful_events + snapshot.failed_events == 205);

    let log = log.lock();
    ensure!(log.len() == 5, "progress updates: {}", log.len());
    ensure!(log.windows(2).all(|w| w[0].processed_units < w[1].processed_units));
    let last = log.last().map(|u| (u.processed_units, u.total_units));
    ensure!(last == Some((205, 205)), "last update: {last:?}");
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn repeated_runs_report_the_fixed_latency() -> anyhow::Result<()> {
    let latency = Duration::from_millis(40);
    let runner = runner(FixedLatency::ok(latency))?;
    let config = ScenarioConfig::new("repeat", 10, 205, 4);
    let payloads = FixedPayload::default();

    let first = runner.run(&config, &payloads).await?;
    runner.metrics().reset();
    let second = runner.run(&config, &payloads).await?;

    for snapshot in [&first, &second] {
        ensure!(snapshot.latency_mean == latency, "mean: {:?}", snapshot.latency_mean);
        ensure!(snapshot.latency_p95 == latency);
        ensure!(snapshot.success_rate == 1.0);
        ensure!(snapshot.total_events == 205);
        // 21 dispatches through 4 slots: 6 rounds of 40ms.
        ensure!(
            snapshot.duration == Duration::from_millis(240),
            "duration: {:?}",
            snapshot.duration
        );
    }
    ensure!(first.errors.is_empty() && second.errors.is_empty());
    ensure!(first.resources.is_empty(), "sampling is off unless requested");
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn resource_sampling_reports_process_usage() -> anyhow::Result<()> {
    let runner = runner(FixedLatency::ok(Duration::from_millis(5)))?
        .with_resource_interval(Some(Duration::from_millis(10)));

    let snapshot = runner
        .run(&ScenarioConfig::new("resources", 1, 40, 4), &FixedPayload::default())
        .await?;

    let r = snapshot.resources;
    ensure!(r.samples >= 1, "samples: {}", r.samples);
    ensure!(r.memory_peak_bytes > 0);
    ensure!(r.memory_peak_bytes >= r.memory_avg_bytes);
    ensure!(r.cpu_peak_percent >= r.cpu_avg_percent);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn in_flight_dispatches_never_exceed_the_limit() -> anyhow::Result<()> {
    let probe = InFlightProbe::new(Duration::from_millis(5));
    let runner = runner(probe.clone())?;

    let snapshot = runner
        .run(&ScenarioConfig::new("gate", 1, 60, 3), &FixedPayload::default())
        .await?;

    ensure!(probe.max() <= 3, "max in flight: {}", probe.max());
    ensure!(probe.max() >= 1);
    ensure!(probe.total() == 60);
    ensure!(snapshot.successful_events == 60);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn all_timeouts_are_counted_per_event() -> anyhow::Result<()> {
    let runner = runner(Hang)?;

    let snapshot = runner
        .run(&ScenarioConfig::new("timeouts", 1, 12, 4), &FixedPayload::default())
        .await?;

    ensure!(snapshot.success_rate == 0.0);
    ensure!(snapshot.failed_events == 12);
    ensure!(snapshot.errors.len() == 1);
    ensure!(snapshot.errors.get(&ErrorKind::Timeout) == Some(&12));
    ensure!(snapshot.latency_max == Duration::from_secs(1));
    ensure!(snapshot.throughput == 0.0);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn rejected_batches_weigh_errors_by_event_count() -> anyhow::Result<()> {
    let runner = runner(FixedLatency {
        status: 503,
        latency: Duration::from_millis(2),
    })?;

    let snapshot = runner
        .run(&ScenarioConfig::new("rejected", 10, 25, 2), &FixedPayload::default())
        .await?;

    ensure!(snapshot.failed_requests_total == 3);
    ensure!(snapshot.errors.get(&ErrorKind::HttpStatus(503)) == Some(&25));
    ensure!(snapshot.status_codes.get(&503) == Some(&25));
    ensure!(snapshot.error_rate() == 1.0);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn empty_scenario_yields_an_empty_snapshot() -> anyhow::Result<()> {
    let runner = runner(FixedLatency::ok(Duration::from_millis(1)))?;

    let snapshot = runner
        .run(&ScenarioConfig::new("empty", 5, 0, 2), &FixedPayload::default())
        .await?;

    ensure!(snapshot.total_events == 0);
    ensure!(snapshot.requests_total == 0);
    ensure!(snapshot.success_rate == 0.0);
    ensure!(snapshot.throughput == 0.0);
    Ok(())
}

#[tokio::test]
async fn invalid_configs_fail_before_starting() -> anyhow::Result<()> {
    let runner = runner(FixedLatency::ok(Duration::ZERO))?;

    let err = runner
        .run(&ScenarioConfig::new("zero", 0, 10, 1), &FixedPayload::default())
        .await;
    ensure!(matches!(err, Err(Error::InvalidWorkUnitSize)), "{err:?}");

    let err = runner
        .run(&ScenarioConfig::new("zero", 1, 10, 0), &FixedPayload::default())
        .await;
    ensure!(matches!(err, Err(Error::InvalidConcurrency)), "{err:?}");

    // Nothing was started, so the aggregator is still usable.
    runner
        .run(&ScenarioConfig::new("ok", 1, 1, 1), &FixedPayload::default())
        .await?;
    Ok(())
}

#[tokio::test]
async fn reusing_a_stopped_aggregator_is_rejected() -> anyhow::Result<()> {
    let runner = runner(FixedLatency::ok(Duration::ZERO))?;
    let config = ScenarioConfig::new("twice", 1, 2, 1);

    runner.run(&config, &FixedPayload::default()).await?;
    let err = runner.run(&config, &FixedPayload::default()).await;
    ensure!(matches!(err, Err(Error::InvalidState(_))), "{err:?}");
    Ok(())
}

#[tokio::test]
async fn panicking_dispatch_surfaces_as_join_error() -> anyhow::Result<()> {
    let runner = runner(Explode)?;

    let err = runner
        .run(&ScenarioConfig::new("panic", 1, 3, 1), &FixedPayload::default())
        .await;
    ensure!(matches!(err, Err(Error::Join(_))), "{err:?}");
    Ok(())
}
