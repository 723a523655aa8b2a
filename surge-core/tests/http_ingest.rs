mod support;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context as _, ensure};
use surge_core::http::TransportErrorKind;
use surge_core::{
    DispatchSettings, ErrorKind, HttpTransportFactory, ScenarioConfig, SuiteEntry,
    SuiteOrchestrator,
};
use surge_testserver::{TestServer, TestServerOptions};
use support::MinimalEvents;

const API_KEY: &str = "ak_integration";

fn entries(configs: &[(&str, u64, u64, usize)]) -> Vec<SuiteEntry> {
    let payloads = Arc::new(MinimalEvents);
    configs
        .iter()
        .map(|&(name, unit, total, concurrency)| {
            SuiteEntry::new(
                ScenarioConfig::new(name, unit, total, concurrency),
                payloads.clone(),
            )
        })
        .collect()
}

async fn server() -> anyhow::Result<TestServer> {
    TestServer::start_with(TestServerOptions {
        api_key: Some(API_KEY.to_string()),
        ..TestServerOptions::default()
    })
    .await
    .context("start test server")
}

#[tokio::test]
async fn single_and_batch_scenarios_reach_the_server() -> anyhow::Result<()> {
    let server = server().await?;
    let settings = DispatchSettings::new(server.base_url(), API_KEY)?;

    let mut suite = SuiteOrchestrator::new(
        settings,
        HttpTransportFactory::default(),
        entries(&[("singles", 1, 30, 5), ("batches", 20, 110, 3)]),
    );
    let summary = suite.run_all().await?.clone();

    let stats = server.stats().clone();
    server.shutdown().await;

    ensure!(stats.single_requests() == 30);
    ensure!(stats.batch_requests() == 6);
    ensure!(stats.events_total() == 140);
    ensure!(stats.unauthorized_total() == 0);
    ensure!(stats.bad_request_total() == 0);

    for report in summary.reports() {
        let s = &report.snapshot;
        ensure!(s.success_rate == 1.0, "{}: {:?}", report.config.name, s.errors);
        ensure!(s.status_codes.get(&200) == Some(&s.total_events));
        ensure!(s.bytes_sent_total > 0 && s.bytes_received_total > 0);
        ensure!(s.latency_min <= s.latency_p95 && s.latency_p95 <= s.latency_max);
    }
    Ok(())
}

#[tokio::test]
async fn wrong_api_key_is_an_http_failure() -> anyhow::Result<()> {
    let server = server().await?;
    let settings = DispatchSettings::new(server.base_url(), "ak_wrong")?;

    let mut suite = SuiteOrchestrator::new(
        settings,
        HttpTransportFactory::default(),
        entries(&[("unauthorized", 5, 25, 2)]),
    );
    let snapshot = suite.run_one(0).await?;
    let unauthorized = server.stats().unauthorized_total();
    server.shutdown().await;

    ensure!(unauthorized == 5);
    ensure!(snapshot.success_rate == 0.0);
    ensure!(snapshot.errors.get(&ErrorKind::HttpStatus(401)) == Some(&25));
    Ok(())
}

#[tokio::test]
async fn slow_server_trips_the_request_deadline() -> anyhow::Result<()> {
    let server = server().await?;
    server.behavior().set_delay(Duration::from_millis(500));
    let settings = DispatchSettings::new(server.base_url(), API_KEY)?
        .with_request_timeout(Duration::from_millis(50));

    let mut suite = SuiteOrchestrator::new(
        settings,
        HttpTransportFactory::default(),
        entries(&[("slow", 1, 4, 4)]),
    );
    let snapshot = suite.run_one(0).await?;
    server.shutdown().await;

    ensure!(snapshot.errors.get(&ErrorKind::Timeout) == Some(&4), "{:?}", snapshot.errors);
    ensure!(snapshot.latency_max < Duration::from_millis(500));
    Ok(())
}

#[tokio::test]
async fn server_concurrency_stays_within_the_limit() -> anyhow::Result<()> {
    let server = server().await?;
    server.behavior().set_delay(Duration::from_millis(10));
    let settings = DispatchSettings::new(server.base_url(), API_KEY)?;

    let mut suite = SuiteOrchestrator::new(
        settings,
        HttpTransportFactory::default(),
        entries(&[("gate", 1, 40, 4)]),
    );
    let snapshot = suite.run_one(0).await?;
    let max = server.stats().max_in_flight();
    server.shutdown().await;

    ensure!(snapshot.successful_events == 40);
    ensure!(max <= 4, "server saw {max} concurrent requests");
    Ok(())
}

#[tokio::test]
async fn unreachable_server_is_a_transport_failure() -> anyhow::Result<()> {
    let server = server().await?;
    let base_url = server.base_url().to_string();
    server.shutdown().await;

    let settings = DispatchSettings::new(&base_url, API_KEY)?;
    let mut suite = SuiteOrchestrator::new(
        settings,
        HttpTransportFactory::default(),
        entries(&[("down", 1, 3, 1)]),
    );
    let snapshot = suite.run_one(0).await?;

    ensure!(snapshot.failed_events == 3);
    ensure!(
        snapshot.errors.get(&ErrorKind::Transport(TransportErrorKind::Connect)) == Some(&3),
        "{:?}",
        snapshot.errors
    );
    Ok(())
}
