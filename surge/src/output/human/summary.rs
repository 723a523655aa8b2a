use std::fmt::Write as _;

use surge_core::{ScenarioReport, SuiteSummary};

use super::format::*;

pub(crate) fn render_scenario(report: &ScenarioReport) -> String {
    let s = &report.snapshot;
    let mut out = String::new();

    writeln!(out, "results: {}", report.config.name).ok();
    let rows = [
        ("duration", format_elapsed(s.duration)),
        ("total events", s.total_events.to_string()),
        (
            "success rate",
            format!(
                "{} ({} ok, {} failed)",
                format_percent(s.success_rate),
                s.successful_events,
                s.failed_events
            ),
        ),
        ("mean latency", format_latency(s.latency_mean)),
        (
            "latency",
            format!(
                "min={} p50={} p95={} p99={} max={}",
                format_latency(s.latency_min),
                format_latency(s.latency_p50),
                format_latency(s.latency_p95),
                format_latency(s.latency_p99),
                format_latency(s.latency_max)
            ),
        ),
        ("throughput", format!("{} events/s", format_rate(s.throughput))),
        (
            "requests",
            format!("{} (failed {})", s.requests_total, s.failed_requests_total),
        ),
        (
            "bytes",
            format!(
                "recv {} sent {}",
                format_bytes(s.bytes_received_total),
                format_bytes(s.bytes_sent_total)
            ),
        ),
    ];
    for (label, value) in rows {
        writeln!(out, "  {label:<14} {value}").ok();
    }

    let r = &s.resources;
    if !r.is_empty() {
        writeln!(out, "  resource usage {:>12}  {:>12}", "average", "peak").ok();
        writeln!(
            out,
            "    {:<12} {:>12}  {:>12}",
            "cpu",
            format!("{:.1}%", r.cpu_avg_percent),
            format!("{:.1}%", r.cpu_peak_percent)
        )
        .ok();
        writeln!(
            out,
            "    {:<12} {:>12}  {:>12}",
            "memory",
            format_bytes(r.memory_avg_bytes),
            format_bytes(r.memory_peak_bytes)
        )
        .ok();
    }

    if !s.errors.is_empty() {
        out.push_str("  error distribution\n");
        let mut errors: Vec<_> = s.errors.iter().collect();
        errors.sort_by(|(a_kind, a_count), (b_kind, b_count)| {
            b_count.cmp(a_count).then_with(|| a_kind.cmp(b_kind))
        });
        for (kind, count) in errors {
            let share = if s.total_events == 0 {
                0.0
            } else {
                *count as f64 / s.total_events as f64
            };
            writeln!(
                out,
                "    {:<28} {count:>8}  {:>7}",
                kind.to_string(),
                format_percent(share)
            )
            .ok();
        }
    }

    if !s.status_codes.is_empty() {
        out.push_str("  status codes\n");
        for (status, count) in &s.status_codes {
            writeln!(out, "    {status:<28} {count:>8}").ok();
        }
    }

    out
}

pub(crate) fn render_suite(summary: &SuiteSummary) -> String {
    let mut out = String::new();

    if summary.is_empty() {
        out.push_str("suite summary: no scenarios\n");
        return out;
    }

    let name_w = summary
        .reports()
        .iter()
        .map(|r| r.config.name.len())
        .max()
        .unwrap_or(0)
        .max("scenario".len());

    out.push_str("suite summary\n");
    writeln!(
        out,
        "  {:<name_w$}  {:>9}  {:>11}  {:>14}  {:>10}",
        "scenario", "success", "avg latency", "throughput/s", "p95"
    )
    .ok();
    for r in summary.reports() {
        let s = &r.snapshot;
        writeln!(
            out,
            "  {:<name_w$}  {:>9}  {:>11}  {:>14}  {:>10}",
            r.config.name,
            format_percent(s.success_rate),
            format_latency(s.latency_mean),
            format_rate(s.throughput),
            format_latency(s.latency_p95)
        )
        .ok();
    }
    writeln!(
        out,
        "  total: {} events, {} succeeded ({})",
        summary.total_events(),
        summary.successful_events(),
        format_percent(summary.success_rate())
    )
    .ok();

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use std::time::Duration;

    use surge_core::http::TransportErrorKind;
    use surge_core::{ErrorKind, LatencyTracking, ResourceUsage, ScenarioConfig, ScenarioSnapshot};

    fn snapshot() -> ScenarioSnapshot {
        let ms = Duration::from_millis;
        ScenarioSnapshot {
            duration: Duration::from_secs(2),
            total_events: 100,
            successful_events: 90,
            failed_events: 10,
            requests_total: 10,
            failed_requests_total: 1,
            success_rate: 0.9,
            latency_mean: ms(20),
            latency_min: ms(5),
            latency_max: ms(80),
            latency_p50: ms(18),
            latency_p95: ms(60),
            latency_p99: ms(78),
            throughput: 45.0,
            errors: BTreeMap::from([
                (ErrorKind::HttpStatus(503), 6),
                (ErrorKind::Transport(TransportErrorKind::Connect), 4),
            ]),
            status_codes: BTreeMap::from([(200, 90), (503, 6)]),
            bytes_sent_total: 4096,
            bytes_received_total: 512,
            latency_tracking: LatencyTracking::Exact,
            resources: ResourceUsage {
                samples: 8,
                cpu_avg_percent: 42.3,
                cpu_peak_percent: 97.5,
                memory_avg_bytes: 32 * 1024 * 1024,
                memory_peak_bytes: 48 * 1024 * 1024,
            },
        }
    }

    #[test]
    fn scenario_table_lists_errors_by_count() {
        let report = ScenarioReport {
            config: ScenarioConfig::new("Mixed Batch", 10, 100, 5),
            snapshot: snapshot(),
        };
        let out = render_scenario(&report);
        assert!(out.starts_with("results: Mixed Batch\n"));
        assert!(out.contains("90.00% (90 ok, 10 failed)"));
        assert!(out.contains("45.0 events/s"));

        let http = out.find("http_status:503");
        let transport = out.find("transport:connect");
        assert!(http.is_some() && transport.is_some());
        assert!(http < transport, "larger bucket first:\n{out}");
        assert!(out.contains("status codes"));
        assert!(out.contains("resource usage"));
        assert!(out.contains("42.3%") && out.contains("97.5%"), "{out}");
    }

    #[test]
    fn clean_scenarios_skip_error_tables() {
        let mut snap = snapshot();
        snap.errors.clear();
        snap.status_codes.clear();
        snap.resources = ResourceUsage::default();
        let report = ScenarioReport {
            config: ScenarioConfig::new("Click Events", 1, 100, 5),
            snapshot: snap,
        };
        let out = render_scenario(&report);
        assert!(!out.contains("error distribution"));
        assert!(!out.contains("status codes"));
        assert!(!out.contains("resource usage"));
    }
}
