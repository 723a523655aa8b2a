use std::time::Duration;

use hdrhistogram::Histogram;

use crate::error::{Error, Result};

/// How latencies are retained for percentile computation.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, strum::Display, strum::EnumString, strum::AsRefStr,
)]
#[strum(serialize_all = "snake_case")]
pub enum LatencyTracking {
    /// Keep every latency; percentiles are exact (linear interpolation between ranks).
    #[default]
    Exact,
    /// HDR histogram (1us up to twice the request deadline, at least 60s, 3 significant
    /// figures); percentiles are approximate.
    Histogram,
}

#[derive(Debug, Clone)]
pub(crate) enum LatencyRecorder {
    Exact(Vec<Duration>),
    Histogram(Box<Histogram<u64>>),
}

/// Smallest upper bound of the latency histogram.
pub const HISTOGRAM_MIN_CEILING: Duration = Duration::from_secs(60);

/// Histogram upper bound for a given request deadline.
///
/// Timed-out requests are measured slightly past their deadline, so the bound is twice the
/// deadline and never below [`HISTOGRAM_MIN_CEILING`].
pub fn histogram_ceiling(request_timeout: Duration) -> Duration {
    request_timeout
        .saturating_mul(2)
        .max(HISTOGRAM_MIN_CEILING)
}

impl LatencyRecorder {
    pub(crate) fn new(tracking: LatencyTracking, ceiling: Duration) -> Result<Self> {
        match tracking {
            LatencyTracking::Exact => Ok(Self::Exact(Vec::new())),
            LatencyTracking::Histogram => {
                let high = u64::try_from(ceiling.as_micros())
                    .unwrap_or(u64::MAX)
                    .max(2);
                Histogram::<u64>::new_with_bounds(1, high, 3)
                    .map(|h| Self::Histogram(Box::new(h)))
                    .map_err(|err| Error::Histogram(err.to_string()))
            }
        }
    }

    pub(crate) fn tracking(&self) -> LatencyTracking {
        match self {
            Self::Exact(_) => LatencyTracking::Exact,
            Self::Histogram(_) => LatencyTracking::Histogram,
        }
    }

    pub(crate) fn record(&mut self, latency: Duration) {
        match self {
            Self::Exact(values) => values.push(latency),
            Self::Histogram(h) => {
                let us = u64::try_from(latency.as_micros()).unwrap_or(u64::MAX).max(1);
                h.saturating_record(us);
            }
        }
    }

    pub(crate) fn clear(&mut self) {
        match self {
            Self::Exact(values) => values.clear(),
            Self::Histogram(h) => h.reset(),
        }
    }

    /// Latencies at each requested quantile (0.0..=1.0), in the order given.
    pub(crate) fn quantiles(&self, quantiles: &[f64]) -> Vec<Duration> {
        match self {
            Self::Exact(values) => {
                let mut sorted = values.clone();
                sorted.sort_unstable();
                quantiles.iter().map(|q| percentile(&sorted, *q)).collect()
            }
            Self::Histogram(h) => {
                if h.is_empty() {
                    return vec![Duration::ZERO; quantiles.len()];
                }
                quantiles
                    .iter()
                    .map(|q| Duration::from_micros(h.value_at_quantile(*q)))
                    .collect()
            }
        }
    }
}

/// Percentile over an ascending slice, interpolating linearly between the two nearest ranks.
///
/// `q` is a fraction (0.95 for p95). An empty slice yields zero.
pub fn percentile(sorted: &[Duration], q: f64) -> Duration {
    let Some(last) = sorted.len().checked_sub(1) else {
        return Duration::ZERO;
    };

    let rank = q.clamp(0.0, 1.0) * last as f64;
    let lower = rank.floor() as usize;
    let upper = (rank.ceil() as usize).min(last);
    let frac = rank - lower as f64;

    let lo = sorted[lower];
    let hi = sorted[upper];
    lo + (hi - lo).mul_f64(frac)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    #[test]
    fn percentile_interpolates_between_ranks() {
        let sorted = [ms(10), ms(20), ms(30), ms(40), ms(50)];
        // rank = 0.95 * 4 = 3.8 -> 40 + 0.8 * 10
        assert_eq!(percentile(&sorted, 0.95), ms(48));
        assert_eq!(percentile(&sorted, 0.5), ms(30));
        assert_eq!(percentile(&sorted, 0.0), ms(10));
        assert_eq!(percentile(&sorted, 1.0), ms(50));
    }

    #[test]
    fn percentile_of_empty_and_single() {
        assert_eq!(percentile(&[], 0.95), Duration::ZERO);
        assert_eq!(percentile(&[ms(7)], 0.95), ms(7));
    }

    #[test]
    fn exact_recorder_sorts_a_copy() {
        let mut rec = LatencyRecorder::new(LatencyTracking::Exact, HISTOGRAM_MIN_CEILING)
            .unwrap_or_else(|err| panic!("recorder: {err}"));
        for v in [50, 10, 40, 20, 30] {
            rec.record(ms(v));
        }
        assert_eq!(rec.quantiles(&[0.0, 1.0]), vec![ms(10), ms(50)]);

        // Arrival order is preserved in the recorder itself.
        match &rec {
            LatencyRecorder::Exact(values) => assert_eq!(values[0], ms(50)),
            LatencyRecorder::Histogram(_) => panic!("expected exact recorder"),
        }
    }

    #[test]
    fn histogram_recorder_approximates_quantiles() {
        let mut rec = LatencyRecorder::new(LatencyTracking::Histogram, HISTOGRAM_MIN_CEILING)
            .unwrap_or_else(|err| panic!("recorder: {err}"));
        assert_eq!(rec.quantiles(&[0.95]), vec![Duration::ZERO]);

        for v in 1..=100u64 {
            rec.record(ms(v));
        }
        let p95 = rec.quantiles(&[0.95])[0];
        assert!(p95 >= ms(94) && p95 <= ms(96), "p95={p95:?}");

        rec.clear();
        assert_eq!(rec.quantiles(&[0.5]), vec![Duration::ZERO]);
    }

    #[test]
    fn histogram_ceiling_follows_long_deadlines() {
        assert_eq!(histogram_ceiling(Duration::from_secs(5)), HISTOGRAM_MIN_CEILING);
        assert_eq!(
            histogram_ceiling(Duration::from_secs(90)),
            Duration::from_secs(180)
        );

        let mut rec = LatencyRecorder::new(
            LatencyTracking::Histogram,
            histogram_ceiling(Duration::from_secs(120)),
        )
        .unwrap_or_else(|err| panic!("recorder: {err}"));
        for _ in 0..90 {
            rec.record(ms(20));
        }
        for _ in 0..10 {
            rec.record(Duration::from_secs(121));
        }
        let p99 = rec.quantiles(&[0.99])[0];
        assert!(p99 >= Duration::from_secs(120), "p99={p99:?}");
    }

    #[test]
    fn tracking_parses_from_cli_strings() {
        assert_eq!("exact".parse::<LatencyTracking>().ok(), Some(LatencyTracking::Exact));
        assert_eq!(
            "histogram".parse::<LatencyTracking>().ok(),
            Some(LatencyTracking::Histogram)
        );
        assert_eq!(LatencyTracking::Histogram.to_string(), "histogram");
    }
}
