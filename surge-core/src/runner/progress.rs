use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::Instant;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressUpdate {
    pub scenario: String,
    /// Events whose dispatch has completed (successfully or not).
    pub processed_units: u64,
    pub total_units: u64,
    pub elapsed: Duration,
}

impl ProgressUpdate {
    /// Completed fraction in 0.0..=1.0. An empty scenario counts as complete.
    pub fn fraction(&self) -> f64 {
        if self.total_units == 0 {
            1.0
        } else {
            (self.processed_units as f64 / self.total_units as f64).clamp(0.0, 1.0)
        }
    }

    pub fn is_complete(&self) -> bool {
        self.processed_units >= self.total_units
    }
}

pub type ProgressFn = Arc<dyn Fn(ProgressUpdate) + Send + Sync + 'static>;

/// Counts completed events and publishes each new total while still holding the lock, so
/// observers always see `processed_units` grow monotonically.
pub(crate) struct ProgressTracker {
    scenario: String,
    total_units: u64,
    started: Instant,
    sink: Option<ProgressFn>,
    processed: Mutex<u64>,
}

impl ProgressTracker {
    pub(crate) fn new(
        scenario: &str,
        total_units: u64,
        started: Instant,
        sink: Option<ProgressFn>,
    ) -> Self {
        Self {
            scenario: scenario.to_string(),
            total_units,
            started,
            sink,
            processed: Mutex::new(0),
        }
    }

    pub(crate) fn advance(&self, units: u64) {
        let mut processed = self.processed.lock();
        *processed = processed.saturating_add(units);
        if let Some(sink) = &self.sink {
            sink(ProgressUpdate {
                scenario: self.scenario.clone(),
                processed_units: *processed,
                total_units: self.total_units,
                elapsed: self.started.elapsed(),
            });
        }
    }

    pub(crate) fn processed(&self) -> u64 {
        *self.processed.lock()
    }
}
