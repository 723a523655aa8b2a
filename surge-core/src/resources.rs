//! CPU and memory of the load-generating process, sampled while a scenario runs.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use sysinfo::{Pid, ProcessRefreshKind, ProcessesToUpdate, RefreshKind, System};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::metrics::MetricsAggregator;

/// Average and peak resource usage over one scenario.
///
/// CPU is expressed in percent of one core, so values above 100 are possible on multi-core
/// hosts. Memory is resident set size in bytes.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ResourceUsage {
    pub samples: u64,
    pub cpu_avg_percent: f64,
    pub cpu_peak_percent: f64,
    pub memory_avg_bytes: u64,
    pub memory_peak_bytes: u64,
}

impl ResourceUsage {
    pub fn is_empty(&self) -> bool {
        self.samples == 0
    }
}

/// Running sums and peaks, folded one sample at a time.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct ResourceStats {
    samples: u64,
    cpu_sum: f64,
    cpu_peak: f64,
    memory_sum: u128,
    memory_peak: u64,
}

impl ResourceStats {
    pub(crate) fn fold(&mut self, cpu_percent: f64, memory_bytes: u64) {
        let cpu = if cpu_percent.is_finite() {
            cpu_percent.max(0.0)
        } else {
            0.0
        };
        self.samples = self.samples.saturating_add(1);
        self.cpu_sum += cpu;
        self.cpu_peak = self.cpu_peak.max(cpu);
        self.memory_sum = self.memory_sum.saturating_add(u128::from(memory_bytes));
        self.memory_peak = self.memory_peak.max(memory_bytes);
    }

    pub(crate) fn usage(&self) -> ResourceUsage {
        if self.samples == 0 {
            return ResourceUsage::default();
        }
        let memory_avg = self.memory_sum / u128::from(self.samples);
        ResourceUsage {
            samples: self.samples,
            cpu_avg_percent: self.cpu_sum / self.samples as f64,
            cpu_peak_percent: self.cpu_peak,
            memory_avg_bytes: u64::try_from(memory_avg).unwrap_or(u64::MAX),
            memory_peak_bytes: self.memory_peak,
        }
    }
}

/// Reads CPU and RSS of the current process.
pub struct ProcessSampler {
    system: System,
    pid: Pid,
}

impl ProcessSampler {
    /// `None` when the platform cannot report the current process.
    pub fn current() -> Option<Self> {
        let pid = sysinfo::get_current_pid().ok()?;
        let mut sampler = Self {
            system: System::new_with_specifics(RefreshKind::nothing()),
            pid,
        };
        // CPU usage is a delta between two refreshes; prime the first one.
        sampler.refresh();
        Some(sampler)
    }

    fn refresh(&mut self) {
        self.system.refresh_processes_specifics(
            ProcessesToUpdate::Some(&[self.pid]),
            true,
            ProcessRefreshKind::nothing().with_cpu().with_memory(),
        );
    }

    /// `(cpu percent, rss bytes)`.
    pub fn sample(&mut self) -> Option<(f64, u64)> {
        self.refresh();
        let process = self.system.process(self.pid)?;
        Some((f64::from(process.cpu_usage()), process.memory()))
    }
}

/// Ticker task feeding resource samples into an aggregator until finished or dropped.
pub(crate) struct ResourceMonitor {
    sampler: Arc<Mutex<ProcessSampler>>,
    metrics: Arc<MetricsAggregator>,
    task: JoinHandle<()>,
}

impl ResourceMonitor {
    pub(crate) fn start(metrics: Arc<MetricsAggregator>, every: Duration) -> Option<Self> {
        let sampler = Arc::new(Mutex::new(ProcessSampler::current()?));

        let task = {
            let sampler = sampler.clone();
            let metrics = metrics.clone();
            tokio::spawn(async move {
                let mut ticker = tokio::time::interval(every);
                ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
                // The first tick completes immediately.
                ticker.tick().await;
                loop {
                    ticker.tick().await;
                    record_one(&sampler, &metrics);
                }
            })
        };

        Some(Self {
            sampler,
            metrics,
            task,
        })
    }

    /// Stops the ticker and takes a closing sample, so short scenarios still report usage.
    pub(crate) fn finish(self) {
        self.task.abort();
        record_one(&self.sampler, &self.metrics);
    }
}

impl Drop for ResourceMonitor {
    fn drop(&mut self) {
        self.task.abort();
    }
}

fn record_one(sampler: &Mutex<ProcessSampler>, metrics: &MetricsAggregator) {
    let sample = sampler.lock().sample();
    if let Some((cpu, memory)) = sample {
        metrics.record_resources(cpu, memory);
    }
}
