use std::sync::Mutex;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

/// One bar per running scenario, drawn on stderr.
pub(crate) struct HumanProgress {
    bar: Mutex<Option<ProgressBar>>,
}

impl HumanProgress {
    pub(crate) fn new() -> Self {
        Self {
            bar: Mutex::new(None),
        }
    }

    pub(crate) fn start(&self, scenario: &str, total_units: u64) {
        let pb = ProgressBar::with_draw_target(
            Some(total_units),
            ProgressDrawTarget::stderr_with_hz(5),
        );
        pb.set_style(bar_style());
        pb.set_prefix(scenario.to_string());
        pb.enable_steady_tick(Duration::from_millis(200));

        let mut bar = self
            .bar
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(old) = bar.replace(pb) {
            old.finish_and_clear();
        }
    }

    pub(crate) fn update(&self, processed: u64, message: String) {
        let bar = self
            .bar
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(pb) = bar.as_ref() {
            pb.set_position(processed);
            pb.set_message(message);
        }
    }

    pub(crate) fn finish(&self) {
        let mut bar = self
            .bar
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(pb) = bar.take() {
            pb.finish_and_clear();
        }
    }
}

fn bar_style() -> ProgressStyle {
    ProgressStyle::with_template(
        "{prefix} [ {bar:30.cyan/blue} ] {percent:>3}% {pos}/{len} events {msg}",
    )
    .unwrap_or_else(|_| ProgressStyle::default_bar())
    .progress_chars("█░")
}
