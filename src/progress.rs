//! Terminal progress bars

use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use wchflash_core::{Phase, Progress};

const BAR_TEMPLATE: &str =
    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({bytes_per_sec}, {eta}) {msg}";
const SPINNER_TEMPLATE: &str = "{spinner:.green} {msg}";

/// Progress reporter drawing one indicatif bar per phase
#[derive(Default)]
pub struct BarProgress {
    bar: Option<ProgressBar>,
}

impl BarProgress {
    /// Create a reporter with no bar shown yet
    pub fn new() -> Self {
        Self::default()
    }
}

fn bar_style() -> ProgressStyle {
    ProgressStyle::default_bar()
        .template(BAR_TEMPLATE)
        .map(|style| style.progress_chars("#>-"))
        .unwrap_or_else(|_| ProgressStyle::default_bar())
}

fn spinner_style() -> ProgressStyle {
    ProgressStyle::default_spinner()
        .template(SPINNER_TEMPLATE)
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
}

impl Progress for BarProgress {
    fn start(&mut self, phase: Phase, total: usize) {
        // Erases are one long exchange with nothing to count
        let pb = if total == 0 {
            let pb = ProgressBar::new_spinner();
            pb.set_style(spinner_style());
            pb.enable_steady_tick(Duration::from_millis(100));
            pb
        } else {
            let pb = ProgressBar::new(total as u64);
            pb.set_style(bar_style());
            pb
        };
        pb.set_message(phase.label());

        if let Some(old) = self.bar.replace(pb) {
            old.abandon();
        }
    }

    fn advance(&mut self, done: usize) {
        if let Some(pb) = &self.bar {
            pb.set_position(done as u64);
        }
    }

    fn finish(&mut self, phase: Phase) {
        if let Some(pb) = self.bar.take() {
            pb.finish_with_message(format!("{} done", phase.label()));
        }
    }
}

impl Drop for BarProgress {
    fn drop(&mut self) {
        // A phase that failed leaves its bar where it stopped
        if let Some(pb) = self.bar.take() {
            pb.abandon();
        }
    }
}
