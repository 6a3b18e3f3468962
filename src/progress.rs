use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Numbered spinner display for the pipeline steps ("Step 2/4: ...")
#[derive(Debug, Clone)]
pub struct StepProgress {
    enabled: bool,
    total: usize,
}

impl StepProgress {
    pub fn new(enabled: bool, total: usize) -> Self {
        Self { enabled, total }
    }

    /// Display without any terminal output
    pub fn hidden(total: usize) -> Self {
        Self::new(false, total)
    }

    pub fn start(&self, step: usize, message: &str) -> Step {
        let label = format!("Step {}/{}: {}", step, self.total, message);
        let bar = if self.enabled {
            let bar = ProgressBar::new_spinner();
            bar.set_style(
                ProgressStyle::default_spinner()
                    .template("{spinner:.cyan} {msg} [{elapsed}]")
                    .unwrap_or_else(|_| ProgressStyle::default_spinner()),
            );
            bar.enable_steady_tick(Duration::from_millis(100));
            bar
        } else {
            ProgressBar::hidden()
        };
        bar.set_message(format!("{}...", label));
        Step { bar, label }
    }
}

/// A running step. Dropping it without an outcome clears the line.
pub struct Step {
    bar: ProgressBar,
    label: String,
}

impl Step {
    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn succeed(self) {
        self.bar.finish_with_message(format!("✔ {}", self.label));
    }

    pub fn fail(self) {
        self.bar.abandon_with_message(format!("✖ {}", self.label));
    }
}

impl Drop for Step {
    fn drop(&mut self) {
        if !self.bar.is_finished() {
            self.bar.finish_and_clear();
        }
    }
}
