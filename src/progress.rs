use console::truncate_str;
use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};

use crate::model::Counters;

const TEXT_WIDTH: usize = 50;

/// Live spinners, one per worker.
#[derive(Clone, Debug)]
pub struct ProbeProgress {
    multi: MultiProgress,
}

impl ProbeProgress {
    pub fn new() -> Self {
        Self {
            multi: MultiProgress::new(),
        }
    }

    pub fn hidden() -> Self {
        Self {
            multi: MultiProgress::with_draw_target(ProgressDrawTarget::hidden()),
        }
    }

    pub fn worker_bar(&self, name: &str) -> WorkerBar {
        let bar = self.multi.add(ProgressBar::new_spinner());
        if let Ok(sty) = ProgressStyle::with_template("{spinner} {prefix} {elapsed_precise} {msg}") {
            bar.set_style(sty);
        }
        bar.set_prefix(name.to_string());
        WorkerBar { bar }
    }
}

impl Default for ProbeProgress {
    fn default() -> Self {
        Self::new()
    }
}

/// Spinner of a single worker.
#[derive(Clone, Debug)]
pub struct WorkerBar {
    bar: ProgressBar,
}

impl WorkerBar {
    pub fn hidden() -> Self {
        Self {
            bar: ProgressBar::hidden(),
        }
    }

    pub fn update(&self, counters: &Counters, last_marked: Option<&str>) {
        let text = last_marked
            .map(|line| truncate_str(line, TEXT_WIDTH, "...").into_owned())
            .unwrap_or_default();
        self.bar.set_message(format!(
            "total {} ok {} err {} allowed {} disallowed {} {text}",
            counters.total,
            counters.http_ok,
            counters.http_error,
            counters.allowed,
            counters.disallowed
        ));
        self.bar.tick();
    }

    /// Prints a line above the spinners without tearing them.
    pub fn println(&self, line: &str) {
        self.bar.suspend(|| println!("{line}"));
    }

    pub fn finish(&self) {
        self.bar.finish_with_message("finished");
    }
}
