use dedupe_core::{ProgressReporter, Resolution};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// CLI progress reporter: one spinner with processed/discovered counts.
/// The total is unknown while the walk is still running.
pub struct CliReporter {
    bar: ProgressBar,
    discovered: AtomicUsize,
    processed: AtomicUsize,
    quarantined: AtomicUsize,
}

impl CliReporter {
    pub fn new() -> Self {
        let bar = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏");
        bar.set_style(style);
        Self {
            bar,
            discovered: AtomicUsize::new(0),
            processed: AtomicUsize::new(0),
            quarantined: AtomicUsize::new(0),
        }
    }

    fn refresh(&self) {
        self.bar.set_message(format!(
            "{} processed / {} discovered, {} quarantined",
            self.processed.load(Ordering::Relaxed),
            self.discovered.load(Ordering::Relaxed),
            self.quarantined.load(Ordering::Relaxed),
        ));
    }
}

impl ProgressReporter for CliReporter {
    fn on_scan_start(&self, root: &Path) {
        self.bar.set_message(format!("Scanning {}...", root.display()));
        self.bar.enable_steady_tick(Duration::from_millis(80));
    }

    fn on_file_discovered(&self, files_discovered: usize, _path: &Path) {
        self.discovered.store(files_discovered, Ordering::Relaxed);
        self.refresh();
    }

    fn on_file_processed(&self, _path: &Path, resolution: Option<&Resolution>) {
        self.processed.fetch_add(1, Ordering::Relaxed);
        if let Some(Resolution::Quarantined { .. }) = resolution {
            self.quarantined.fetch_add(1, Ordering::Relaxed);
        }
        self.refresh();
    }

    fn on_scan_complete(&self, files_processed: usize, duration_secs: f64) {
        self.bar.finish_and_clear();
        eprintln!(
            "  \x1b[32m✓\x1b[0m Classified {} of {} files ({} quarantined) in {:.2}s",
            files_processed,
            self.discovered.load(Ordering::Relaxed),
            self.quarantined.load(Ordering::Relaxed),
            duration_secs
        );
    }
}
