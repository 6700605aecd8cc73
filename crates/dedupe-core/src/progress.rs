use crate::resolver::Resolution;
use std::path::Path;

/// Trait for reporting run progress.
///
/// Called from the traversal thread and from every worker, hence `Send + Sync`.
/// All methods have default no-op implementations.
pub trait ProgressReporter: Send + Sync {
    fn on_scan_start(&self, _root: &Path) {}
    fn on_file_discovered(&self, _files_discovered: usize, _path: &Path) {}
    fn on_file_processed(&self, _path: &Path, _resolution: Option<&Resolution>) {}
    fn on_scan_complete(&self, _files_processed: usize, _duration_secs: f64) {}
}

/// No-op progress reporter for silent operation.
pub struct SilentReporter;

impl ProgressReporter for SilentReporter {}
