use crate::config::AppConfig;
use crate::error::Error;
use crate::progress::ProgressReporter;
use crate::resolver::{Resolution, Resolver};
use crate::scanner::FileWalker;
use crate::storage::Database;
use crossbeam_channel::Receiver;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

pub struct ScanEngine {
    config: AppConfig,
    cancel: Arc<AtomicBool>,
}

#[derive(Debug, Default, Clone)]
pub struct ScanResult {
    pub duration: Duration,
    pub files_discovered: usize,
    pub files_processed: usize,
    pub originals: usize,
    pub already_indexed: usize,
    pub refreshed: usize,
    pub duplicates_quarantined: usize,
    pub quarantined_bytes: u64,
    pub read_errors: usize,
    pub storage_errors: usize,
    pub move_errors: usize,
    pub cancelled: bool,
}

impl ScanResult {
    pub fn error_count(&self) -> usize {
        self.read_errors + self.storage_errors + self.move_errors
    }

    fn absorb(&mut self, worker: WorkerStats) {
        self.files_processed += worker.processed;
        self.originals += worker.originals;
        self.already_indexed += worker.already_indexed;
        self.refreshed += worker.refreshed;
        self.duplicates_quarantined += worker.quarantined;
        self.quarantined_bytes += worker.quarantined_bytes;
        self.read_errors += worker.read_errors;
        self.storage_errors += worker.storage_errors;
        self.move_errors += worker.move_errors;
    }
}

/// Per-worker tallies, summed by the dispatcher after join.
#[derive(Debug, Default)]
struct WorkerStats {
    processed: usize,
    originals: usize,
    already_indexed: usize,
    refreshed: usize,
    quarantined: usize,
    quarantined_bytes: u64,
    read_errors: usize,
    storage_errors: usize,
    move_errors: usize,
}

impl ScanEngine {
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Share a flag that stops dispatch when set. Files already picked up by a
    /// worker are finished; queued ones are left untouched.
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = flag;
        self
    }

    /// Run the full pipeline:
    /// 1. Validate configuration and open (or create) the index
    /// 2. Walk the scan root lazily
    /// 3. Fingerprint and resolve every file on the worker pool
    pub fn scan(&self, reporter: &dyn ProgressReporter) -> Result<ScanResult, Error> {
        self.config.validate()?;
        let root = self.config.canonical_scan_root()?;

        let index = Database::open(&self.config.db_path).map_err(|source| Error::StorageOpen {
            path: self.config.db_path.clone(),
            source,
        })?;

        info!("Processing directory: {}", root.display());
        reporter.on_scan_start(&root);

        let walker = FileWalker::new(&root, &self.config.quarantine_dir_name)
            .with_ignore_patterns(self.config.ignore_matchers()?)
            .skip_empty_files(self.config.skip_empty_files)
            .exclude_index_files(&self.config.db_path);

        self.dispatch(&index, walker.into_paths(), reporter)
    }

    /// Drain `paths` through a fixed pool of workers against `index`.
    ///
    /// `paths` is consumed on the calling thread while the workers run, with
    /// a bounded channel in between. Returns once every dispatched path has
    /// been classified.
    pub fn dispatch<I>(
        &self,
        index: &Database,
        paths: I,
        reporter: &dyn ProgressReporter,
    ) -> Result<ScanResult, Error>
    where
        I: IntoIterator<Item = PathBuf>,
    {
        let start = Instant::now();
        let worker_count = self.config.workers.max(1);
        let resolver = Resolver::new(index, &self.config.quarantine_dir_name);
        let (path_tx, path_rx) = crossbeam_channel::bounded::<PathBuf>(self.config.queue_capacity);

        let mut result = thread::scope(|scope| -> Result<ScanResult, Error> {
            let mut handles = Vec::with_capacity(worker_count);
            for worker_idx in 0..worker_count {
                let rx = path_rx.clone();
                let resolver = &resolver;
                let cancel = &self.cancel;
                let handle = thread::Builder::new()
                    .name(format!("dedupe-worker-{worker_idx}"))
                    .spawn_scoped(scope, move || run_worker(rx, resolver, cancel, reporter))?;
                handles.push(handle);
            }

            // Workers hold the only receivers, so if they all exit `send` fails
            // instead of blocking forever.
            drop(path_rx);

            let mut result = ScanResult::default();
            for path in paths {
                if self.cancel.load(Ordering::Relaxed) {
                    result.cancelled = true;
                    break;
                }
                result.files_discovered += 1;
                reporter.on_file_discovered(result.files_discovered, &path);
                if path_tx.send(path).is_err() {
                    warn!("All workers exited, stopping dispatch");
                    break;
                }
            }

            // Workers drain what is queued, then see the disconnect and exit.
            drop(path_tx);

            for handle in handles {
                match handle.join() {
                    Ok(stats) => result.absorb(stats),
                    Err(_) => error!("A worker thread panicked; its tallies are lost"),
                }
            }
            Ok(result)
        })?;

        result.cancelled |= self.cancel.load(Ordering::Relaxed);
        result.duration = start.elapsed();
        reporter.on_scan_complete(result.files_processed, result.duration.as_secs_f64());

        debug!(
            "Run completed in {:.2}s: {} discovered, {} processed",
            result.duration.as_secs_f64(),
            result.files_discovered,
            result.files_processed,
        );
        if result.cancelled {
            warn!(
                "Run cancelled, {} discovered files were not processed",
                result.files_discovered.saturating_sub(result.files_processed)
            );
        }

        Ok(result)
    }
}

fn run_worker(
    rx: Receiver<PathBuf>,
    resolver: &Resolver<'_>,
    cancel: &AtomicBool,
    reporter: &dyn ProgressReporter,
) -> WorkerStats {
    let mut stats = WorkerStats::default();

    while !cancel.load(Ordering::Relaxed) {
        let Ok(path) = rx.recv() else {
            break;
        };

        match resolver.process(&path) {
            Ok((fingerprint, resolution)) => {
                match &resolution {
                    Resolution::Original => stats.originals += 1,
                    Resolution::AlreadyIndexed => stats.already_indexed += 1,
                    Resolution::Refreshed => stats.refreshed += 1,
                    Resolution::Quarantined { .. } => {
                        stats.quarantined += 1;
                        stats.quarantined_bytes += fingerprint.size;
                    }
                }
                reporter.on_file_processed(&path, Some(&resolution));
            }
            Err(err) => {
                match &err {
                    Error::Read { .. } => {
                        warn!("Error hashing file: {}", err);
                        stats.read_errors += 1;
                    }
                    Error::StorageWrite { .. } => {
                        error!("{}", err);
                        stats.storage_errors += 1;
                    }
                    _ => {
                        error!("{}", err);
                        stats.move_errors += 1;
                    }
                }
                reporter.on_file_processed(&path, None);
            }
        }
        stats.processed += 1;
    }

    stats
}
