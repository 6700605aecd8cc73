pub mod quarantine;

use crate::error::Error;
use crate::hasher::{self, Fingerprint};
use crate::storage::{ClaimOutcome, Database, FileRecord};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// What happened to one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// First file seen with this content; now indexed.
    Original,
    /// Indexed by an earlier run with the same content.
    AlreadyIndexed,
    /// Indexed by an earlier run with different content; record updated.
    Refreshed,
    /// Content already owned by `original`; the file was moved to `destination`.
    Quarantined {
        original: String,
        destination: PathBuf,
    },
}

/// Decides original-vs-duplicate for a file and acts on the decision.
///
/// Shared by reference between all workers of a run.
pub struct Resolver<'a> {
    index: &'a Database,
    quarantine_dir_name: &'a str,
}

impl<'a> Resolver<'a> {
    pub fn new(index: &'a Database, quarantine_dir_name: &'a str) -> Self {
        Self {
            index,
            quarantine_dir_name,
        }
    }

    /// Fingerprint `path`, then resolve it.
    pub fn process(&self, path: &Path) -> Result<(Fingerprint, Resolution), Error> {
        let fingerprint = hasher::fingerprint(path).map_err(|source| Error::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let resolution = self.resolve(path, &fingerprint)?;
        Ok((fingerprint, resolution))
    }

    /// Claim the fingerprint for `path`; a losing claim moves the file into
    /// quarantine. Any error leaves the file where it is.
    pub fn resolve(&self, path: &Path, fingerprint: &Fingerprint) -> Result<Resolution, Error> {
        let record = FileRecord::new(path, fingerprint);
        let outcome = self
            .index
            .claim(&record)
            .map_err(|source| Error::StorageWrite {
                path: path.to_path_buf(),
                source,
            })?;

        match outcome {
            ClaimOutcome::Claimed => {
                debug!("Recorded original {} ({})", path.display(), fingerprint);
                Ok(Resolution::Original)
            }
            ClaimOutcome::Refreshed => {
                debug!("Content of {} changed, index updated", path.display());
                Ok(Resolution::Refreshed)
            }
            ClaimOutcome::AlreadyClaimed => {
                debug!("{} already indexed", path.display());
                Ok(Resolution::AlreadyIndexed)
            }
            ClaimOutcome::Displaced { original } => {
                debug!(
                    "{} no longer holds its indexed content, record dropped",
                    path.display()
                );
                self.quarantine_duplicate(path, original)
            }
            ClaimOutcome::Duplicate { original } => self.quarantine_duplicate(path, original),
        }
    }

    fn quarantine_duplicate(&self, path: &Path, original: String) -> Result<Resolution, Error> {
        let destination = quarantine::quarantine(path, self.quarantine_dir_name).map_err(
            |source| Error::Quarantine {
                path: path.to_path_buf(),
                source,
            },
        )?;
        info!(
            "Duplicate found: {} (original: {}) -> moved to {}",
            path.display(),
            original,
            destination.display()
        );
        Ok(Resolution::Quarantined {
            original,
            destination,
        })
    }
}
