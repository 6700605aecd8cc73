use crate::hasher::Fingerprint;
use std::path::Path;

/// An original file as stored in the index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    pub id: i64,
    pub path: String,
    pub size: i64,
    pub digest: String,
}

impl FileRecord {
    /// Build an unsaved record; `id` is assigned by SQLite on insert.
    pub fn new(path: &Path, fingerprint: &Fingerprint) -> Self {
        Self {
            id: 0,
            path: path.to_string_lossy().into_owned(),
            size: fingerprint.size as i64,
            digest: fingerprint.digest.clone(),
        }
    }
}

/// Result of an atomic claim against the index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClaimOutcome {
    /// New record persisted; the claimant is the original.
    Claimed,
    /// The path was indexed by an earlier run with different content and now
    /// carries the new fingerprint.
    Refreshed,
    /// The same path already owns this fingerprint. Nothing was written.
    AlreadyClaimed,
    /// Another path owns this fingerprint.
    Duplicate { original: String },
    /// Another path owns this fingerprint, and the claimant's own record from
    /// an earlier run (with its old content) was removed.
    Displaced { original: String },
}

impl ClaimOutcome {
    pub fn is_original(&self) -> bool {
        !matches!(
            self,
            ClaimOutcome::Duplicate { .. } | ClaimOutcome::Displaced { .. }
        )
    }
}
