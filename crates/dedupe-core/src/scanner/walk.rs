use glob::Pattern;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::{DirEntry, WalkDir};

/// Lazy traversal producing the regular files under a root.
///
/// Directories named like the quarantine directory are never entered, so a
/// rerun does not reclassify files that were already moved aside.
pub struct FileWalker {
    root: PathBuf,
    quarantine_dir_name: OsString,
    ignore_patterns: Vec<Pattern>,
    excluded_files: Vec<PathBuf>,
    skip_empty_files: bool,
}

impl FileWalker {
    pub fn new(root: impl Into<PathBuf>, quarantine_dir_name: &str) -> Self {
        Self {
            root: root.into(),
            quarantine_dir_name: OsString::from(quarantine_dir_name),
            ignore_patterns: Vec::new(),
            excluded_files: Vec::new(),
            skip_empty_files: false,
        }
    }

    pub fn with_ignore_patterns(mut self, patterns: Vec<Pattern>) -> Self {
        self.ignore_patterns = patterns;
        self
    }

    pub fn skip_empty_files(mut self, skip: bool) -> Self {
        self.skip_empty_files = skip;
        self
    }

    /// Keep the SQLite database and its journal files out of the walk when
    /// the index lives inside the scanned tree.
    pub fn exclude_index_files(mut self, db_path: &Path) -> Self {
        let (Some(parent), Some(name)) = (db_path.parent(), db_path.file_name()) else {
            return self;
        };
        let parent = if parent.as_os_str().is_empty() {
            Path::new(".")
        } else {
            parent
        };
        let Ok(parent) = fs::canonicalize(parent) else {
            return self;
        };

        for suffix in ["", "-wal", "-shm", "-journal"] {
            let mut file_name = name.to_os_string();
            file_name.push(suffix);
            self.excluded_files.push(parent.join(file_name));
        }
        self
    }

    pub fn into_paths(self) -> impl Iterator<Item = PathBuf> {
        let FileWalker {
            root,
            quarantine_dir_name,
            ignore_patterns,
            excluded_files,
            skip_empty_files,
        } = self;
        let dir_patterns = ignore_patterns.clone();

        WalkDir::new(root)
            .follow_links(false)
            .into_iter()
            .filter_entry(move |entry| {
                if entry.depth() == 0 || !entry.file_type().is_dir() {
                    return true;
                }
                entry.file_name() != quarantine_dir_name.as_os_str()
                    && !is_ignored(entry.path(), &dir_patterns)
            })
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(err) => {
                    warn!("Skipping unreadable entry: {}", err);
                    None
                }
            })
            .filter(move |entry| {
                is_candidate(entry, &ignore_patterns, &excluded_files, skip_empty_files)
            })
            .map(DirEntry::into_path)
    }
}

fn is_ignored(path: &Path, patterns: &[Pattern]) -> bool {
    patterns.iter().any(|pattern| pattern.matches_path(path))
}

fn is_candidate(
    entry: &DirEntry,
    ignore_patterns: &[Pattern],
    excluded_files: &[PathBuf],
    skip_empty_files: bool,
) -> bool {
    // Symlinks report their own type here since links are not followed.
    if !entry.file_type().is_file() {
        return false;
    }

    let path = entry.path();
    if excluded_files.iter().any(|excluded| excluded == path) || is_ignored(path, ignore_patterns)
    {
        debug!("Ignoring {}", path.display());
        return false;
    }

    if skip_empty_files {
        match entry.metadata() {
            Ok(metadata) if metadata.len() == 0 => return false,
            Ok(_) => {}
            Err(err) => {
                warn!("Error getting metadata for {}: {}", path.display(), err);
                return false;
            }
        }
    }

    true
}
