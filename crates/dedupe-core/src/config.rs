use crate::error::Error;
use config::{Config, ConfigError, Environment, File as ConfigFile};
use glob::Pattern;
use serde::Deserialize;
use std::fs;
use std::path::{Component, Path, PathBuf};

pub const DEFAULT_DB_PATH: &str = "deduplicate.db";
pub const DEFAULT_QUARANTINE_DIR: &str = "duplicate_to_be_deleted";
pub const DEFAULT_WORKERS: usize = 10;
pub const DEFAULT_QUEUE_CAPACITY: usize = 64;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Directory tree to deduplicate. Required; there is no implicit default.
    pub scan_root: Option<PathBuf>,
    pub db_path: PathBuf,
    pub workers: usize,
    /// Capacity of the channel between traversal and the workers.
    /// Zero turns it into a rendezvous channel.
    pub queue_capacity: usize,
    pub quarantine_dir_name: String,
    pub ignore_patterns: Vec<String>,
    pub skip_empty_files: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            scan_root: None,
            db_path: PathBuf::from(DEFAULT_DB_PATH),
            workers: DEFAULT_WORKERS,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            quarantine_dir_name: DEFAULT_QUARANTINE_DIR.to_string(),
            ignore_patterns: Vec::new(),
            skip_empty_files: false,
        }
    }
}

/// Layered configuration: optional `Dedupe.*` file, then `DEDUPE_*` environment variables.
pub fn load_configuration() -> Result<AppConfig, ConfigError> {
    let builder = Config::builder()
        .add_source(ConfigFile::with_name("Dedupe").required(false))
        .add_source(
            Environment::with_prefix("DEDUPE")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("ignore_patterns"),
        )
        .build()?;
    builder.try_deserialize::<AppConfig>()
}

impl AppConfig {
    pub fn with_scan_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.scan_root = Some(root.into());
        self
    }

    pub fn with_db_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.db_path = path.into();
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    /// Check everything that can be checked before the index is opened.
    pub fn validate(&self) -> Result<(), Error> {
        if self.workers == 0 {
            return Err(Error::InvalidConfig(
                "workers must be at least 1".to_string(),
            ));
        }
        if !is_plain_dir_name(&self.quarantine_dir_name) {
            return Err(Error::InvalidConfig(format!(
                "quarantine_dir_name '{}' must be a single directory name",
                self.quarantine_dir_name
            )));
        }
        self.ignore_matchers()?;
        self.canonical_scan_root()?;
        Ok(())
    }

    /// The scan root, canonicalized so every indexed path is absolute.
    pub fn canonical_scan_root(&self) -> Result<PathBuf, Error> {
        let root = self
            .scan_root
            .as_ref()
            .filter(|p| !p.as_os_str().is_empty())
            .ok_or_else(|| Error::InvalidConfig("scan root is required".to_string()))?;

        let canonical = fs::canonicalize(root).map_err(|e| {
            Error::InvalidConfig(format!("scan root '{}': {}", root.display(), e))
        })?;
        if !canonical.is_dir() {
            return Err(Error::InvalidConfig(format!(
                "scan root '{}' is not a directory",
                root.display()
            )));
        }
        Ok(canonical)
    }

    pub fn ignore_matchers(&self) -> Result<Vec<Pattern>, Error> {
        self.ignore_patterns
            .iter()
            .map(|glob| {
                Pattern::new(glob).map_err(|e| {
                    Error::InvalidConfig(format!("invalid glob pattern '{}': {}", glob, e))
                })
            })
            .collect()
    }
}

fn is_plain_dir_name(name: &str) -> bool {
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}
