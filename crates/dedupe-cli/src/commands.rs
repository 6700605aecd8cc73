use clap::{Args, Parser, Subcommand};
use dedupe_core::AppConfig;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "deduplicate")]
#[command(about = "Find duplicate files by content and move them aside", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Scan a directory, index originals and quarantine duplicates
    Process(ProcessArgs),
    /// Display the number of indexed files
    Stats(IndexArgs),
    /// Print configuration values
    PrintConfig,
    /// Delete every record from the index
    TruncateDb(IndexArgs),
}

#[derive(Debug, Args)]
pub struct ProcessArgs {
    /// Directory to scan
    #[arg(short, long)]
    pub path: Option<PathBuf>,

    /// Path to the SQLite index
    #[arg(long)]
    pub db: Option<PathBuf>,

    /// Number of concurrent workers
    #[arg(short, long)]
    pub workers: Option<usize>,
}

#[derive(Debug, Args)]
pub struct IndexArgs {
    /// Path to the SQLite index
    #[arg(long)]
    pub db: Option<PathBuf>,
}

impl ProcessArgs {
    /// Flags win over file and environment configuration.
    pub fn apply(&self, mut config: AppConfig) -> AppConfig {
        if let Some(path) = &self.path {
            config = config.with_scan_root(path);
        }
        if let Some(db) = &self.db {
            config = config.with_db_path(db);
        }
        if let Some(workers) = self.workers {
            config = config.with_workers(workers);
        }
        config
    }
}

impl IndexArgs {
    pub fn db_path(&self, config: &AppConfig) -> PathBuf {
        self.db.clone().unwrap_or_else(|| config.db_path.clone())
    }
}
