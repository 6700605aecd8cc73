pub mod config;
pub mod engine;
pub mod error;
pub mod hasher;
pub mod progress;
pub mod resolver;
pub mod scanner;
pub mod storage;

pub use crate::config::AppConfig;
pub use engine::{ScanEngine, ScanResult};
pub use error::Error;
pub use hasher::Fingerprint;
pub use progress::{ProgressReporter, SilentReporter};
pub use resolver::{Resolution, Resolver};
pub use storage::{ClaimOutcome, Database, FileRecord};
