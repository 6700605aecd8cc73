pub mod models;
pub mod queries;
pub mod sqlite;

pub use models::{ClaimOutcome, FileRecord};
pub use sqlite::Database;
