use rusqlite::{ffi, Connection, Error, Result};
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::debug;

const SCHEMA_VERSION: i64 = 1;

/// The fingerprint index. One SQLite connection behind a mutex; every
/// lookup-and-claim pair runs under that lock inside an immediate transaction.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path.as_ref())?;
        let db = Database {
            conn: Mutex::new(conn),
        };
        db.configure_pragmas()?;
        db.migrate_schema()?;
        debug!("Opened index at {}", path.as_ref().display());
        Ok(db)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Database {
            conn: Mutex::new(conn),
        };
        db.configure_pragmas()?;
        db.migrate_schema()?;
        Ok(db)
    }

    fn configure_pragmas(&self) -> Result<()> {
        self.connection().execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = FULL;
             PRAGMA busy_timeout = 5000;",
        )?;
        debug!("SQLite pragmas configured (WAL mode, synchronous FULL)");
        Ok(())
    }

    /// Check schema version and create the schema if needed.
    /// An index written by a newer schema is refused rather than reinterpreted.
    fn migrate_schema(&self) -> Result<()> {
        let conn = self.connection();
        let version: i64 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;
        if version > SCHEMA_VERSION {
            return Err(Error::SqliteFailure(
                ffi::Error::new(ffi::SQLITE_MISMATCH),
                Some(format!(
                    "index schema version {} is newer than supported version {}",
                    version, SCHEMA_VERSION
                )),
            ));
        }

        conn.execute_batch(include_str!("schema.sql"))?;
        debug!("SQLite schema initialized (version {})", SCHEMA_VERSION);
        Ok(())
    }

    /// Exclusive access to the underlying connection.
    ///
    /// A worker that panicked while holding the lock dropped its open
    /// transaction, which rolled it back, so the connection is still usable.
    pub fn connection(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn truncate_all(&self) -> Result<usize> {
        let removed = self.connection().execute("DELETE FROM files", [])?;
        debug!("Index truncated, {} records removed", removed);
        Ok(removed)
    }
}
