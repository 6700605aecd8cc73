use super::models::*;
use super::sqlite::Database;
use rusqlite::{params, Connection, OptionalExtension, Result, Row, TransactionBehavior};
use tracing::trace;

impl Database {
    /// Path of the original holding `(digest, size)`, if any.
    pub fn lookup_original(&self, digest: &str, size: i64) -> Result<Option<String>> {
        find_original(&self.connection(), digest, size)
    }

    /// Atomically look up the record's fingerprint and insert it if absent.
    ///
    /// Exactly one of several concurrent claimants for the same fingerprint
    /// receives a non-duplicate outcome.
    pub fn claim(&self, record: &FileRecord) -> Result<ClaimOutcome> {
        let mut conn = self.connection();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let outcome = match find_original(&tx, &record.digest, record.size)? {
            Some(original) if original == record.path => ClaimOutcome::AlreadyClaimed,
            Some(original) => {
                // The path may still hold a row for content it no longer has.
                let stale = tx.execute("DELETE FROM files WHERE path = ?1", params![record.path])?;
                if stale > 0 {
                    ClaimOutcome::Displaced { original }
                } else {
                    ClaimOutcome::Duplicate { original }
                }
            }
            None => {
                let stale: Option<String> = tx
                    .query_row(
                        "SELECT digest FROM files WHERE path = ?1",
                        params![record.path],
                        |row| row.get(0),
                    )
                    .optional()?;

                tx.execute(
                    "INSERT INTO files (path, size, digest) VALUES (?1, ?2, ?3) \
                     ON CONFLICT(path) DO UPDATE SET \
                         size = excluded.size, \
                         digest = excluded.digest",
                    params![record.path, record.size, record.digest],
                )?;

                match stale {
                    Some(_) => ClaimOutcome::Refreshed,
                    None => ClaimOutcome::Claimed,
                }
            }
        };

        tx.commit()?;
        trace!("claim {} -> {:?}", record.path, outcome);
        Ok(outcome)
    }

    pub fn get_record_by_path(&self, path: &str) -> Result<Option<FileRecord>> {
        self.connection()
            .query_row(
                "SELECT id, path, size, digest FROM files WHERE path = ?1",
                params![path],
                map_record,
            )
            .optional()
    }

    pub fn get_all_records(&self) -> Result<Vec<FileRecord>> {
        let conn = self.connection();
        let mut stmt = conn.prepare("SELECT id, path, size, digest FROM files ORDER BY id")?;
        let records = stmt.query_map([], map_record)?.collect::<Result<Vec<_>>>()?;
        Ok(records)
    }

    pub fn record_count(&self) -> Result<i64> {
        self.connection()
            .query_row("SELECT COUNT(*) FROM files", [], |row| row.get(0))
    }

    pub fn total_indexed_bytes(&self) -> Result<i64> {
        self.connection()
            .query_row("SELECT COALESCE(SUM(size), 0) FROM files", [], |row| row.get(0))
    }
}

fn find_original(conn: &Connection, digest: &str, size: i64) -> Result<Option<String>> {
    conn.query_row(
        "SELECT path FROM files WHERE digest = ?1 AND size = ?2",
        params![digest, size],
        |row| row.get(0),
    )
    .optional()
}

fn map_record(row: &Row<'_>) -> Result<FileRecord> {
    Ok(FileRecord {
        id: row.get(0)?,
        path: row.get(1)?,
        size: row.get(2)?,
        digest: row.get(3)?,
    })
}
