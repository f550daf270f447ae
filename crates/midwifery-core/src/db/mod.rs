//! Record store for midwifery data.
//!
//! A thin, transactional layer over SQLite that exposes the five collections
//! (patients, appointments, health records, users, sync queue) as keyed
//! document stores with secondary indexes.

mod schema;
mod store;

pub use schema::*;
pub use store::*;

use rusqlite::{Connection, ErrorCode};
use std::path::Path;
use thiserror::Error;
use tracing::debug;

/// Database errors.
#[derive(Error, Debug)]
pub enum DbError {
    #[error("SQLite error: {0}")]
    Sqlite(#[source] rusqlite::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Constraint violation: {0}")]
    Constraint(String),

    #[error("Storage full: {0}")]
    StorageFull(String),

    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

impl From<rusqlite::Error> for DbError {
    fn from(e: rusqlite::Error) -> Self {
        match e.sqlite_error_code() {
            Some(ErrorCode::ConstraintViolation) => DbError::Constraint(e.to_string()),
            Some(ErrorCode::DiskFull) => DbError::StorageFull(e.to_string()),
            Some(
                ErrorCode::DatabaseBusy
                | ErrorCode::DatabaseLocked
                | ErrorCode::CannotOpen
                | ErrorCode::ReadOnly,
            ) => DbError::Unavailable(e.to_string()),
            _ => DbError::Sqlite(e),
        }
    }
}

pub type DbResult<T> = Result<T, DbError>;

/// Database connection wrapper.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open database at path, creating if needed.
    pub fn open<P: AsRef<Path>>(path: P) -> DbResult<Self> {
        debug!(path = %path.as_ref().display(), "opening record store");
        let conn = Connection::open(path)?;
        let db = Self { conn };
        db.initialize()?;
        Ok(db)
    }

    /// Create in-memory database (for testing).
    pub fn open_in_memory() -> DbResult<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.initialize()?;
        Ok(db)
    }

    /// Create missing collections and indexes.
    ///
    /// Safe to call any number of times; an already initialized store is left
    /// untouched apart from the version stamp.
    pub fn initialize(&self) -> DbResult<()> {
        self.conn.execute_batch(SCHEMA)?;
        if self.schema_version()? < SCHEMA_VERSION {
            self.conn
                .pragma_update(None, "user_version", SCHEMA_VERSION)?;
        }
        Ok(())
    }

    /// Schema version stamped into the database file.
    pub fn schema_version(&self) -> DbResult<u32> {
        let version: u32 = self
            .conn
            .query_row("PRAGMA user_version", [], |row| row.get(0))?;
        Ok(version)
    }

    /// Get raw connection (for advanced queries).
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Begin a transaction.
    pub fn transaction(&mut self) -> DbResult<rusqlite::Transaction<'_>> {
        Ok(self.conn.transaction()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_in_memory() {
        let db = Database::open_in_memory();
        assert!(db.is_ok());
    }

    #[test]
    fn test_schema_initialized() {
        let db = Database::open_in_memory().unwrap();

        let tables: Vec<String> = db
            .conn()
            .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .filter_map(|r| r.ok())
            .collect();

        for collection in Collection::ALL {
            assert!(
                tables.contains(&collection.table().to_string()),
                "missing table {}",
                collection.table()
            );
        }
    }

    #[test]
    fn test_initialize_is_idempotent() {
        let db = Database::open_in_memory().unwrap();
        assert_eq!(db.schema_version().unwrap(), SCHEMA_VERSION);

        db.initialize().unwrap();
        db.initialize().unwrap();
        assert_eq!(db.schema_version().unwrap(), SCHEMA_VERSION);
    }

    #[test]
    fn test_reopen_keeps_data() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("midwifery.db");

        {
            let db = Database::open(&path).unwrap();
            db.conn()
                .execute(
                    "INSERT INTO patients (name, body) VALUES ('Jane Doe', '{\"name\":\"Jane Doe\"}')",
                    [],
                )
                .unwrap();
        }

        let db = Database::open(&path).unwrap();
        assert_eq!(db.count(Collection::Patients).unwrap(), 1);
    }

    #[test]
    fn test_constraint_errors_are_classified() {
        let db = Database::open_in_memory().unwrap();
        db.conn()
            .execute(
                "INSERT INTO users (email, role, body) VALUES ('a@b.c', 'client', '{}')",
                [],
            )
            .unwrap();

        let err: DbError = db
            .conn()
            .execute(
                "INSERT INTO users (email, role, body) VALUES ('a@b.c', 'client', '{}')",
                [],
            )
            .unwrap_err()
            .into();
        assert!(matches!(err, DbError::Constraint(_)));
    }
}
