//! Shared handle to the audit database.
//!
//! A rusqlite `Connection` is `Send` but not `Sync`, so repositories share
//! one connection behind a mutex. The schema is versioned through SQLite's
//! `user_version` pragma and migrated when the handle is created.

use std::path::Path;
use std::sync::Arc;

use parking_lot::Mutex;
use rusqlite::Connection;
use tracing::{debug, info};

use crate::error::StoreError;
use crate::schema;

/// Cloneable handle; every clone talks to the same connection.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open the audit database at `path`, creating parent directories and
    /// the schema as needed.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)
                .map_err(|e| StoreError::Io(format!("{}: {e}", dir.display())))?;
        }
        let db = Self::migrated(Connection::open(path)?)?;
        info!(path = %path.display(), "audit database ready");
        Ok(db)
    }

    /// Private in-memory database.
    pub fn in_memory() -> Result<Self, StoreError> {
        Self::migrated(Connection::open_in_memory()?)
    }

    /// Run `f` while holding the connection.
    pub fn with_conn<F, T>(&self, f: F) -> Result<T, StoreError>
    where
        F: FnOnce(&Connection) -> Result<T, StoreError>,
    {
        f(&self.conn.lock())
    }

    fn migrated(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(schema::PRAGMAS)?;
        let version: u32 = conn.pragma_query_value(None, "user_version", |row| row.get(0))?;
        if version < schema::SCHEMA_VERSION {
            let tx = conn.unchecked_transaction()?;
            tx.execute_batch(schema::CREATE_TABLES)?;
            tx.pragma_update(None, "user_version", schema::SCHEMA_VERSION)?;
            tx.commit()?;
            debug!(from = version, to = schema::SCHEMA_VERSION, "audit schema migrated");
        }
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user_version(db: &Database) -> u32 {
        db.with_conn(|conn| {
            Ok(conn.pragma_query_value(None, "user_version", |row| row.get(0))?)
        })
        .unwrap()
    }

    #[test]
    fn fresh_database_is_at_current_version() {
        let db = Database::in_memory().unwrap();
        assert_eq!(user_version(&db), schema::SCHEMA_VERSION);

        let tables: Vec<String> = db
            .with_conn(|conn| {
                let mut stmt = conn
                    .prepare("SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name")?;
                let names = stmt
                    .query_map([], |row| row.get(0))?
                    .collect::<Result<_, _>>()?;
                Ok(names)
            })
            .unwrap();
        assert!(tables.iter().any(|t| t == "users"));
        assert!(tables.iter().any(|t| t == "messages"));
    }

    #[test]
    fn clones_share_one_connection() {
        let db = Database::in_memory().unwrap();
        let other = db.clone();
        db.with_conn(|conn| {
            let _ = conn.execute("CREATE TABLE scratch (x INTEGER)", [])?;
            Ok(())
        })
        .unwrap();
        let found: u32 = other
            .with_conn(|conn| {
                Ok(conn.query_row(
                    "SELECT COUNT(*) FROM sqlite_master WHERE name = 'scratch'",
                    [],
                    |row| row.get(0),
                )?)
            })
            .unwrap();
        assert_eq!(found, 1);
    }

    #[test]
    fn reopening_a_file_keeps_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("audit.db");
        {
            let db = Database::open(&path).unwrap();
            db.with_conn(|conn| {
                let _ = conn.execute(
                    "INSERT INTO users (chat_id, first_name, created_at, updated_at)
                     VALUES (1, 'Asha', 'now', 'now')",
                    [],
                )?;
                Ok(())
            })
            .unwrap();
        }
        let db = Database::open(&path).unwrap();
        assert_eq!(user_version(&db), schema::SCHEMA_VERSION);
        let users: u32 = db
            .with_conn(|conn| Ok(conn.query_row("SELECT COUNT(*) FROM users", [], |r| r.get(0))?))
            .unwrap();
        assert_eq!(users, 1);
    }
}
