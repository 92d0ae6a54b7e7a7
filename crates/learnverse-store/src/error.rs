/// Errors raised by the audit store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// SQLite rejected a statement.
    #[error("database error: {0}")]
    Database(String),

    /// A lookup matched no row.
    #[error("not found: {0}")]
    NotFound(String),

    /// The database directory could not be prepared.
    #[error("IO error: {0}")]
    Io(String),
}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        StoreError::Database(e.to_string())
    }
}
