#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Malformed record: {0}")]
    Decode(String),

    #[error("Invalid cookie: {0}")]
    InvalidCookie(String),

    #[cfg(feature = "sqlite_store")]
    #[error("SQLite error: {0}")]
    Sqlite(#[from] r2d2_sqlite::rusqlite::Error),

    #[cfg(feature = "sqlite_store")]
    #[error("Connection pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("Storage task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error("Backing medium could not be opened: {0}")]
    Unavailable(String),
}
