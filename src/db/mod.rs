mod pending_queue;
mod word_cache;

pub use pending_queue::{PendingQueue, QueuedOperation};
pub use word_cache::WordCache;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;

/// Errors from the local cache.
#[derive(Debug)]
pub enum CacheError {
    /// Could not create the directory holding the database file
    Io(std::io::Error),
    Database(sqlx::Error),
    Migration(sqlx::migrate::MigrateError),
    /// A stored record or queued operation could not be (de)serialized
    Serialization(serde_json::Error),
    /// Records are keyed by word; an empty word cannot be stored
    EmptyKey,
}

impl std::fmt::Display for CacheError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CacheError::Io(e) => write!(f, "Failed to prepare database directory: {}", e),
            CacheError::Database(e) => write!(f, "Local database error: {}", e),
            CacheError::Migration(e) => write!(f, "Failed to migrate local database: {}", e),
            CacheError::Serialization(e) => write!(f, "Failed to encode cached data: {}", e),
            CacheError::EmptyKey => write!(f, "Word must not be empty"),
        }
    }
}

impl std::error::Error for CacheError {}

impl From<std::io::Error> for CacheError {
    fn from(e: std::io::Error) -> Self {
        CacheError::Io(e)
    }
}

impl From<sqlx::Error> for CacheError {
    fn from(e: sqlx::Error) -> Self {
        CacheError::Database(e)
    }
}

impl From<sqlx::migrate::MigrateError> for CacheError {
    fn from(e: sqlx::migrate::MigrateError) -> Self {
        CacheError::Migration(e)
    }
}

impl From<serde_json::Error> for CacheError {
    fn from(e: serde_json::Error) -> Self {
        CacheError::Serialization(e)
    }
}

/// Opens (creating if needed) the cache database and runs migrations.
pub async fn init_db(path: &Path) -> Result<SqlitePool, CacheError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let db_url = format!("sqlite:{}?mode=rwc", path.display());

    let options = SqliteConnectOptions::from_str(&db_url)?.create_if_missing(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;

    Ok(pool)
}
