use sqlx::{
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous},
    Pool, Sqlite,
};
use std::path::Path;
use tokio::time::Duration;
use tracing::{info, instrument};

use crate::error::{Result, WatchError};
use crate::TARGET_DB;

#[derive(Clone)]
pub struct Database {
    pool: Pool<Sqlite>,
}

impl Database {
    /// Get access to the database pool
    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }
}

// Helper method to check if an sqlx error is a uniqueness violation
pub trait DbConstraintErrorExt {
    fn is_unique_violation(&self) -> bool;
}

impl DbConstraintErrorExt for sqlx::Error {
    fn is_unique_violation(&self) -> bool {
        match self {
            sqlx::Error::Database(err) => err.is_unique_violation(),
            _ => false,
        }
    }
}

impl Database {
    /// Opens (creating if missing) the SQLite file and ensures the schema.
    ///
    /// The pool holds a single connection, acquired here and kept for the
    /// whole run.
    #[instrument(target = "db", level = "info")]
    pub async fn new(database_path: &Path) -> Result<Self> {
        info!(target: TARGET_DB, "Opening database: {}", database_path.display());

        let connect_options = SqliteConnectOptions::new()
            .filename(database_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5))
            .synchronous(SqliteSynchronous::Normal);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .connect_with(connect_options)
            .await
            .map_err(WatchError::StoreInit)?;

        info!(target: TARGET_DB, "Database pool created");

        // Initialize schema
        let db = Database { pool };
        db.initialize_schema().await.map_err(WatchError::StoreInit)?;

        Ok(db)
    }

    /// Releases the connection. Called once at the end of a run.
    pub async fn close(&self) {
        self.pool.close().await;
        info!(target: TARGET_DB, "Database closed");
    }
}
