use tracing::info;

use super::core::Database;
use crate::TARGET_DB;

impl Database {
    /// Creates the `cve` table if it does not exist yet. No migrations.
    pub(crate) async fn initialize_schema(&self) -> Result<(), sqlx::Error> {
        let mut conn = self.pool().acquire().await?;
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS cve (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                cve_id TEXT UNIQUE,
                title TEXT,
                published TEXT,
                description TEXT,
                severity TEXT,
                link TEXT
            );
            "#,
        )
        .execute(&mut *conn)
        .await?;
        info!(target: TARGET_DB, "Tables ensured to exist");

        Ok(())
    }
}
