use sqlx::Row;
use tracing::{debug, error};

use super::core::{Database, DbConstraintErrorExt};
use crate::advisory::Advisory;
use crate::error::{Result, WatchError};
use crate::TARGET_DB;

impl Database {
    /// Returns true if an advisory with this identifier is stored. Absence is
    /// `Ok(false)`, never an error.
    pub async fn advisory_exists(&self, cve_id: &str) -> Result<bool> {
        let exists = sqlx::query_scalar::<_, i64>(
            "SELECT EXISTS(SELECT 1 FROM cve WHERE cve_id = ?1 LIMIT 1)",
        )
        .bind(cve_id)
        .fetch_one(self.pool())
        .await
        .map_err(|err| {
            error!(target: TARGET_DB, "Error checking if CVE exists: {}", err);
            WatchError::StoreQuery(err)
        })?;

        Ok(exists != 0)
    }

    /// Inserts a new advisory. A second insert for the same identifier fails
    /// with `ConstraintViolation` and leaves the stored row untouched.
    pub async fn insert_advisory(&self, advisory: &Advisory) -> Result<i64> {
        debug!(target: TARGET_DB, "Inserting advisory: {}", advisory.identifier);
        let result = sqlx::query(
            r#"
            INSERT INTO cve (cve_id, title, published, description, severity, link)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(&advisory.identifier)
        .bind(&advisory.title)
        .bind(&advisory.published)
        .bind(&advisory.description)
        .bind(&advisory.severity)
        .bind(&advisory.link)
        .execute(self.pool())
        .await;

        match result {
            Ok(done) => Ok(done.last_insert_rowid()),
            Err(err) if err.is_unique_violation() => Err(WatchError::ConstraintViolation {
                identifier: advisory.identifier.clone(),
            }),
            Err(err) => {
                error!(target: TARGET_DB, "Error inserting data: {}", err);
                Err(WatchError::StoreWrite(err))
            }
        }
    }

    pub async fn get_advisory(&self, cve_id: &str) -> Result<Option<Advisory>> {
        let row = sqlx::query(
            r#"
            SELECT cve_id, title, published, description, severity, link
            FROM cve
            WHERE cve_id = ?1
            "#,
        )
        .bind(cve_id)
        .fetch_optional(self.pool())
        .await
        .map_err(WatchError::StoreQuery)?;

        Ok(row.map(|row| Advisory {
            identifier: row.get::<Option<String>, _>("cve_id").unwrap_or_default(),
            title: row.get::<Option<String>, _>("title").unwrap_or_default(),
            published: row.get::<Option<String>, _>("published").unwrap_or_default(),
            description: row.get::<Option<String>, _>("description").unwrap_or_default(),
            severity: row.get::<Option<String>, _>("severity").unwrap_or_default(),
            link: row.get::<Option<String>, _>("link").unwrap_or_default(),
        }))
    }

    pub async fn count_advisories(&self) -> Result<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM cve")
            .fetch_one(self.pool())
            .await
            .map_err(WatchError::StoreQuery)
    }
}
