use async_trait::async_trait;
use sqlx::PgPool;

use crate::error::Result;
use crate::history::HistoryBackend;
use crate::models::RotationHistoryEntry;

const LOAD_SQL: &str = r#"
    SELECT id, proxy_id, proxy_name, old_ip, new_ip, success, status,
           error_code, error_detail, elapsed_ms, timestamp
    FROM rotation_history
    ORDER BY seq ASC
"#;

const INSERT_SQL: &str = r#"
    INSERT INTO rotation_history
        (id, proxy_id, proxy_name, old_ip, new_ip, success, status,
         error_code, error_detail, elapsed_ms, timestamp)
    VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
"#;

/// Keeps the `$1` most recently inserted rows
const PRUNE_SQL: &str = r#"
    DELETE FROM rotation_history
    WHERE seq NOT IN (
        SELECT seq FROM rotation_history
        ORDER BY seq DESC
        LIMIT $1
    )
"#;

/// History log stored in the `rotation_history` table, in insertion order
#[derive(Clone)]
pub struct PgHistoryRepository {
    pool: PgPool,
}

impl PgHistoryRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl HistoryBackend for PgHistoryRepository {
    async fn load(&self) -> Result<Vec<RotationHistoryEntry>> {
        let entries = sqlx::query_as::<_, RotationHistoryEntry>(LOAD_SQL)
            .fetch_all(&self.pool)
            .await?;

        Ok(entries)
    }

    /// Insert and prune in one transaction so readers never see more than
    /// `keep` rows.
    async fn append(&self, entry: &RotationHistoryEntry, keep: usize) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(INSERT_SQL)
            .bind(entry.id)
            .bind(&entry.proxy_id)
            .bind(&entry.proxy_name)
            .bind(&entry.old_ip)
            .bind(&entry.new_ip)
            .bind(entry.success)
            .bind(entry.status)
            .bind(&entry.error_code)
            .bind(&entry.error_detail)
            .bind(entry.elapsed_ms)
            .bind(entry.timestamp)
            .execute(&mut *tx)
            .await?;

        sqlx::query(PRUNE_SQL)
            .bind(i64::try_from(keep).unwrap_or(i64::MAX))
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "postgres"
    }
}
