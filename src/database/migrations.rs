use crate::error::Result;
use sqlx::PgPool;
use tracing::info;

/// Apply every pending migration in version order
pub async fn run_migrations(pool: &PgPool) -> Result<()> {
    create_migrations_table(pool).await?;

    for (version, name, sql) in migrations() {
        if is_migration_applied(pool, version).await? {
            continue;
        }

        info!(version = version, name = name, "Applying migration");
        sqlx::query(sql).execute(pool).await?;
        record_migration(pool, version, name).await?;
        info!(version = version, name = name, "Migration applied successfully");
    }

    Ok(())
}

async fn create_migrations_table(pool: &PgPool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            name VARCHAR(255) NOT NULL,
            applied_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn is_migration_applied(pool: &PgPool, version: i32) -> Result<bool> {
    let count = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM schema_migrations WHERE version = $1",
    )
    .bind(version)
    .fetch_one(pool)
    .await?;

    Ok(count > 0)
}

async fn record_migration(pool: &PgPool, version: i32, name: &str) -> Result<()> {
    sqlx::query("INSERT INTO schema_migrations (version, name) VALUES ($1, $2)")
        .bind(version)
        .bind(name)
        .execute(pool)
        .await?;

    Ok(())
}

fn migrations() -> Vec<(i32, &'static str, &'static str)> {
    vec![
        (1, "rotation_history", MIGRATION_001_ROTATION_HISTORY),
        (2, "rotation_history_seq", MIGRATION_002_ROTATION_HISTORY_SEQ),
    ]
}

const MIGRATION_001_ROTATION_HISTORY: &str = r#"
CREATE TABLE IF NOT EXISTS rotation_history (
    id UUID PRIMARY KEY,
    proxy_id VARCHAR(255) NOT NULL,
    proxy_name VARCHAR(255) NOT NULL,
    old_ip VARCHAR(64),
    new_ip VARCHAR(64),
    success BOOLEAN NOT NULL DEFAULT false,
    status VARCHAR(20) NOT NULL,
    error_code VARCHAR(64),
    error_detail TEXT,
    elapsed_ms BIGINT NOT NULL DEFAULT 0,
    timestamp TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

CREATE INDEX IF NOT EXISTS idx_rotation_history_timestamp ON rotation_history(timestamp DESC);
CREATE INDEX IF NOT EXISTS idx_rotation_history_proxy_id ON rotation_history(proxy_id);
"#;

// Timestamps are taken before the write lock, so they can tie or arrive out
// of order under concurrent appends; `seq` records insertion order.
const MIGRATION_002_ROTATION_HISTORY_SEQ: &str = r#"
ALTER TABLE rotation_history ADD COLUMN IF NOT EXISTS seq BIGSERIAL;

CREATE INDEX IF NOT EXISTS idx_rotation_history_seq ON rotation_history(seq DESC);
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_versions_are_strictly_increasing() {
        let versions: Vec<i32> = migrations().iter().map(|(v, _, _)| *v).collect();
        assert!(versions.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(versions.first(), Some(&1));
    }

    #[test]
    fn test_history_table_matches_entry_fields() {
        for column in [
            "proxy_id",
            "proxy_name",
            "old_ip",
            "new_ip",
            "success",
            "status",
            "error_code",
            "error_detail",
            "elapsed_ms",
            "timestamp",
        ] {
            assert!(MIGRATION_001_ROTATION_HISTORY.contains(column), "{}", column);
        }
    }

    #[test]
    fn test_insertion_sequence_column_is_added() {
        let (version, _, sql) = migrations()
            .into_iter()
            .find(|(_, name, _)| *name == "rotation_history_seq")
            .unwrap();
        assert_eq!(version, 2);
        assert!(sql.contains("seq BIGSERIAL"));
    }
}
