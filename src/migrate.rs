use sha2::{Digest, Sha256};
use sqlx::{Executor, Row, SqlitePool};
use std::collections::HashMap;

use tracing::{error, info};

fn preview(sql: &str) -> String {
    let one_line = sql.replace(['\n', '\t'], " ");
    let trimmed = one_line.trim();
    if trimmed.chars().count() > 160 {
        let head: String = trimmed.chars().take(160).collect();
        format!("{head}…")
    } else {
        trimmed.to_string()
    }
}

pub(crate) static MIGRATIONS: &[(&str, &str)] = &[(
    "202610160900_initial.sql",
    include_str!("../migrations/202610160900_initial.sql"),
)];

fn strip_comments(raw_sql: &str) -> String {
    raw_sql
        .lines()
        .filter(|line| {
            let t = line.trim_start();
            !(t.is_empty() || t.starts_with("--"))
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub(crate) fn checksum(raw_sql: &str) -> String {
    format!("{:x}", Sha256::digest(strip_comments(raw_sql).as_bytes()))
}

/// Apply every embedded migration that has not been recorded in
/// `schema_migrations` yet. Each file runs in its own transaction.
pub async fn apply_migrations(pool: &SqlitePool) -> anyhow::Result<()> {
    pool.execute(
        "CREATE TABLE IF NOT EXISTS schema_migrations (\
           version   TEXT PRIMARY KEY,\
           applied_at INTEGER NOT NULL,\
           checksum TEXT NOT NULL\
         )",
    )
    .await?;

    let rows = sqlx::query("SELECT version, checksum FROM schema_migrations")
        .fetch_all(pool)
        .await?;
    let mut applied: HashMap<String, String> = HashMap::new();
    for r in rows {
        if let (Ok(v), Ok(c)) = (
            r.try_get::<String, _>("version"),
            r.try_get::<String, _>("checksum"),
        ) {
            applied.insert(v, c);
        }
    }

    for (filename, raw_sql) in MIGRATIONS {
        let cleaned = strip_comments(raw_sql);
        let checksum = checksum(raw_sql);

        if let Some(stored) = applied.get(*filename) {
            if stored != &checksum {
                anyhow::bail!("migration {} edited after application", filename);
            }
            info!(target: "usda_import", event = "migration_skip_file", file = %filename);
            continue;
        }

        let mut tx = pool.begin().await?;
        for stmt in cleaned.split(';') {
            let s = stmt.trim();
            if s.is_empty() {
                continue;
            }
            let upper = s.to_ascii_uppercase();
            if upper == "BEGIN" || upper == "COMMIT" {
                continue;
            }
            info!(target: "usda_import", event = "migration_stmt", file = %filename, sql = %preview(s));
            if let Err(e) = sqlx::query(s).execute(&mut *tx).await {
                error!(target: "usda_import", event = "migration_stmt_error", file = %filename, sql = %preview(s), error = %e);
                return Err(e.into());
            }
        }

        sqlx::query(
            "INSERT INTO schema_migrations (version, applied_at, checksum) VALUES (?, ?, ?)",
        )
        .bind(*filename)
        .bind(chrono::Utc::now().timestamp_millis())
        .bind(&checksum)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        info!(target: "usda_import", event = "migration_file_applied", file = %filename);
    }

    Ok(())
}

/// Versions embedded in this build, in application order.
pub fn embedded_versions() -> Vec<&'static str> {
    MIGRATIONS.iter().map(|(name, _)| *name).collect()
}

/// Versions recorded in `schema_migrations`; empty on a fresh database.
pub async fn applied_versions(pool: &SqlitePool) -> anyhow::Result<Vec<String>> {
    let exists: Option<i64> = sqlx::query_scalar(
        "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = 'schema_migrations'",
    )
    .fetch_optional(pool)
    .await?;
    if exists.is_none() {
        return Ok(Vec::new());
    }
    let versions: Vec<String> =
        sqlx::query_scalar("SELECT version FROM schema_migrations ORDER BY version")
        .fetch_all(pool)
        .await?;
    Ok(versions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_sqlite_pool;
    use tempfile::TempDir;

    #[tokio::test]
    async fn migrations_are_idempotent_and_recorded() {
        let dir = TempDir::new().unwrap();
        let pool = open_sqlite_pool(&dir.path().join("usda.sqlite3"))
            .await
            .unwrap();

        assert!(applied_versions(&pool).await.unwrap().is_empty());
        apply_migrations(&pool).await.unwrap();
        apply_migrations(&pool).await.unwrap();

        let versions = applied_versions(&pool).await.unwrap();
        assert_eq!(versions, embedded_versions());

        for table in [
            "food_group",
            "food",
            "nutrient",
            "weight",
            "footnote",
            "source",
            "data_derivation",
            "data_source",
            "nutrient_data",
            "nutrient_data_source",
            "nutrient_data_data_source",
        ] {
            let exists: Option<i64> = sqlx::query_scalar(
                "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1",
            )
            .bind(table)
            .fetch_optional(&pool)
            .await
            .unwrap();
            assert!(exists.is_some(), "expected table `{table}`");
        }
    }

    #[tokio::test]
    async fn edited_migration_is_rejected() {
        let dir = TempDir::new().unwrap();
        let pool = open_sqlite_pool(&dir.path().join("usda.sqlite3"))
            .await
            .unwrap();
        apply_migrations(&pool).await.unwrap();

        sqlx::query("UPDATE schema_migrations SET checksum = 'stale'")
            .execute(&pool)
            .await
            .unwrap();

        let err = apply_migrations(&pool).await.unwrap_err();
        assert!(err.to_string().contains("edited after application"));
    }

    #[test]
    fn checksum_ignores_comment_lines() {
        assert_eq!(
            checksum("-- header\nCREATE TABLE t (id INTEGER);\n"),
            checksum("CREATE TABLE t (id INTEGER);")
        );
    }
}
