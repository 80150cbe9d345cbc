use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{ConnectOptions, Pool, Sqlite, Transaction};
use std::path::Path;

/// Open (creating if needed) the SQLite store at `path`.
///
/// The importer holds one transaction for the whole run, so the pool is
/// capped at a single connection; foreign keys are enforced on it.
pub async fn open_sqlite_pool(path: &Path) -> Result<Pool<Sqlite>, sqlx::Error> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|e| {
                tracing::error!(
                    target: "usda_import",
                    error = %e,
                    event = "db_dir_create_failed",
                    path = %parent.display()
                );
                sqlx::Error::Io(e)
            })?;
        }
    }
    tracing::info!(target: "usda_import", event = "db_path", path = %path.display());

    let opts = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal)
        .foreign_keys(true)
        .log_statements(log::LevelFilter::Trace);

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .after_connect(|conn, _| {
            Box::pin(async move {
                sqlx::query("PRAGMA busy_timeout = 5000;")
                    .execute(&mut *conn)
                    .await?;
                Ok::<_, sqlx::Error>(())
            })
        })
        .connect_with(opts)
        .await?;

    log_effective_pragmas(&pool).await;

    Ok(pool)
}

async fn log_effective_pragmas(pool: &Pool<Sqlite>) {
    use tracing::{info, warn};

    let (sqlite_ver,): (String,) = sqlx::query_as("select sqlite_version()")
        .fetch_one(pool)
        .await
        .unwrap_or((String::from("unknown"),));

    let jm: (String,) = sqlx::query_as("PRAGMA journal_mode;")
        .fetch_one(pool)
        .await
        .unwrap_or((String::from("unknown"),));

    let fks: (i64,) = sqlx::query_as("PRAGMA foreign_keys;")
        .fetch_one(pool)
        .await
        .unwrap_or((i64::MIN,));

    info!(
        target: "usda_import",
        event = "db_open",
        sqlite_version = %sqlite_ver,
        journal_mode = %jm.0,
        foreign_keys = %fks.0
    );

    if fks.0 != 1 {
        warn!(
            target: "usda_import",
            event = "db_open_warning",
            msg = "foreign_keys is off; dangling references will not be caught by the store"
        );
    }
}

/// Close out a transaction: commit when `outcome` is `Ok`, roll back otherwise.
pub async fn finish_tx<R, E>(tx: Transaction<'_, Sqlite>, outcome: Result<R, E>) -> Result<R, E>
where
    E: From<sqlx::Error>,
{
    use tracing::{error, info, warn};

    match outcome {
        Ok(val) => {
            tx.commit().await.map_err(E::from)?;
            info!(target: "usda_import", event = "db_tx_commit");
            Ok(val)
        }
        Err(e) => {
            if let Err(rb) = tx.rollback().await {
                error!(target: "usda_import", event = "db_tx_rollback_failed", error = %rb);
            } else {
                warn!(target: "usda_import", event = "db_tx_rollback");
            }
            Err(e)
        }
    }
}
