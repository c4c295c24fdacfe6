//! Versioned schema migrations for the domain store.
//!
//! Applied versions are recorded in `_migrations`. Each version's batch and
//! its record commit in one transaction, so a failed batch leaves neither
//! schema objects nor a version row behind.

use tokio_rusqlite::rusqlite::{self, Connection as SqliteConnection};
use tokio_rusqlite::{Connection, params};

use crate::Error;

/// Schema versions in apply order.
const MIGRATIONS: &[(i64, &str)] = &[
    (1, include_str!("../../migrations/001_domains.sql")),
    (2, include_str!("../../migrations/002_servers.sql")),
];

/// Apply every version newer than the highest one recorded.
pub async fn run(conn: &Connection) -> Result<(), Error> {
    conn.call(|conn| -> Result<(), Error> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS _migrations (
                version INTEGER PRIMARY KEY,
                applied_at TEXT NOT NULL
            )",
            [],
        )?;

        let current: i64 = conn.query_row("SELECT COALESCE(MAX(version), 0) FROM _migrations", [], |row| {
            row.get(0)
        })?;

        for &(version, sql) in MIGRATIONS.iter().filter(|(version, _)| *version > current) {
            apply(conn, version, sql).map_err(|e| Error::MigrationFailed(format!("version {version}: {e}")))?;
            tracing::debug!(version, "applied migration");
        }

        Ok(())
    })
    .await
    .map_err(Error::from)
}

fn apply(conn: &mut SqliteConnection, version: i64, sql: &str) -> rusqlite::Result<()> {
    let tx = conn.transaction()?;
    tx.execute_batch(sql)?;
    tx.execute(
        "INSERT INTO _migrations (version, applied_at) VALUES (?1, ?2)",
        params![version, chrono::Utc::now().to_rfc3339()],
    )?;
    tx.commit()
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn count(conn: &Connection, sql: &'static str) -> i64 {
        conn.call(move |conn| conn.query_row(sql, [], |row| row.get(0)))
            .await
            .unwrap()
    }

    const STORE_TABLES: &str =
        "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name IN ('domains', 'servers')";

    #[tokio::test]
    async fn test_reopen_applies_nothing_twice() {
        let conn = Connection::open_in_memory().await.unwrap();
        run(&conn).await.unwrap();
        run(&conn).await.unwrap();

        assert_eq!(count(&conn, STORE_TABLES).await, 2);
        assert_eq!(count(&conn, "SELECT COUNT(*) FROM _migrations").await, MIGRATIONS.len() as i64);
    }

    #[tokio::test]
    async fn test_failed_batch_leaves_no_partial_schema() {
        let conn = Connection::open_in_memory().await.unwrap();
        conn.call(|conn| conn.execute_batch("CREATE TABLE idx_domains_updated_at (x INTEGER);"))
            .await
            .unwrap();

        let result = run(&conn).await;

        assert!(matches!(result, Err(Error::MigrationFailed(msg)) if msg.starts_with("version 1")));
        assert_eq!(count(&conn, STORE_TABLES).await, 0);
        assert_eq!(count(&conn, "SELECT COUNT(*) FROM _migrations").await, 0);
    }
}
