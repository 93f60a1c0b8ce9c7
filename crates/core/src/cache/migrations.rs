//! Schema migrations for the cache storage.
//!
//! Each migration runs in its own transaction together with its ledger row,
//! so a failed migration leaves the schema at the previous version.

use tokio_rusqlite::{Connection, params, rusqlite};

use super::Error;

struct Migration {
    version: i64,
    name: &'static str,
    sql: &'static str,
}

const MIGRATIONS: &[Migration] =
    &[Migration { version: 1, name: "cache_storage", sql: include_str!("../../migrations/001_cache_storage.sql") }];

const LEDGER: &str = "CREATE TABLE IF NOT EXISTS schema_migrations (
    version INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    applied_at TEXT NOT NULL
)";

fn schema_version(conn: &rusqlite::Connection) -> Result<i64, Error> {
    let version = conn.query_row("SELECT COALESCE(MAX(version), 0) FROM schema_migrations", [], |row| row.get(0))?;
    Ok(version)
}

/// Apply every migration newer than the recorded schema version.
///
/// Returns how many were applied.
pub async fn run(conn: &Connection) -> Result<usize, Error> {
    conn.call(|conn| -> Result<usize, Error> {
        conn.execute_batch(LEDGER)?;
        let current = schema_version(conn)?;

        let mut applied = 0;
        for migration in MIGRATIONS.iter().filter(|m| m.version > current) {
            let tx = conn.transaction()?;
            tx.execute_batch(migration.sql).map_err(|e| {
                Error::MigrationFailed(format!("{} ({}): {e}", migration.version, migration.name))
            })?;
            tx.execute(
                "INSERT INTO schema_migrations (version, name, applied_at) VALUES (?1, ?2, ?3)",
                params![migration.version, migration.name, chrono::Utc::now().to_rfc3339()],
            )?;
            tx.commit()?;

            tracing::debug!(version = migration.version, name = migration.name, "applied migration");
            applied += 1;
        }

        Ok(applied)
    })
    .await
    .map_err(Error::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_versions_strictly_increase() {
        assert!(MIGRATIONS.windows(2).all(|pair| pair[0].version < pair[1].version));
        assert_eq!(MIGRATIONS[0].version, 1);
    }

    #[tokio::test]
    async fn test_second_run_applies_nothing() {
        let conn = Connection::open_in_memory().await.unwrap();
        assert_eq!(run(&conn).await.unwrap(), MIGRATIONS.len());
        assert_eq!(run(&conn).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_storage_tables_and_ledger() {
        let conn = Connection::open_in_memory().await.unwrap();
        run(&conn).await.unwrap();

        let (tables, recorded): (i64, String) = conn
            .call(|conn| -> Result<(i64, String), rusqlite::Error> {
                let tables = conn.query_row(
                    "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name IN ('caches', 'entries')",
                    [],
                    |row| row.get(0),
                )?;
                let recorded =
                    conn.query_row("SELECT name FROM schema_migrations WHERE version = 1", [], |row| row.get(0))?;
                Ok((tables, recorded))
            })
            .await
            .unwrap();

        assert_eq!(tables, 2);
        assert_eq!(recorded, "cache_storage");
    }
}
