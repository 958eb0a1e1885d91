//! Versioned schema migrations for the local store.
//!
//! Each migration runs in its own transaction and is recorded in the
//! `schema_migrations` table, so reopening an up-to-date database is a no-op.

use rusqlite::Connection;

use crate::storage::{StorageError, StorageResult};

/// Schema version the code expects after all migrations ran.
pub const CURRENT_SCHEMA_VERSION: i32 = 2;

const INIT_SCHEMA: &str = include_str!("schema.sql");

#[derive(Debug, Clone)]
pub struct Migration {
    pub version: i32,
    pub name: &'static str,
    pub sql: String,
}

impl Migration {
    fn new(version: i32, name: &'static str, sql: impl Into<String>) -> Self {
        Self {
            version,
            name,
            sql: sql.into(),
        }
    }
}

/// All migrations, ordered by version.
pub fn get_migrations() -> Vec<Migration> {
    vec![
        Migration::new(1, "initial collections", INIT_SCHEMA),
        // The IndexedDB predecessor indexed media items by subreddit and
        // lessons by their media item.
        Migration::new(
            2,
            "secondary indexes",
            r#"
            CREATE INDEX IF NOT EXISTS idx_media_item_subreddit
                ON media_item(origin_subreddit);

            CREATE INDEX IF NOT EXISTS idx_lesson_media_item
                ON lesson(media_item_id);

            CREATE INDEX IF NOT EXISTS idx_lesson_created_at
                ON lesson(created_at);
            "#,
        ),
    ]
}

fn ensure_migrations_table(conn: &Connection) -> StorageResult<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS schema_migrations (
            version    INTEGER PRIMARY KEY,
            name       TEXT NOT NULL,
            applied_at INTEGER NOT NULL
        );
        "#,
    )
    .map_err(|e| StorageError::Migration(format!("failed to create migrations table: {e}")))?;

    Ok(())
}

fn applied_versions(conn: &Connection) -> StorageResult<Vec<i32>> {
    let mut stmt = conn.prepare("SELECT version FROM schema_migrations ORDER BY version")?;
    let versions = stmt
        .query_map([], |row| row.get(0))?
        .collect::<Result<Vec<i32>, _>>()?;
    Ok(versions)
}

fn record_migration(conn: &Connection, migration: &Migration) -> StorageResult<()> {
    conn.execute(
        "INSERT INTO schema_migrations (version, name, applied_at) VALUES (?1, ?2, ?3)",
        rusqlite::params![
            migration.version,
            migration.name,
            memelingo_schema::now_millis()
        ],
    )?;
    Ok(())
}

/// Runs every migration that has not been applied yet and returns the final
/// schema version.
pub fn run_migrations(conn: &Connection) -> StorageResult<i32> {
    ensure_migrations_table(conn)?;

    let applied = applied_versions(conn)?;
    let mut final_version = applied.iter().copied().max().unwrap_or(0);

    for migration in get_migrations() {
        if applied.contains(&migration.version) {
            continue;
        }

        log::info!("applying store migration v{}: {}", migration.version, migration.name);
        execute_in_transaction(conn, &migration)?;
        final_version = migration.version;
    }

    Ok(final_version)
}

fn execute_in_transaction(conn: &Connection, migration: &Migration) -> StorageResult<()> {
    conn.execute("BEGIN IMMEDIATE", [])?;

    match conn.execute_batch(&migration.sql) {
        Ok(()) => {
            if let Err(e) = record_migration(conn, migration) {
                conn.execute("ROLLBACK", []).ok();
                return Err(e);
            }
            conn.execute("COMMIT", [])?;
            Ok(())
        }
        Err(e) => {
            conn.execute("ROLLBACK", []).ok();
            Err(StorageError::Migration(format!(
                "migration v{} failed: {e}",
                migration.version
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn migrations_are_ordered_and_end_at_current_version() {
        let migrations = get_migrations();
        let versions: Vec<i32> = migrations.iter().map(|m| m.version).collect();
        let mut sorted = versions.clone();
        sorted.sort_unstable();
        assert_eq!(versions, sorted);
        assert_eq!(versions.last().copied(), Some(CURRENT_SCHEMA_VERSION));
    }

    #[test]
    fn run_migrations_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        assert_eq!(run_migrations(&conn).unwrap(), CURRENT_SCHEMA_VERSION);
        assert_eq!(run_migrations(&conn).unwrap(), CURRENT_SCHEMA_VERSION);

        let recorded: i32 = conn
            .query_row("SELECT COUNT(*) FROM schema_migrations", [], |row| row.get(0))
            .unwrap();
        assert_eq!(recorded as usize, get_migrations().len());
    }
}
