//! Versioned schema upgrades.
//!
//! The base schema from [`SCHEMA_STATEMENTS`] is always created with
//! `IF NOT EXISTS`. Anything added later goes into `MIGRATIONS` as a new
//! numbered step; the highest applied step is kept under `schema_version` in
//! the `metadata` table.

use rusqlite::{Connection, OptionalExtension};
use tracing::{debug, info};

use crate::error::{Error, Result};

use super::schema::SCHEMA_STATEMENTS;

/// One schema upgrade step.
#[derive(Debug, Clone, Copy)]
struct Migration {
    version: i32,
    description: &'static str,
    sql: &'static str,
}

/// Upgrade steps, in version order.
const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        description: "base schema",
        sql: "",
    },
    Migration {
        version: 2,
        description: "index attendance by child",
        sql: "CREATE INDEX IF NOT EXISTS idx_attendance_child ON attendance(child_id);",
    },
];

/// Schema version a fully migrated database reports.
pub const CURRENT_VERSION: i32 = 2;

const VERSION_KEY: &str = "schema_version";

/// Create the base schema and apply every pending migration.
///
/// Safe to call on every open.
///
/// # Errors
///
/// Returns an error if a statement fails or the stored version is not a
/// number.
pub fn initialize_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;

    for statement in SCHEMA_STATEMENTS {
        conn.execute(statement, [])?;
    }

    let applied = stored_version(conn)?;
    if applied >= CURRENT_VERSION {
        debug!(version = applied, "Schema up to date");
        return Ok(());
    }

    for migration in MIGRATIONS.iter().filter(|m| m.version > applied) {
        apply(conn, migration)?;
    }
    Ok(())
}

fn stored_version(conn: &Connection) -> Result<i32> {
    let stored: Option<String> = conn
        .query_row(
            "SELECT value FROM metadata WHERE key = ?1",
            [VERSION_KEY],
            |row| row.get(0),
        )
        .optional()?;

    match stored {
        None => Ok(0),
        Some(value) => value.parse().map_err(|_| Error::DatabaseMigration {
            message: format!("stored schema version '{value}' is not a number"),
        }),
    }
}

/// Run one step and record its version in the same transaction.
fn apply(conn: &Connection, migration: &Migration) -> Result<()> {
    let tx = conn.unchecked_transaction()?;
    if !migration.sql.is_empty() {
        tx.execute_batch(migration.sql)
            .map_err(|err| Error::DatabaseMigration {
                message: format!(
                    "step {} ({}) failed: {err}",
                    migration.version, migration.description
                ),
            })?;
    }
    tx.execute(
        "INSERT OR REPLACE INTO metadata (key, value) VALUES (?1, ?2)",
        (VERSION_KEY, migration.version.to_string()),
    )?;
    tx.commit()?;

    info!(
        version = migration.version,
        description = migration.description,
        "Applied schema migration"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fresh() -> Connection {
        Connection::open_in_memory().expect("failed to create in-memory database")
    }

    fn count_in_master(conn: &Connection, kind: &str, name: &str) -> i32 {
        conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = ?1 AND name = ?2",
            [kind, name],
            |row| row.get(0),
        )
        .unwrap()
    }

    #[test]
    fn test_creates_every_table() {
        let conn = fresh();
        initialize_schema(&conn).unwrap();

        for table in ["children", "events", "attendance", "achievements", "notes", "metadata"] {
            assert_eq!(count_in_master(&conn, "table", table), 1, "missing table {table}");
        }
    }

    #[test]
    fn test_fresh_database_reaches_current_version() {
        let conn = fresh();
        initialize_schema(&conn).unwrap();
        assert_eq!(stored_version(&conn).unwrap(), CURRENT_VERSION);
    }

    #[test]
    fn test_current_version_matches_last_step() {
        assert_eq!(MIGRATIONS.last().map(|m| m.version), Some(CURRENT_VERSION));
        assert!(MIGRATIONS.windows(2).all(|w| w[0].version < w[1].version));
    }

    #[test]
    fn test_reinitialize_is_harmless() {
        let conn = fresh();
        initialize_schema(&conn).unwrap();
        initialize_schema(&conn).unwrap();
        assert_eq!(stored_version(&conn).unwrap(), CURRENT_VERSION);
    }

    #[test]
    fn test_upgrade_from_v1_adds_child_index() {
        let conn = fresh();
        for statement in SCHEMA_STATEMENTS {
            conn.execute(statement, []).unwrap();
        }
        conn.execute(
            "INSERT INTO metadata (key, value) VALUES ('schema_version', '1')",
            [],
        )
        .unwrap();
        assert_eq!(count_in_master(&conn, "index", "idx_attendance_child"), 0);

        initialize_schema(&conn).unwrap();

        assert_eq!(count_in_master(&conn, "index", "idx_attendance_child"), 1);
        assert_eq!(stored_version(&conn).unwrap(), 2);
    }

    #[test]
    fn test_missing_version_reads_as_zero() {
        let conn = fresh();
        conn.execute(
            "CREATE TABLE metadata (key TEXT PRIMARY KEY, value TEXT NOT NULL)",
            [],
        )
        .unwrap();
        assert_eq!(stored_version(&conn).unwrap(), 0);
    }

    #[test]
    fn test_garbage_version_is_rejected() {
        let conn = fresh();
        conn.execute(
            "CREATE TABLE metadata (key TEXT PRIMARY KEY, value TEXT NOT NULL)",
            [],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO metadata (key, value) VALUES ('schema_version', 'two')",
            [],
        )
        .unwrap();

        let err = stored_version(&conn).unwrap_err();
        assert!(matches!(err, Error::DatabaseMigration { .. }));
        assert!(err.to_string().contains("'two'"));
    }

    #[test]
    fn test_indexes_present() {
        let conn = fresh();
        initialize_schema(&conn).unwrap();

        for index in [
            "idx_events_starts_at",
            "idx_attendance_event",
            "idx_attendance_child",
            "idx_notes_remind_at",
        ] {
            assert_eq!(count_in_master(&conn, "index", index), 1, "missing index {index}");
        }
    }
}
