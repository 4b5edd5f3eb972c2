//! Database schema migrations for studypod.
//!
//! Migrations are versioned and applied automatically when opening the database.
//! The `schema_version` table tracks the current migration version.

use rusqlite::{Connection, Result as SqliteResult};
use tracing::warn;

/// Current schema version.
pub const SCHEMA_VERSION: i32 = 2;

/// Apply all pending migrations to bring the database to the current schema version.
///
/// # Errors
/// Returns an error if migration fails.
pub fn migrate(conn: &Connection) -> SqliteResult<()> {
    create_schema_version_table(conn)?;

    let current_version = get_schema_version(conn);

    if current_version < 1 {
        migrate_v1(conn)?;
    }
    if current_version < 2 {
        migrate_v2(conn)?;
    }

    Ok(())
}

fn create_schema_version_table(conn: &Connection) -> SqliteResult<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY
        );",
    )
}

/// Current schema version, 0 for a fresh database.
pub fn get_schema_version(conn: &Connection) -> i32 {
    conn.query_row("SELECT version FROM schema_version", [], |row| row.get::<_, i32>(0))
        .unwrap_or_else(|e| {
            if !matches!(e, rusqlite::Error::QueryReturnedNoRows) {
                warn!(error = %e, "failed to read schema_version");
            }
            0
        })
}

fn set_schema_version(conn: &Connection, version: i32) -> SqliteResult<()> {
    conn.execute("DELETE FROM schema_version", [])?;
    conn.execute("INSERT INTO schema_version (version) VALUES (?1)", [version])?;
    Ok(())
}

/// Migration v1: users, pods, rosters and check-ins.
///
/// The unique constraint on check_ins is what serializes concurrent
/// submissions for the same learner, pod and day.
fn migrate_v1(conn: &Connection) -> SqliteResult<()> {
    let tx = conn.unchecked_transaction()?;
    tx.execute_batch(
        "CREATE TABLE IF NOT EXISTS users (
            id                  TEXT PRIMARY KEY,
            level               TEXT NOT NULL,
            exam_date           TEXT NOT NULL,
            utc_offset_minutes  INTEGER NOT NULL DEFAULT 0
        );

        CREATE TABLE IF NOT EXISTS pods (
            id                TEXT PRIMARY KEY,
            level             TEXT NOT NULL,
            exam_window_start TEXT NOT NULL,
            exam_window_end   TEXT NOT NULL,
            capacity          INTEGER NOT NULL,
            created_at        TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS pod_members (
            pod_id    TEXT NOT NULL REFERENCES pods(id) ON DELETE CASCADE,
            user_id   TEXT NOT NULL,
            exam_date TEXT NOT NULL,
            joined_at TEXT NOT NULL,
            PRIMARY KEY (pod_id, user_id)
        );

        CREATE TABLE IF NOT EXISTS check_ins (
            id            INTEGER PRIMARY KEY AUTOINCREMENT,
            pod_id        TEXT NOT NULL,
            user_id       TEXT NOT NULL,
            date          TEXT NOT NULL,
            study_minutes INTEGER NOT NULL,
            proof_type    TEXT NOT NULL,
            proof_content TEXT NOT NULL,
            mood          TEXT NOT NULL,
            created_at    TEXT NOT NULL,
            UNIQUE (user_id, pod_id, date)
        );",
    )?;
    set_schema_version(&tx, 1)?;
    tx.commit()
}

/// Migration v2: indexes for pod-wide and date-range queries.
fn migrate_v2(conn: &Connection) -> SqliteResult<()> {
    let tx = conn.unchecked_transaction()?;
    tx.execute_batch(
        "CREATE INDEX IF NOT EXISTS idx_check_ins_pod_date ON check_ins(pod_id, date);
         CREATE INDEX IF NOT EXISTS idx_check_ins_user_date ON check_ins(user_id, date);
         CREATE INDEX IF NOT EXISTS idx_pod_members_user ON pod_members(user_id);",
    )?;
    set_schema_version(&tx, 2)?;
    tx.commit()
}
