//! Bootstrap schema for the tracker database.

use rusqlite::{Connection, Result};

pub const CURRENT_SCHEMA_VERSION: i32 = 1;

/// Tables for projects and their stories.
///
/// Dates are ISO-8601 `TEXT` (`YYYY-MM-DD`), so text order is date order.
pub const SCHEMA_SQL: &str = r"
    CREATE TABLE IF NOT EXISTS projects (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS stories (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        project_id INTEGER NOT NULL,
        title TEXT NOT NULL DEFAULT '',
        requester TEXT NOT NULL DEFAULT '',
        points INTEGER NOT NULL DEFAULT 0,
        state TEXT NOT NULL DEFAULT 'unstarted',
        rejected_date TEXT,
        FOREIGN KEY (project_id) REFERENCES projects(id) ON DELETE CASCADE
    );

    CREATE INDEX IF NOT EXISTS idx_stories_project ON stories(project_id);
    CREATE INDEX IF NOT EXISTS idx_stories_project_rejected
        ON stories(project_id, rejected_date);
";

/// Apply the schema to the database.
///
/// Idempotent: every statement is `IF NOT EXISTS`.
///
/// # Errors
///
/// Returns an error if the SQL execution fails.
pub fn apply_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.execute_batch(SCHEMA_SQL)?;
    conn.pragma_update(None, "user_version", CURRENT_SCHEMA_VERSION)?;
    Ok(())
}
