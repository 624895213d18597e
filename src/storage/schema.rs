//! Database schema definitions
//!
//! This module contains all SQL schema definitions for the Forum-Harvest database.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- Moderator activity log rows
CREATE TABLE IF NOT EXISTS activities (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    moderator TEXT NOT NULL,
    action TEXT NOT NULL,
    details TEXT NOT NULL,
    occurred_at TEXT NOT NULL,
    mods_scope TEXT NOT NULL,
    inserted_at TEXT NOT NULL
);

-- At most one row per (moderator, action, details, timestamp)
CREATE UNIQUE INDEX IF NOT EXISTS unique_activity_index
    ON activities(moderator, action, details, occurred_at);

CREATE INDEX IF NOT EXISTS idx_activities_occurred_at ON activities(occurred_at);
CREATE INDEX IF NOT EXISTS idx_activities_moderator ON activities(moderator);
"#;

/// Timestamp layout stored in `occurred_at`; sorts lexicographically
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Initializes the database schema
///
/// # Arguments
///
/// * `conn` - The database connection
///
/// # Returns
///
/// * `Ok(())` - Schema initialized successfully
/// * `Err(rusqlite::Error)` - Failed to initialize schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
