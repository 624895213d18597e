//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the ActivityStore trait.

use crate::model::{ActivityRecord, DateRange, ModScope};
use crate::storage::schema::{initialize_schema, TIMESTAMP_FORMAT};
use crate::storage::traits::{
    ActivityFilter, ActivityStore, StorageError, StorageResult, StoredActivity,
};
use chrono::{NaiveDate, NaiveDateTime, Utc};
use rusqlite::{params, params_from_iter, Connection};
use std::collections::BTreeSet;
use std::path::Path;

const INSERT_ACTIVITY_SQL: &str = "
    INSERT INTO activities (moderator, action, details, occurred_at, mods_scope, inserted_at)
    VALUES (?1, ?2, ?3, ?4, ?5, ?6)
    ON CONFLICT(moderator, action, details, occurred_at) DO NOTHING
";

/// SQLite activity store
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Opens or creates the database file
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file; missing parent directories are created
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStore)` - Successfully opened/created database
    /// * `Err(StorageError)` - Failed to open database
    pub fn new(path: &Path) -> StorageResult<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
            PRAGMA mmap_size = 268435456;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database
    pub fn open_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }
}

/// Builds the WHERE clause and its positional values for a filter
fn where_clause(filter: &ActivityFilter) -> (String, Vec<String>) {
    let mut clauses = Vec::new();
    let mut values = Vec::new();

    if let Some(range) = &filter.range {
        clauses.push("occurred_at BETWEEN ? AND ?");
        values.push(range.window_start().format(TIMESTAMP_FORMAT).to_string());
        values.push(range.window_end().format(TIMESTAMP_FORMAT).to_string());
    }
    if let Some(moderator) = &filter.moderator {
        clauses.push("moderator = ?");
        values.push(moderator.clone());
    }
    if let Some(action) = &filter.action {
        clauses.push("action = ?");
        values.push(action.clone());
    }
    if let Some(scope) = filter.scope {
        clauses.push("mods_scope = ?");
        values.push(scope.as_str().to_string());
    }

    if clauses.is_empty() {
        (String::new(), values)
    } else {
        (format!(" WHERE {}", clauses.join(" AND ")), values)
    }
}

fn insert_activity(
    conn: &Connection,
    record: &ActivityRecord,
    scope: ModScope,
) -> StorageResult<bool> {
    let changed = conn.execute(
        INSERT_ACTIVITY_SQL,
        params![
            record.moderator,
            record.action,
            record.details,
            record.timestamp.format(TIMESTAMP_FORMAT).to_string(),
            scope.as_str(),
            Utc::now().to_rfc3339(),
        ],
    )?;
    Ok(changed > 0)
}

type ActivityRow = (i64, String, String, String, String, String, String);

fn to_stored(row: ActivityRow) -> StorageResult<StoredActivity> {
    let (id, moderator, action, details, occurred_at, mods_scope, inserted_at) = row;

    let timestamp = NaiveDateTime::parse_from_str(&occurred_at, TIMESTAMP_FORMAT)
        .map_err(|_| StorageError::InvalidTimestamp(occurred_at.clone()))?;
    let mods_scope = mods_scope
        .parse::<ModScope>()
        .map_err(|_| StorageError::InvalidScope(mods_scope.clone()))?;

    Ok(StoredActivity {
        id,
        record: ActivityRecord {
            moderator,
            action,
            details,
            timestamp,
        },
        mods_scope,
        inserted_at,
    })
}

impl ActivityStore for SqliteStore {
    fn upsert(&mut self, record: &ActivityRecord, scope: ModScope) -> StorageResult<bool> {
        insert_activity(&self.conn, record, scope)
    }

    fn upsert_all(&mut self, records: &[ActivityRecord], scope: ModScope) -> StorageResult<usize> {
        let tx = self.conn.transaction()?;
        let mut inserted = 0;
        for record in records {
            if insert_activity(&tx, record, scope)? {
                inserted += 1;
            }
        }
        tx.commit()?;
        Ok(inserted)
    }

    fn find(&self, filter: &ActivityFilter) -> StorageResult<Vec<StoredActivity>> {
        let (clause, values) = where_clause(filter);
        let sql = format!(
            "SELECT id, moderator, action, details, occurred_at, mods_scope, inserted_at
             FROM activities{} ORDER BY occurred_at DESC, id ASC",
            clause
        );

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params_from_iter(values.iter()), |row| {
                Ok((
                    row.get(0)?,
                    row.get(1)?,
                    row.get(2)?,
                    row.get(3)?,
                    row.get(4)?,
                    row.get(5)?,
                    row.get(6)?,
                ))
            })?
            .collect::<Result<Vec<ActivityRow>, _>>()?;

        rows.into_iter().map(to_stored).collect()
    }

    fn count(&self, filter: &ActivityFilter) -> StorageResult<u64> {
        let (clause, values) = where_clause(filter);
        let sql = format!("SELECT COUNT(*) FROM activities{}", clause);
        let count: i64 = self
            .conn
            .query_row(&sql, params_from_iter(values.iter()), |row| row.get(0))?;
        Ok(count.max(0) as u64)
    }

    fn covered_dates(&self, range: &DateRange) -> StorageResult<BTreeSet<NaiveDate>> {
        let mut stmt = self.conn.prepare(
            "SELECT DISTINCT substr(occurred_at, 1, 10) FROM activities
             WHERE occurred_at BETWEEN ?1 AND ?2",
        )?;

        let days = stmt
            .query_map(
                params![
                    range.window_start().format(TIMESTAMP_FORMAT).to_string(),
                    range.window_end().format(TIMESTAMP_FORMAT).to_string(),
                ],
                |row| row.get::<_, String>(0),
            )?
            .collect::<Result<Vec<_>, _>>()?;

        days.into_iter()
            .map(|day| {
                NaiveDate::parse_from_str(&day, "%Y-%m-%d")
                    .map_err(|_| StorageError::InvalidTimestamp(day.clone()))
            })
            .collect()
    }
}
