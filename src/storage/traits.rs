//! Storage traits and error types
//!
//! This module defines the trait interface for activity stores and
//! associated error types.

use crate::model::{ActivityRecord, DateRange, ModScope};
use chrono::NaiveDate;
use std::collections::BTreeSet;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid stored timestamp '{0}'")]
    InvalidTimestamp(String),

    #[error("Invalid stored scope '{0}'")]
    InvalidScope(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Selects stored activity rows; unset fields match everything
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActivityFilter {
    /// Rows whose timestamp falls inside these dates (whole days)
    pub range: Option<DateRange>,
    pub moderator: Option<String>,
    pub action: Option<String>,
    pub scope: Option<ModScope>,
}

impl ActivityFilter {
    /// Rows inside a date range
    pub fn within(range: DateRange) -> Self {
        Self {
            range: Some(range),
            ..Self::default()
        }
    }
}

/// An activity row as persisted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredActivity {
    pub id: i64,
    pub record: ActivityRecord,
    /// Scope of the crawl that first inserted the row
    pub mods_scope: ModScope,
    pub inserted_at: String,
}

/// Trait for activity store implementations
///
/// The `(moderator, action, details, timestamp)` tuple is unique: `upsert`
/// inserts a row only when the tuple is absent and never modifies an existing row.
pub trait ActivityStore {
    /// Inserts the record unless its tuple is already stored
    ///
    /// # Arguments
    ///
    /// * `record` - The activity row
    /// * `scope` - Scope of the crawl, stored only on insert
    ///
    /// # Returns
    ///
    /// `true` if a row was inserted, `false` if the tuple already existed
    fn upsert(&mut self, record: &ActivityRecord, scope: ModScope) -> StorageResult<bool>;

    /// Upserts many records, returning how many were inserted
    fn upsert_all(&mut self, records: &[ActivityRecord], scope: ModScope) -> StorageResult<usize> {
        let mut inserted = 0;
        for record in records {
            if self.upsert(record, scope)? {
                inserted += 1;
            }
        }
        Ok(inserted)
    }

    /// Rows matching the filter, newest first
    fn find(&self, filter: &ActivityFilter) -> StorageResult<Vec<StoredActivity>>;

    /// Number of rows matching the filter
    fn count(&self, filter: &ActivityFilter) -> StorageResult<u64>;

    /// Distinct calendar dates inside `range` with at least one stored row
    fn covered_dates(&self, range: &DateRange) -> StorageResult<BTreeSet<NaiveDate>>;
}
