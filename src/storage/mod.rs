//! Storage module for persisting moderator activity
//!
//! This module handles all database operations for the activity crawler:
//! - SQLite database initialization and schema management
//! - Idempotent upserts keyed on the activity tuple
//! - Coverage queries used to skip dates already stored

mod schema;
mod sqlite;
mod traits;

pub use schema::TIMESTAMP_FORMAT;
pub use sqlite::SqliteStore;
pub use traits::{ActivityFilter, ActivityStore, StorageError, StorageResult, StoredActivity};

use std::path::Path;

/// Initializes or opens the activity database
///
/// # Arguments
///
/// * `path` - Path to the SQLite database file
///
/// # Returns
///
/// * `Ok(SqliteStore)` - Successfully initialized storage
/// * `Err(StorageError)` - Failed to initialize storage
pub fn open_store(path: &Path) -> StorageResult<SqliteStore> {
    tracing::debug!("Opening activity database at {}", path.display());
    SqliteStore::new(path)
}
