//! Activity statistics from the store
//!
//! This module provides functionality for summarizing stored moderator
//! activity and displaying it on the console.

use crate::model::ActivityRecord;
use crate::storage::{ActivityFilter, ActivityStore, StorageResult};
use std::collections::HashMap;

/// Counts of stored activity rows
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActivitySummary {
    /// Total number of rows summarized
    pub total: u64,

    /// Rows per moderator, largest first
    pub by_moderator: Vec<(String, u64)>,

    /// Rows per action, largest first
    pub by_action: Vec<(String, u64)>,

    /// Rows per (action, moderator), largest first
    pub by_action_moderator: Vec<((String, String), u64)>,
}

/// Sorts counts descending, ties by key
fn ranked<K: Ord>(counts: HashMap<K, u64>) -> Vec<(K, u64)> {
    let mut ranked: Vec<_> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked
}

impl ActivitySummary {
    pub fn from_records<'a>(records: impl IntoIterator<Item = &'a ActivityRecord>) -> Self {
        let mut total = 0;
        let mut by_moderator: HashMap<String, u64> = HashMap::new();
        let mut by_action: HashMap<String, u64> = HashMap::new();
        let mut by_action_moderator: HashMap<(String, String), u64> = HashMap::new();

        for record in records {
            total += 1;
            *by_moderator.entry(record.moderator.clone()).or_default() += 1;
            *by_action.entry(record.action.clone()).or_default() += 1;
            *by_action_moderator
                .entry((record.action.clone(), record.moderator.clone()))
                .or_default() += 1;
        }

        Self {
            total,
            by_moderator: ranked(by_moderator),
            by_action: ranked(by_action),
            by_action_moderator: ranked(by_action_moderator),
        }
    }
}

/// Loads a summary of the rows matching `filter`
///
/// # Arguments
///
/// * `store` - The activity store to query
/// * `filter` - Which rows to summarize
///
/// # Returns
///
/// * `Ok(ActivitySummary)` - Successfully loaded summary
/// * `Err(StorageError)` - Failed to query the store
pub fn load_summary<S: ActivityStore + ?Sized>(
    store: &S,
    filter: &ActivityFilter,
) -> StorageResult<ActivitySummary> {
    let rows = store.find(filter)?;
    Ok(ActivitySummary::from_records(rows.iter().map(|row| &row.record)))
}

/// Prints a summary to stdout in a formatted manner
///
/// # Arguments
///
/// * `summary` - The summary to display
/// * `title` - Heading, typically the date window
pub fn print_summary(summary: &ActivitySummary, title: &str) {
    println!("=== Moderator Activity: {} ===\n", title);

    if summary.total == 0 {
        println!("No activity recorded.");
        return;
    }

    println!("Total actions: {}", summary.total);
    println!();

    println!("By moderator:");
    for (moderator, count) in &summary.by_moderator {
        let percentage = (*count as f64 / summary.total as f64) * 100.0;
        println!("  {}: {} ({:.1}%)", moderator, count, percentage);
    }
    println!();

    println!("By action:");
    for (action, count) in &summary.by_action {
        println!("  {}: {}", action, count);
    }
    println!();

    println!("By action and moderator:");
    for ((action, moderator), count) in &summary.by_action_moderator {
        println!("  {} / {}: {}", action, moderator, count);
    }
}
