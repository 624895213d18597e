//! Incremental reconciliation against the activity store
//!
//! A requested window is reduced to the dates the store has no rows for, grouped
//! into maximal runs of consecutive days. Only those runs are crawled.

use crate::model::DateRange;
use crate::storage::{ActivityStore, StorageResult};
use chrono::NaiveDate;
use std::collections::BTreeSet;

/// Dates of `requested` not in `covered`, coalesced into contiguous ranges
///
/// # Arguments
///
/// * `requested` - The inclusive window asked for
/// * `covered` - Dates with at least one stored row; dates outside the window are ignored
///
/// # Returns
///
/// Disjoint ranges in ascending order; empty when the window is fully covered
pub fn coalesce_missing(requested: &DateRange, covered: &BTreeSet<NaiveDate>) -> Vec<DateRange> {
    let mut ranges = Vec::new();
    let mut run: Option<(NaiveDate, NaiveDate)> = None;

    for day in requested.days() {
        if covered.contains(&day) {
            if let Some((start, end)) = run.take() {
                ranges.extend(DateRange::new(start, end));
            }
            continue;
        }

        run = match run {
            Some((start, _)) => Some((start, day)),
            None => Some((day, day)),
        };
    }

    if let Some((start, end)) = run {
        ranges.extend(DateRange::new(start, end));
    }

    ranges
}

/// Missing date ranges of a request, according to the store
pub fn missing_ranges<S: ActivityStore + ?Sized>(
    store: &S,
    requested: &DateRange,
) -> StorageResult<Vec<DateRange>> {
    let covered = store.covered_dates(requested)?;
    let missing = coalesce_missing(requested, &covered);

    tracing::debug!(
        "{} of {} days covered in {}; {} missing range(s)",
        covered.len(),
        requested.num_days(),
        requested,
        missing.len()
    );
    Ok(missing)
}
