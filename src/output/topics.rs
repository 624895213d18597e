//! Per-subforum topic list files
//!
//! Each file holds one section per category:
//!
//! ```text
//!
//! [category]
//! [*][url=LINK]TITLE[/url]
//! ```
//!
//! with a blank line between sections.

use crate::model::TopicRecord;
use crate::output::collation::Collation;
use crate::output::OutputResult;
use std::collections::HashSet;
use std::fmt::Write as _;
use std::fs::OpenOptions;
use std::io::Write as _;
use std::path::{Path, PathBuf};

/// Drops topics whose title repeats an earlier one, ignoring case
pub fn dedup_topics(topics: Vec<TopicRecord>) -> Vec<TopicRecord> {
    let mut seen = HashSet::new();
    topics
        .into_iter()
        .filter(|topic| seen.insert(topic.title.to_lowercase()))
        .collect()
}

/// Sorts by category, then title, under the given collation
///
/// Strings with equal collation keys (e.g. differing only in digits) are
/// ordered by their raw text, so each category stays contiguous.
pub fn sort_topics(topics: &mut [TopicRecord], collation: &dyn Collation) {
    topics.sort_by_cached_key(|topic| {
        (
            collation.sort_key(&topic.subforum_category),
            topic.subforum_category.clone(),
            collation.sort_key(&topic.title),
            topic.title.clone(),
        )
    });
}

/// Renders sorted topics in the list file format
pub fn render_topics(topics: &[TopicRecord]) -> String {
    let mut out = String::new();
    let mut current: Option<&str> = None;

    for topic in topics {
        if current != Some(topic.subforum_category.as_str()) {
            if current.is_some() {
                out.push('\n');
            }
            let _ = write!(out, "\n[{}]\n", topic.subforum_category);
            current = Some(&topic.subforum_category);
        }
        let _ = writeln!(out, "[*][url={}]{}[/url]", topic.link, topic.title);
    }

    out
}

/// File name for a subforum's topic list
///
/// Lowercased, spaces become underscores, and characters unsafe in a file name
/// are replaced.
pub fn sanitize_filename(name: &str) -> String {
    let cleaned: String = name
        .trim()
        .to_lowercase()
        .chars()
        .map(|c| match c {
            ' ' => '_',
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    if cleaned.is_empty() || cleaned.chars().all(|c| c == '.') {
        "subforum".to_string()
    } else {
        cleaned
    }
}

/// Deduplicates, sorts and appends one subforum's topics to its file
///
/// # Arguments
///
/// * `dir` - Output directory, created if missing
/// * `subforum_name` - Top-level subforum title, used for the file name
/// * `topics` - Topics gathered by the subforum worker
/// * `collation` - Ordering for categories and titles
///
/// # Returns
///
/// Path of the written file
pub fn save_topics(
    dir: &Path,
    subforum_name: &str,
    topics: Vec<TopicRecord>,
    collation: &dyn Collation,
) -> OutputResult<PathBuf> {
    let mut topics = dedup_topics(topics);
    sort_topics(&mut topics, collation);

    std::fs::create_dir_all(dir)?;
    let path = dir.join(format!("{}.txt", sanitize_filename(subforum_name)));

    let mut file = OpenOptions::new().create(true).append(true).open(&path)?;
    file.write_all(render_topics(&topics).as_bytes())?;

    tracing::info!("{} topics saved to {}", topics.len(), path.display());
    Ok(path)
}
