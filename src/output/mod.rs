//! Output module for topic files, archives and activity reports
//!
//! This module handles:
//! - Writing deduplicated, collated topic lists per subforum
//! - Bundling the topic files into a tar archive
//! - Summarizing stored moderator activity

mod archive;
mod collation;
pub mod stats;
mod topics;

pub use archive::{create_tar_archive, wipe_output_dir, ARCHIVE_ROOT};
pub use collation::{AlphabetCollation, Collation};
pub use stats::{load_summary, print_summary, ActivitySummary};
pub use topics::{dedup_topics, render_topics, sanitize_filename, save_topics, sort_topics};

use thiserror::Error;

/// Polish alphabet, in collation order
pub const POLISH_ALPHABET: &str = "aąbcćdeęfghijklłmnńoópqrsśtuvwxyzźż";

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;
