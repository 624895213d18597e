//! Configuration module for Forum-Harvest
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use forum_harvest::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("harvest.toml")).unwrap();
//! println!("Crawling {}", config.forum.base_url);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    ActivityConfig, Config, CredentialsConfig, EmptyLaterPage, EmptyRosterPolicy, ForumConfig,
    MembershipConfig, NetworkConfig, RetryConfig, StorageConfig, TopicsConfig,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
