//! Crawler module for forum traversal and activity scraping
//!
//! This module contains the core crawling logic, including:
//! - Bounded-concurrency page fetching with retry logic
//! - Forum tree traversal and topic list pagination
//! - The moderator activity log scan
//! - Group roster resolution for the moderator scope
//! - Overall crawl coordination

mod activity;
mod coordinator;
mod fetcher;
mod forum_tree;
mod members;

pub use activity::{decide_row, extract_base_action, ActivityCrawler, RowDecision};
pub use coordinator::{
    run_activity_sync, run_topic_crawl, ActivitySyncSummary, TopicCrawlSummary,
};
pub use fetcher::{FetchError, FetchOutcome, PageFetcher};
pub use forum_tree::ForumTreeCrawler;
pub use members::{MembershipResolver, ScopeFilter};
