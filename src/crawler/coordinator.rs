//! Crawl coordination - the two top-level workflows
//!
//! - The topic crawl lists subforums once, then runs one worker task per
//!   subforum. Each worker owns its HTTP client, cookie jar, login and fetch
//!   limiter, and writes its own topic file. The files are archived at the end.
//! - The activity sync asks the store which days of the requested window are
//!   missing, scrapes only those, filters by moderator scope and upserts.

use crate::config::Config;
use crate::crawler::activity::ActivityCrawler;
use crate::crawler::fetcher::PageFetcher;
use crate::crawler::forum_tree::ForumTreeCrawler;
use crate::crawler::members::MembershipResolver;
use crate::model::{DateRange, ModScope};
use crate::output::{create_tar_archive, save_topics, wipe_output_dir, AlphabetCollation, Collation};
use crate::parser::ForumLink;
use crate::reconcile::missing_ranges;
use crate::retry::RetryPolicy;
use crate::session::{build_http_client, ForumSession, HeaderPool};
use crate::storage::ActivityStore;
use crate::HarvestError;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::Instrument;

/// Result of a topic crawl
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TopicCrawlSummary {
    /// Subforums found on the main forum page
    pub subforums: usize,
    /// Topics collected across all workers, before deduplication
    pub topics: usize,
    /// Topic files written
    pub files: Vec<PathBuf>,
    pub archive: PathBuf,
}

/// Result of an activity sync
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivitySyncSummary {
    pub requested: DateRange,
    /// Ranges that had to be crawled; empty when the store already covered the window
    pub missing: Vec<DateRange>,
    /// Rows inside the crawled ranges
    pub scraped: usize,
    /// Rows left after the moderator scope filter
    pub kept: usize,
    /// Rows newly written to the store
    pub inserted: usize,
}

impl ActivitySyncSummary {
    fn covered(requested: DateRange) -> Self {
        Self {
            requested,
            missing: Vec::new(),
            scraped: 0,
            kept: 0,
            inserted: 0,
        }
    }

    /// Kept rows the store already had
    pub fn duplicates(&self) -> usize {
        self.kept - self.inserted
    }
}

/// Prefetches the header pool through the configured proxy
async fn prefetch_headers(config: &Config) -> Result<HeaderPool, HarvestError> {
    let client = build_http_client(&config.network)?;
    Ok(HeaderPool::prefetch(
        &client,
        config.network.header_api_url.as_deref(),
        config.network.header_count,
    )
    .await)
}

/// Opens a session on a fresh client, logging in when asked
async fn open_session(
    config: &Config,
    headers: HeaderPool,
    authenticate: bool,
) -> Result<ForumSession, HarvestError> {
    let client = build_http_client(&config.network)?;
    if authenticate {
        Ok(ForumSession::login(client, headers, config).await?)
    } else {
        Ok(ForumSession::anonymous(client, headers, config.base_url()?))
    }
}

fn page_fetcher(session: ForumSession, config: &Config, excluded_urls: Vec<String>) -> PageFetcher {
    PageFetcher::new(
        session,
        config.network.max_concurrent_requests,
        excluded_urls,
        RetryPolicy::fetch(&config.retry),
    )
}

/// One subforum worker: own session, own limiter, own topic file
async fn crawl_subforum_worker(
    config: Arc<Config>,
    headers: HeaderPool,
    subforum: ForumLink,
    collation: Arc<dyn Collation>,
) -> Result<(usize, PathBuf), HarvestError> {
    let session = open_session(&config, headers, config.topics.authenticate).await?;
    let crawler = ForumTreeCrawler::new(
        page_fetcher(session, &config, config.topics.excluded_urls.clone()),
        Arc::new(config.topics.clone()),
    );

    let topics = crawler.crawl_subforum(&subforum).await;
    let count = topics.len();
    let path = save_topics(
        &PathBuf::from(&config.topics.output_dir),
        &subforum.title,
        topics,
        collation.as_ref(),
    )?;
    Ok((count, path))
}

/// Crawls the whole forum tree and archives the topic files
///
/// # Arguments
///
/// * `config` - The full configuration
///
/// # Returns
///
/// * `Ok(TopicCrawlSummary)` - Every worker finished and the archive was written
/// * `Err(HarvestError)` - The main page failed, a worker could not log in or
///   write its file, or the archive failed. Other workers still run to completion.
pub async fn run_topic_crawl(config: Arc<Config>) -> Result<TopicCrawlSummary, HarvestError> {
    let output_dir = PathBuf::from(&config.topics.output_dir);
    wipe_output_dir(&output_dir)?;

    let headers = prefetch_headers(&config).await?;
    tracing::info!("Header pool ready with {} identities", headers.len());

    let session = open_session(&config, headers.clone(), config.topics.authenticate).await?;
    let index = ForumTreeCrawler::new(
        page_fetcher(session, &config, config.topics.excluded_urls.clone()),
        Arc::new(config.topics.clone()),
    );
    let main_url = config.forum_url(&config.forum.main_forum_path)?;
    let subforums = index.extract_subforum_links(&main_url).await?;

    let parallelism = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    let limit = parallelism.min(subforums.len()).max(1);
    tracing::info!(
        "Crawling {} subforums with up to {} workers",
        subforums.len(),
        limit
    );

    let collation: Arc<dyn Collation> =
        Arc::new(AlphabetCollation::new(&config.topics.collation_alphabet));
    let mut summary = TopicCrawlSummary {
        subforums: subforums.len(),
        ..TopicCrawlSummary::default()
    };
    let mut first_error = None;
    let mut pending = subforums.into_iter();
    let mut workers = JoinSet::new();

    loop {
        while workers.len() < limit {
            let Some(subforum) = pending.next() else {
                break;
            };
            let span = tracing::info_span!("subforum", title = %subforum.title);
            workers.spawn(
                crawl_subforum_worker(
                    Arc::clone(&config),
                    headers.clone(),
                    subforum,
                    Arc::clone(&collation),
                )
                .instrument(span),
            );
        }

        let Some(joined) = workers.join_next().await else {
            break;
        };
        match joined.map_err(HarvestError::from).and_then(|result| result) {
            Ok((count, path)) => {
                summary.topics += count;
                summary.files.push(path);
            }
            Err(e) => {
                tracing::error!("Subforum worker failed: {}", e);
                first_error.get_or_insert(e);
            }
        }
    }

    if let Some(e) = first_error {
        return Err(e);
    }

    let archive = PathBuf::from(&config.topics.archive_path);
    create_tar_archive(&output_dir, &archive)?;
    summary.archive = archive;

    tracing::info!(
        "Topic crawl complete: {} topics in {} files",
        summary.topics,
        summary.files.len()
    );
    Ok(summary)
}

/// Brings the store up to date for a date window
///
/// Only the days without stored rows are scraped. Scraped rows are filtered
/// by moderator scope, then upserted; rows already stored are left untouched.
///
/// # Arguments
///
/// * `config` - The full configuration
/// * `requested` - The inclusive date window
/// * `scope` - Which moderators to keep
/// * `store` - The activity store, consulted before and written after the crawl
pub async fn run_activity_sync<S: ActivityStore + ?Sized>(
    config: &Config,
    requested: DateRange,
    scope: ModScope,
    store: &mut S,
) -> Result<ActivitySyncSummary, HarvestError> {
    let missing = missing_ranges(&*store, &requested)?;
    if missing.is_empty() {
        tracing::info!("Activity for {} is already stored, nothing to crawl", requested);
        return Ok(ActivitySyncSummary::covered(requested));
    }
    for range in &missing {
        tracing::info!("Missing activity range: {}", range);
    }

    let headers = prefetch_headers(config).await?;
    let session = open_session(config, headers, true).await?;

    let resolver = MembershipResolver::new(
        session.clone(),
        Arc::new(config.membership.clone()),
        RetryPolicy::roster(&config.retry),
    );
    let filter = resolver.scope_filter(scope).await?;

    let crawler = ActivityCrawler::new(
        page_fetcher(session, config, Vec::new()),
        Arc::new(config.activity.clone()),
    )?;

    let mut summary = ActivitySyncSummary {
        missing: missing.clone(),
        ..ActivitySyncSummary::covered(requested)
    };

    for range in &missing {
        let records = crawler.scrape(range).await;
        summary.scraped += records.len();

        let kept = filter.apply(records);
        summary.kept += kept.len();

        let inserted = store.upsert_all(&kept, scope)?;
        summary.inserted += inserted;
        tracing::info!(
            "{}: {} rows kept, {} new, {} already stored",
            range,
            kept.len(),
            inserted,
            kept.len() - inserted
        );
    }

    Ok(summary)
}
