//! Forum tree traversal
//!
//! The tree has three levels below the main index:
//! - subforums, listed on the main forum page
//! - sub-subforums, listed on each subforum page
//! - topic lists, paginated through a "next" link
//!
//! Topics living directly under a subforum are filed under a synthetic general
//! category. Failures below the main index only cut their own branch short.

use crate::config::TopicsConfig;
use crate::crawler::fetcher::{FetchOutcome, PageFetcher};
use crate::model::TopicRecord;
use crate::parser::{parse_forum_links, parse_topic_list, ForumLink};
use crate::HarvestError;
use std::collections::HashSet;
use std::sync::Arc;
use url::Url;

/// Walks one forum tree with a single session
#[derive(Debug, Clone)]
pub struct ForumTreeCrawler {
    fetcher: PageFetcher,
    settings: Arc<TopicsConfig>,
}

impl ForumTreeCrawler {
    pub fn new(fetcher: PageFetcher, settings: Arc<TopicsConfig>) -> Self {
        Self { fetcher, settings }
    }

    /// Lists the subforums on the main forum page
    ///
    /// Unlike the lower levels, failing to read the main page is an error: there
    /// is nothing left to crawl without it.
    ///
    /// # Arguments
    ///
    /// * `main_forum_url` - The forum index
    ///
    /// # Returns
    ///
    /// * `Ok(Vec<ForumLink>)` - Subforums not excluded by title
    /// * `Err(HarvestError)` - The page could not be fetched or parsed
    pub async fn extract_subforum_links(
        &self,
        main_forum_url: &Url,
    ) -> Result<Vec<ForumLink>, HarvestError> {
        tracing::debug!("Extracting subforum links from: {}", main_forum_url);

        let Some(html) = self.fetcher.fetch(main_forum_url).await?.into_page() else {
            tracing::warn!("Main forum URL {} is excluded", main_forum_url);
            return Ok(Vec::new());
        };

        let links = parse_forum_links(
            &html,
            &self.settings.subforum_selector,
            self.fetcher.base_url(),
            &self.settings.excluded_subforum_titles,
        )?;

        for link in &links {
            tracing::debug!("Found subforum: {} -> {}", link.title, link.url);
        }
        Ok(links)
    }

    /// Lists the sub-subforums of a subforum; empty on any failure
    pub async fn extract_sub_subforum_links(&self, subforum_url: &Url) -> Vec<ForumLink> {
        tracing::debug!("Extracting sub-subforum links from: {}", subforum_url);

        let html = match self.fetcher.fetch(subforum_url).await {
            Ok(FetchOutcome::Page(html)) => html,
            Ok(FetchOutcome::Excluded) => return Vec::new(),
            Err(e) => {
                tracing::error!("Error extracting sub-subforums from {}: {}", subforum_url, e);
                return Vec::new();
            }
        };

        match parse_forum_links(
            &html,
            &self.settings.sub_subforum_selector,
            self.fetcher.base_url(),
            &self.settings.excluded_sub_subforum_titles,
        ) {
            Ok(links) => links,
            Err(e) => {
                tracing::error!("Error parsing sub-subforums of {}: {}", subforum_url, e);
                Vec::new()
            }
        }
    }

    /// Topics directly under a subforum, filed under the general category
    pub async fn scrape_general_topics(&self, subforum_url: &Url) -> Vec<TopicRecord> {
        tracing::debug!("Scraping general topics in subforum: {}", subforum_url);
        self.paginate(
            &self.settings.general_category,
            subforum_url,
            &self.settings.next_icon_selector,
        )
        .await
    }

    /// Topics of one sub-subforum, following its "next" links
    pub async fn scrape_subforum(&self, name: &str, url: &Url) -> Vec<TopicRecord> {
        tracing::debug!("Scraping subforum: {}", url);
        self.paginate(name, url, &self.settings.next_selector).await
    }

    /// General topics plus every sub-subforum of one subforum
    ///
    /// Sub-subforums are scraped concurrently; results keep a stable order
    /// (general topics first, then sub-subforums in page order).
    pub async fn crawl_subforum(&self, subforum: &ForumLink) -> Vec<TopicRecord> {
        let mut topics = self.scrape_general_topics(&subforum.url).await;

        let sub_subforums = self.extract_sub_subforum_links(&subforum.url).await;
        let scrapes = sub_subforums
            .iter()
            .map(|link| self.scrape_subforum(&link.title, &link.url));

        for batch in futures::future::join_all(scrapes).await {
            topics.extend(batch);
        }

        tracing::info!(
            "Collected {} topics from '{}' ({} sub-subforums)",
            topics.len(),
            subforum.title,
            sub_subforums.len()
        );
        topics
    }

    /// Reads a topic list page by page until there is no next link
    async fn paginate(&self, category: &str, start: &Url, next_selector: &str) -> Vec<TopicRecord> {
        let mut topics = Vec::new();
        let mut visited = HashSet::new();
        let mut next = Some(start.clone());

        while let Some(url) = next.take() {
            if !visited.insert(url.clone()) {
                tracing::warn!("Pagination loop detected at {}", url);
                break;
            }

            let html = match self.fetcher.fetch(&url).await {
                Ok(FetchOutcome::Page(html)) => html,
                Ok(FetchOutcome::Excluded) => break,
                Err(e) => {
                    tracing::error!("Error scraping topic list {}: {}", url, e);
                    break;
                }
            };

            let page = match parse_topic_list(
                &html,
                &self.settings.topic_selector,
                next_selector,
                self.fetcher.base_url(),
            ) {
                Ok(page) => page,
                Err(e) => {
                    tracing::error!("Error parsing topic list {}: {}", url, e);
                    break;
                }
            };

            topics.extend(page.topics.into_iter().map(|link| TopicRecord {
                subforum_category: category.to_string(),
                title: link.title,
                link: link.url,
            }));

            if let Some(next_url) = &page.next {
                tracing::debug!("Navigating to next page: {}", next_url);
            }
            next = page.next;
        }

        topics
    }
}
