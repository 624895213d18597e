//! Page fetcher
//!
//! This module handles every forum page request, including:
//! - URL substring exclusions (no network traffic for excluded URLs)
//! - A concurrency limiter sized to the header pool
//! - A fresh random identity per request
//! - Retry with backoff for transient failures

use crate::retry::RetryPolicy;
use crate::session::ForumSession;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Semaphore;
use url::Url;

/// Errors raised while fetching a single page
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("HTTP {status} from {url}")]
    Status { url: String, status: u16 },

    #[error("Fetch limiter closed")]
    LimiterClosed,
}

/// Result of a fetch that did not fail
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The page body
    Page(String),
    /// The URL matched an exclusion and was never requested
    Excluded,
}

impl FetchOutcome {
    /// The body, if the page was fetched
    pub fn into_page(self) -> Option<String> {
        match self {
            Self::Page(body) => Some(body),
            Self::Excluded => None,
        }
    }
}

/// Bounded-concurrency HTML fetcher layered on a session
///
/// Clones share the session, the limiter and the exclusion list.
#[derive(Debug, Clone)]
pub struct PageFetcher {
    session: ForumSession,
    limiter: Arc<Semaphore>,
    excluded_urls: Arc<Vec<String>>,
    policy: RetryPolicy,
}

impl PageFetcher {
    /// Creates a fetcher
    ///
    /// # Arguments
    ///
    /// * `session` - The session whose client and identities are used
    /// * `max_concurrent` - Simultaneous in-flight requests
    /// * `excluded_urls` - URLs containing any of these are never fetched
    /// * `policy` - Retry policy applied to each page
    pub fn new(
        session: ForumSession,
        max_concurrent: usize,
        excluded_urls: Vec<String>,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            session,
            limiter: Arc::new(Semaphore::new(max_concurrent.max(1))),
            excluded_urls: Arc::new(excluded_urls),
            policy,
        }
    }

    pub fn session(&self) -> &ForumSession {
        &self.session
    }

    pub fn base_url(&self) -> &Url {
        self.session.base_url()
    }

    /// Whether the URL matches a configured exclusion
    pub fn is_excluded(&self, url: &Url) -> bool {
        self.excluded_urls
            .iter()
            .any(|pattern| !pattern.is_empty() && url.as_str().contains(pattern.as_str()))
    }

    /// Fetches a page, retrying transient failures
    ///
    /// # Returns
    ///
    /// * `Ok(FetchOutcome::Page)` - The page body
    /// * `Ok(FetchOutcome::Excluded)` - The URL is excluded; nothing was sent
    /// * `Err(FetchError)` - Every attempt failed
    pub async fn fetch(&self, url: &Url) -> Result<FetchOutcome, FetchError> {
        if self.is_excluded(url) {
            tracing::debug!("Skipping excluded URL: {}", url);
            return Ok(FetchOutcome::Excluded);
        }

        let label = format!("GET {}", url);
        self.policy
            .run(&label, move || self.fetch_once(url), |_| true)
            .await
            .map(FetchOutcome::Page)
    }

    async fn fetch_once(&self, url: &Url) -> Result<String, FetchError> {
        let _permit = self
            .limiter
            .acquire()
            .await
            .map_err(|_| FetchError::LimiterClosed)?;

        tracing::debug!("Fetching URL: {}", url);
        let request_error = |source| FetchError::Request {
            url: url.to_string(),
            source,
        };

        let response = self.session.get(url).send().await.map_err(request_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        response.text().await.map_err(request_error)
    }
}
