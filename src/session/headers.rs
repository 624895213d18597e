//! Rotating request identities
//!
//! The pool is filled once per run from an external user-agent API, reached
//! through the same proxy as the forum. Any request that fails falls back to a
//! static user agent, so the pool always holds the requested number of headers.

use crate::model::Header;
use rand::seq::SliceRandom;
use reqwest::header::{REFERER, USER_AGENT};
use reqwest::{Client, RequestBuilder};
use serde::Deserialize;
use std::sync::Arc;

pub const FALLBACK_USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Edge/91.0.864.59 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_6) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/14.0.1 Safari/605.1.15",
    "Mozilla/5.0 (Windows NT 6.1; WOW64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/70.0.3538.77 Safari/537.36",
    "Mozilla/5.0 (Linux; Android 11; Pixel 5) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/88.0.4324.152 Mobile Safari/537.36",
    "Mozilla/5.0 (iPhone; CPU iPhone OS 15_0 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/15.0 Mobile/15E148 Safari/604.1",
    "Mozilla/5.0 (X11; Ubuntu; Linux x86_64; rv:90.0) Gecko/20100101 Firefox/90.0",
    "Mozilla/5.0 (Windows NT 6.3; Win64; x64; Trident/7.0; rv:11.0) like Gecko",
    "Mozilla/5.0 (X11; Fedora; Linux x86_64; rv:92.0) Gecko/20100101 Firefox/92.0",
    "Mozilla/5.0 (Linux; U; Android 10; en-US; SM-G960U Build/QP1A.190711.020) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/81.0.4044.117 Mobile Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; ARM; Surface Pro X) AppleWebKit/537.36 (KHTML, like Gecko) Edge/91.0.864.59 Safari/537.36",
];

pub const REFERRERS: &[&str] = &[
    "https://www.google.com",
    "https://www.bing.com",
    "https://duckduckgo.com",
];

/// Response body of the user-agent API
#[derive(Debug, Deserialize)]
struct AgentResponse {
    #[serde(rename = "user-agent")]
    user_agent: Option<String>,
}

/// A shared, read-only set of request identities
///
/// Cloning is cheap; all clones share the same headers.
#[derive(Debug, Clone)]
pub struct HeaderPool {
    headers: Arc<Vec<Header>>,
}

impl HeaderPool {
    /// Builds a pool from known headers; an empty list yields one fallback header
    pub fn new(headers: Vec<Header>) -> Self {
        let headers = if headers.is_empty() {
            vec![fallback_header()]
        } else {
            headers
        };
        Self {
            headers: Arc::new(headers),
        }
    }

    /// A pool made only of static fallback identities
    pub fn fallback(count: usize) -> Self {
        Self::new((0..count.max(1)).map(|_| fallback_header()).collect())
    }

    /// Fetches `count` identities concurrently from the user-agent API
    ///
    /// # Arguments
    ///
    /// * `client` - Client routed through the proxy
    /// * `api_url` - The user-agent API; `None` skips the network entirely
    /// * `count` - Number of headers to collect
    ///
    /// # Returns
    ///
    /// A pool of exactly `count` headers (at least one)
    pub async fn prefetch(client: &Client, api_url: Option<&str>, count: usize) -> Self {
        let Some(api_url) = api_url else {
            tracing::info!("No header API configured, using {} static headers", count);
            return Self::fallback(count);
        };

        tracing::info!("Fetching {} random headers...", count);
        let requests = (0..count.max(1)).map(|_| fetch_header(client, api_url));
        let headers = futures::future::join_all(requests).await;
        tracing::info!("Fetched {} headers", headers.len());

        Self::new(headers)
    }

    /// Picks a random identity for one request
    pub fn choose(&self) -> Header {
        self.headers
            .choose(&mut rand::thread_rng())
            .cloned()
            .unwrap_or_else(fallback_header)
    }

    pub fn len(&self) -> usize {
        self.headers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.headers.is_empty()
    }
}

/// Attaches an identity to an outbound request
pub fn with_identity(request: RequestBuilder, header: &Header) -> RequestBuilder {
    request
        .header(USER_AGENT, header.user_agent.as_str())
        .header(REFERER, header.referrer.as_str())
}

async fn fetch_header(client: &Client, api_url: &str) -> Header {
    let response = match client.get(api_url).send().await {
        Ok(response) => response.json::<AgentResponse>().await,
        Err(e) => Err(e),
    };

    match response {
        Ok(AgentResponse {
            user_agent: Some(user_agent),
        }) if !user_agent.trim().is_empty() => {
            tracing::debug!("Random User-Agent fetched: {}", user_agent);
            Header {
                user_agent,
                referrer: random_referrer(),
            }
        }
        Ok(_) => fallback_header(),
        Err(e) => {
            tracing::debug!("Header API unavailable, using fallback: {}", e);
            fallback_header()
        }
    }
}

fn random_referrer() -> String {
    REFERRERS
        .choose(&mut rand::thread_rng())
        .unwrap_or(&REFERRERS[0])
        .to_string()
}

/// A random static identity
pub fn fallback_header() -> Header {
    let user_agent = FALLBACK_USER_AGENTS
        .choose(&mut rand::thread_rng())
        .unwrap_or(&FALLBACK_USER_AGENTS[0]);
    Header {
        user_agent: user_agent.to_string(),
        referrer: random_referrer(),
    }
}
