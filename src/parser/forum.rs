//! Forum index and topic list parsing

use super::{resolve_link, selector, ParseResult};
use scraper::Html;
use url::Url;

/// A titled link found on a forum page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForumLink {
    pub title: String,
    pub url: Url,
}

/// One page of a topic list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicListPage {
    pub topics: Vec<ForumLink>,
    /// Next page of the same list, if the page has a "next" link
    pub next: Option<Url>,
}

/// Extracts subforum (or sub-subforum) links from a forum page
///
/// # Arguments
///
/// * `html` - The page body
/// * `link_selector` - CSS selector of the forum anchors
/// * `base_url` - URL relative hrefs are resolved against
/// * `excluded_titles` - Anchors whose title contains any of these are skipped
///
/// # Returns
///
/// The matching links in page order
pub fn parse_forum_links(
    html: &str,
    link_selector: &str,
    base_url: &Url,
    excluded_titles: &[String],
) -> ParseResult<Vec<ForumLink>> {
    let document = Html::parse_document(html);
    let link_selector = selector(link_selector)?;
    let mut links = Vec::new();

    for anchor in document.select(&link_selector) {
        let title = anchor.text().collect::<String>().trim().to_string();

        if let Some(pattern) = excluded_titles
            .iter()
            .find(|pattern| !pattern.is_empty() && title.contains(pattern.as_str()))
        {
            tracing::debug!("Skipping forum '{}' (matches '{}')", title, pattern);
            continue;
        }

        let Some(url) = anchor
            .value()
            .attr("href")
            .and_then(|href| resolve_link(href, base_url))
        else {
            tracing::debug!("Skipping forum '{}' without a usable link", title);
            continue;
        };

        links.push(ForumLink { title, url });
    }

    Ok(links)
}

/// Extracts topics and the "next page" link from a topic list page
pub fn parse_topic_list(
    html: &str,
    topic_selector: &str,
    next_selector: &str,
    base_url: &Url,
) -> ParseResult<TopicListPage> {
    let document = Html::parse_document(html);
    let topic_selector = selector(topic_selector)?;
    let next_selector = selector(next_selector)?;

    let topics = document
        .select(&topic_selector)
        .filter_map(|anchor| {
            let url = resolve_link(anchor.value().attr("href")?, base_url)?;
            let title = anchor.text().collect::<String>().trim().to_string();
            Some(ForumLink { title, url })
        })
        .collect();

    let next = document
        .select(&next_selector)
        .next()
        .and_then(|anchor| anchor.value().attr("href"))
        .and_then(|href| resolve_link(href, base_url));

    Ok(TopicListPage { topics, next })
}
