//! HTML parse steps, one per page kind
//!
//! Each parser takes the page body as a `&str`, builds a `scraper::Html` document
//! synchronously and returns owned records. Documents never outlive the call, so
//! callers can hold the results across `.await` points.

pub mod activity;
pub mod dates;
pub mod forum;
pub mod login;
pub mod members;

pub use activity::{parse_activity_page, RawActivityRow};
pub use dates::{now_in, parse_forum_date};
pub use forum::{parse_forum_links, parse_topic_list, ForumLink, TopicListPage};
pub use login::{login_error_message, login_succeeded, parse_login_form, LoginForm};
pub use members::parse_member_cards;

use scraper::{ElementRef, Selector};
use thiserror::Error;
use url::Url;

/// Errors raised while turning HTML into records
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("Invalid CSS selector '{0}'")]
    Selector(String),

    #[error("Form with id '{0}' not found")]
    FormNotFound(String),

    #[error("Unrecognized date '{0}'")]
    Date(String),
}

/// Result type alias for parse operations
pub type ParseResult<T> = Result<T, ParseError>;

/// Compiles a CSS selector, mapping failures to `ParseError::Selector`
pub(crate) fn selector(css: &str) -> ParseResult<Selector> {
    Selector::parse(css).map_err(|_| ParseError::Selector(css.to_string()))
}

/// Selector matching `tag` elements carrying the given class
pub(crate) fn class_selector(tag: &str, class: &str) -> ParseResult<Selector> {
    selector(&format!("{}.{}", tag, class))
}

/// Text pieces of an element, each trimmed, empty ones dropped, joined by spaces
pub(crate) fn element_text(element: &ElementRef) -> String {
    element
        .text()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Resolves an `href` against the forum base URL
///
/// Returns None if the link should be ignored:
/// - empty or fragment-only hrefs
/// - javascript:, mailto:, tel: and data: schemes
/// - hrefs that do not resolve to an HTTP(S) URL
pub(crate) fn resolve_link(href: &str, base_url: &Url) -> Option<Url> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    if href.starts_with("javascript:")
        || href.starts_with("mailto:")
        || href.starts_with("tel:")
        || href.starts_with("data:")
    {
        return None;
    }

    match base_url.join(href) {
        Ok(url) if url.scheme() == "http" || url.scheme() == "https" => Some(url),
        _ => None,
    }
}
