//! Moderator activity log parsing
//!
//! A log page holds one `div` per row. Inside a row:
//! - the action block holds the action phrase in its first `strong`, followed by
//!   free-form details;
//! - labelled blocks start with a `span` caption such as "Czas:" and carry the
//!   value after it.
//!
//! This module only splits rows into raw text; window checks, date parsing and
//! action normalization happen in the crawler.

use super::{class_selector, element_text, selector, ParseResult};
use crate::config::ActivityConfig;
use scraper::{ElementRef, Html, Node};

/// Text fields of one log row, before interpretation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawActivityRow {
    /// Full action phrase, absent when the row has no action block or `strong`
    pub action_phrase: Option<String>,
    pub details: String,
    /// Absent when the row has no moderator block
    pub moderator: Option<String>,
    /// Time block text with its caption removed
    pub time_text: Option<String>,
}

/// Splits every log row on the page into its raw fields
///
/// # Arguments
///
/// * `html` - The log page body
/// * `markup` - Class names and captions describing the log markup
///
/// # Returns
///
/// Rows in page order; an empty vector marks the end of the log
pub fn parse_activity_page(html: &str, markup: &ActivityConfig) -> ParseResult<Vec<RawActivityRow>> {
    let document = Html::parse_document(html);
    let row_selector = class_selector("div", &markup.row_class)?;
    let action_selector = class_selector("div", &markup.action_class)?;
    let label_selector = class_selector("div", &markup.label_class)?;
    let member_selector = class_selector("a", &markup.member_link_class)?;
    let strong_selector = selector("strong")?;
    let span_selector = selector("span")?;

    let mut rows = Vec::new();

    for row in document.select(&row_selector) {
        let mut raw = RawActivityRow::default();

        if let Some(action) = row.select(&action_selector).next() {
            let strong = action.select(&strong_selector).next();
            raw.action_phrase = strong
                .map(|s| element_text(&s))
                .filter(|phrase| !phrase.is_empty());
            raw.details = details_text(&action, strong.as_ref());
        }

        let labelled = |caption: &str| {
            row.select(&label_selector).find(|block| {
                block
                    .select(&span_selector)
                    .next()
                    .map(|span| element_text(&span) == caption)
                    .unwrap_or(false)
            })
        };

        if let Some(block) = labelled(&markup.moderator_label) {
            let moderator = match block.select(&member_selector).next() {
                Some(link) => element_text(&link),
                None => element_text(&block)
                    .replace(markup.moderator_label.as_str(), "")
                    .trim()
                    .to_string(),
            };
            raw.moderator = Some(moderator);
        }

        if let Some(block) = labelled(&markup.time_label) {
            let caption = block.select(&span_selector).next();
            let text = text_outside(&block, caption.as_ref());
            raw.time_text = Some(text).filter(|t| !t.is_empty());
        }

        rows.push(raw);
    }

    Ok(rows)
}

/// Children of the action block other than the phrase, trimmed and space-joined
fn details_text(action: &ElementRef, phrase: Option<&ElementRef>) -> String {
    let skip = phrase.map(|p| p.id());
    let mut parts = Vec::new();

    for child in action.children() {
        if Some(child.id()) == skip {
            continue;
        }
        let part = match child.value() {
            Node::Text(text) => text.trim().to_string(),
            Node::Element(_) => ElementRef::wrap(child)
                .map(|element| element_text(&element))
                .unwrap_or_default(),
            _ => String::new(),
        };
        if !part.is_empty() {
            parts.push(part);
        }
    }

    parts.join(" ")
}

/// Text of `block` excluding everything inside `caption`
///
/// Pieces are trimmed and concatenated without a separator, so a time split
/// across inline tags (`14:<b>05</b>`) reads back as one token.
fn text_outside(block: &ElementRef, caption: Option<&ElementRef>) -> String {
    let caption_id = caption.map(|c| c.id());

    block
        .descendants()
        .filter(|node| {
            caption_id
                .map(|id| node.id() != id && !node.ancestors().any(|a| a.id() == id))
                .unwrap_or(true)
        })
        .filter_map(|node| match node.value() {
            Node::Text(text) => Some(text.trim()),
            _ => None,
        })
        .filter(|text| !text.is_empty())
        .collect::<String>()
}
