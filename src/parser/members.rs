//! Group roster parsing

use super::{class_selector, resolve_link, ParseResult};
use crate::model::Member;
use scraper::Html;
use url::Url;

/// Extracts members from one roster page
///
/// Each member card is a `div` with `block_class`; its first `a` with `link_class`
/// carries the username and profile link. Cards without such a link are skipped.
pub fn parse_member_cards(
    html: &str,
    block_class: &str,
    link_class: &str,
    base_url: &Url,
) -> ParseResult<Vec<Member>> {
    let document = Html::parse_document(html);
    let block_selector = class_selector("div", block_class)?;
    let link_selector = class_selector("a", link_class)?;

    let members = document
        .select(&block_selector)
        .filter_map(|block| {
            let link = block.select(&link_selector).next()?;
            let profile_url = resolve_link(link.value().attr("href")?, base_url)?;
            let username = link.text().collect::<String>().trim().to_string();
            Some(Member {
                username,
                profile_url,
            })
        })
        .collect();

    Ok(members)
}
