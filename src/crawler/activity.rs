//! Moderator activity log crawler
//!
//! The log is reverse-chronological and paged by row offset. Scanning a window
//! works row by row:
//!
//! | Row timestamp | Action |
//! |---------------|--------|
//! | missing / unparseable | drop the row, keep scanning |
//! | after the window end | skip the row, keep scanning |
//! | inside the window | keep the row |
//! | before the window start | stop scanning entirely |
//!
//! A page with no rows marks the end of the log.

use crate::config::ActivityConfig;
use crate::crawler::fetcher::{FetchOutcome, PageFetcher};
use crate::model::{ActivityRecord, DateRange};
use crate::parser::{now_in, parse_activity_page, parse_forum_date, RawActivityRow};
use crate::{ConfigError, HarvestError};
use chrono::NaiveDateTime;
use chrono_tz::Tz;
use std::sync::Arc;
use url::Url;

/// What the window scan does with one row
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowDecision {
    Keep(ActivityRecord),
    Skip,
    Stop,
}

/// Maps a full action phrase to its base action
///
/// The longest vocabulary entry the phrase starts with wins; phrases matching no
/// entry map to `fallback`.
pub fn extract_base_action(phrase: &str, base_actions: &[String], fallback: &str) -> String {
    let phrase = phrase.trim();
    base_actions
        .iter()
        .filter(|base| !base.is_empty() && phrase.starts_with(base.as_str()))
        .max_by_key(|base| base.len())
        .cloned()
        .unwrap_or_else(|| fallback.to_string())
}

/// Decides the fate of one row against the requested window
///
/// # Arguments
///
/// * `raw` - The row's text fields
/// * `window` - Requested dates, from 00:00:00 on the start to 23:59:59 on the end
/// * `now` - Current time in the forum timezone, for relative timestamps
/// * `settings` - Action vocabulary and normalization switch
pub fn decide_row(
    raw: &RawActivityRow,
    window: &DateRange,
    now: NaiveDateTime,
    settings: &ActivityConfig,
) -> RowDecision {
    let Some(time_text) = raw.time_text.as_deref() else {
        tracing::warn!("Activity row without a timestamp, skipping");
        return RowDecision::Skip;
    };

    let timestamp = match parse_forum_date(time_text, now) {
        Ok(timestamp) => timestamp,
        Err(e) => {
            tracing::warn!("Could not parse date: {}", e);
            return RowDecision::Skip;
        }
    };

    if timestamp < window.window_start() {
        return RowDecision::Stop;
    }
    if timestamp > window.window_end() {
        return RowDecision::Skip;
    }

    let Some(moderator) = raw.moderator.clone().filter(|m| !m.is_empty()) else {
        tracing::warn!("Activity row at {} has no moderator, skipping", timestamp);
        return RowDecision::Skip;
    };

    let action = match raw.action_phrase.as_deref() {
        Some(phrase) if settings.normalize_actions => {
            extract_base_action(phrase, &settings.base_actions, &settings.fallback_action)
        }
        Some(phrase) => phrase.to_string(),
        None => settings.fallback_action.clone(),
    };

    RowDecision::Keep(ActivityRecord {
        moderator,
        action,
        details: raw.details.clone(),
        timestamp,
    })
}

/// Scans the activity log of one forum session
#[derive(Debug, Clone)]
pub struct ActivityCrawler {
    fetcher: PageFetcher,
    settings: Arc<ActivityConfig>,
    timezone: Tz,
}

impl ActivityCrawler {
    /// Creates a crawler; fails if the configured timezone is unknown
    pub fn new(fetcher: PageFetcher, settings: Arc<ActivityConfig>) -> Result<Self, HarvestError> {
        let timezone = settings.timezone.parse::<Tz>().map_err(|_| {
            ConfigError::Validation(format!("Unknown timezone '{}'", settings.timezone))
        })?;
        Ok(Self {
            fetcher,
            settings,
            timezone,
        })
    }

    /// URL of the log page with the given index (0-based)
    pub fn page_url(&self, page: u32) -> Result<Url, url::ParseError> {
        let offset = page * self.settings.page_size;
        self.fetcher
            .base_url()
            .join(&format!("{}{}", self.settings.logs_path, offset))
    }

    /// Collects the log rows inside `window`
    ///
    /// A page that cannot be fetched or parsed ends the scan; the rows gathered so
    /// far are returned.
    pub async fn scrape(&self, window: &DateRange) -> Vec<ActivityRecord> {
        tracing::info!("Scraping activity log for {}", window);
        let now = now_in(self.timezone);
        let mut records = Vec::new();
        let mut page = 0;

        'pages: loop {
            let url = match self.page_url(page) {
                Ok(url) => url,
                Err(e) => {
                    tracing::error!("Invalid activity log URL: {}", e);
                    break;
                }
            };
            tracing::info!("Fetching activity logs from: {}", url);

            let html = match self.fetcher.fetch(&url).await {
                Ok(FetchOutcome::Page(html)) => html,
                Ok(FetchOutcome::Excluded) => break,
                Err(e) => {
                    tracing::warn!(
                        "Activity log page {} failed, keeping {} rows: {}",
                        page,
                        records.len(),
                        e
                    );
                    break;
                }
            };

            let rows = match parse_activity_page(&html, &self.settings) {
                Ok(rows) => rows,
                Err(e) => {
                    tracing::error!("Error parsing activity log page {}: {}", page, e);
                    break;
                }
            };

            if rows.is_empty() {
                tracing::info!("No more activities found");
                break;
            }

            for raw in &rows {
                match decide_row(raw, window, now, &self.settings) {
                    RowDecision::Keep(record) => records.push(record),
                    RowDecision::Skip => {}
                    RowDecision::Stop => {
                        tracing::debug!("Reached the start of the window on page {}", page);
                        break 'pages;
                    }
                }
            }

            page += 1;
        }

        tracing::info!("Collected {} activity rows for {}", records.len(), window);
        records
    }
}
