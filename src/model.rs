//! Records produced by the crawlers and consumed by storage and output

use chrono::{Days, NaiveDate, NaiveDateTime, NaiveTime};
use std::fmt;
use std::str::FromStr;
use url::Url;

/// Identity material attached to one outbound request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub user_agent: String,
    pub referrer: String,
}

/// A topic found in the forum tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicRecord {
    /// Sub-subforum name, or the synthetic general category
    pub subforum_category: String,
    pub title: String,
    pub link: Url,
}

/// A member card from the group roster
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    pub username: String,
    pub profile_url: Url,
}

impl Member {
    /// Case-folded, trimmed username used for roster matching
    pub fn folded_name(&self) -> String {
        fold_name(&self.username)
    }
}

/// Normalizes a moderator or member name for comparison
pub fn fold_name(name: &str) -> String {
    name.trim().to_lowercase()
}

/// One row of the moderator activity log
///
/// The `(moderator, action, details, timestamp)` tuple identifies a record in the
/// store; upserting the same tuple twice leaves a single row.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ActivityRecord {
    pub moderator: String,
    pub action: String,
    pub details: String,
    /// Wall-clock time in the forum's timezone
    pub timestamp: NaiveDateTime,
}

/// Which moderators an activity crawl should keep
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModScope {
    /// Only moderators currently in the group roster
    Active,
    /// Every moderator appearing in the log
    All,
}

impl ModScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::All => "all",
        }
    }
}

impl FromStr for ModScope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(Self::Active),
            "all" => Ok(Self::All),
            other => Err(format!("invalid scope '{}', expected 'active' or 'all'", other)),
        }
    }
}

impl fmt::Display for ModScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An inclusive span of calendar dates with `start <= end`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    /// Creates a range, returning `None` when `start` is after `end`
    pub fn new(start: NaiveDate, end: NaiveDate) -> Option<Self> {
        (start <= end).then_some(Self { start, end })
    }

    /// A range covering exactly one day
    pub fn single(day: NaiveDate) -> Self {
        Self {
            start: day,
            end: day,
        }
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// First instant of the range (00:00:00 on the start date)
    pub fn window_start(&self) -> NaiveDateTime {
        self.start.and_time(NaiveTime::MIN)
    }

    /// Last instant of the range (23:59:59 on the end date)
    pub fn window_end(&self) -> NaiveDateTime {
        let end_of_day = NaiveTime::from_hms_opt(23, 59, 59).unwrap_or(NaiveTime::MIN);
        self.end.and_time(end_of_day)
    }

    pub fn contains(&self, day: NaiveDate) -> bool {
        self.start <= day && day <= self.end
    }

    /// Number of calendar days in the range
    pub fn num_days(&self) -> u64 {
        (self.end - self.start).num_days() as u64 + 1
    }

    /// Every calendar date in the range, in order
    pub fn days(&self) -> impl Iterator<Item = NaiveDate> {
        let start = self.start;
        (0..self.num_days()).filter_map(move |offset| start.checked_add_days(Days::new(offset)))
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}
