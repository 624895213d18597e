//! Locale-aware parsing of forum timestamps
//!
//! The forum prints times in its own timezone and language, e.g.
//! "3 lis 2024, 14:05", "wczoraj, 21:30", "pt 8 listopada 2024 o 09:15",
//! "5 minut temu" or "2024-11-03 14:05". Parsing is pure: relative forms are
//! resolved against a caller-supplied `now` in the same timezone.

use super::{ParseError, ParseResult};
use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use chrono_tz::Tz;

const MONTHS: &[(&str, u32)] = &[
    // Polish nominative
    ("styczeń", 1),
    ("luty", 2),
    ("marzec", 3),
    ("kwiecień", 4),
    ("maj", 5),
    ("czerwiec", 6),
    ("lipiec", 7),
    ("sierpień", 8),
    ("wrzesień", 9),
    ("październik", 10),
    ("listopad", 11),
    ("grudzień", 12),
    // Polish genitive
    ("stycznia", 1),
    ("lutego", 2),
    ("marca", 3),
    ("kwietnia", 4),
    ("maja", 5),
    ("czerwca", 6),
    ("lipca", 7),
    ("sierpnia", 8),
    ("września", 9),
    ("października", 10),
    ("listopada", 11),
    ("grudnia", 12),
    // Polish abbreviations
    ("sty", 1),
    ("lut", 2),
    ("mar", 3),
    ("kwi", 4),
    ("cze", 6),
    ("lip", 7),
    ("sie", 8),
    ("wrz", 9),
    ("paź", 10),
    ("lis", 11),
    ("gru", 12),
    // English
    ("january", 1),
    ("february", 2),
    ("march", 3),
    ("april", 4),
    ("may", 5),
    ("june", 6),
    ("july", 7),
    ("august", 8),
    ("september", 9),
    ("october", 10),
    ("november", 11),
    ("december", 12),
    ("jan", 1),
    ("feb", 2),
    ("apr", 4),
    ("jun", 6),
    ("jul", 7),
    ("aug", 8),
    ("sep", 9),
    ("sept", 9),
    ("oct", 10),
    ("nov", 11),
    ("dec", 12),
];

const WEEKDAYS: &[&str] = &[
    "poniedziałek",
    "wtorek",
    "środa",
    "czwartek",
    "piątek",
    "sobota",
    "niedziela",
    "pon",
    "wt",
    "śr",
    "czw",
    "pt",
    "sob",
    "ndz",
    "niedz",
    "monday",
    "tuesday",
    "wednesday",
    "thursday",
    "friday",
    "saturday",
    "sunday",
    "mon",
    "tue",
    "wed",
    "thu",
    "fri",
    "sat",
    "sun",
];

/// Current wall-clock time in the given timezone
pub fn now_in(tz: Tz) -> NaiveDateTime {
    Utc::now().with_timezone(&tz).naive_local()
}

/// Parses a forum timestamp into naive local time
///
/// # Arguments
///
/// * `text` - The timestamp as printed on the page
/// * `now` - Current local time, used for relative forms
///
/// # Returns
///
/// * `Ok(NaiveDateTime)` - The timestamp in the forum's timezone
/// * `Err(ParseError::Date)` - The text matches no known form
pub fn parse_forum_date(text: &str, now: NaiveDateTime) -> ParseResult<NaiveDateTime> {
    let lowered = text.to_lowercase().replace(',', " ");
    let mut tokens: Vec<&str> = lowered
        .split_whitespace()
        .map(|t| t.trim_end_matches('.'))
        .filter(|t| !t.is_empty() && *t != "o" && *t != "at")
        .collect();

    if tokens.first().map(|t| WEEKDAYS.contains(t)).unwrap_or(false) {
        tokens.remove(0);
    }

    parse_tokens(&tokens, now).ok_or_else(|| ParseError::Date(text.trim().to_string()))
}

fn parse_tokens(tokens: &[&str], now: NaiveDateTime) -> Option<NaiveDateTime> {
    match tokens {
        ["teraz"] | ["now"] | ["przed", "chwilą"] | ["just", "now"] => Some(now),
        [amount, unit, "temu"] | [amount, unit, "ago"] => {
            let amount: u32 = amount.parse().ok()?;
            let amount = i32::try_from(amount).ok()?;
            let offset = relative_unit(unit)?.checked_mul(amount)?;
            now.checked_sub_signed(offset)
        }
        [unit, "temu"] | [unit, "ago"] => now.checked_sub_signed(relative_unit(unit)?),
        [day, rest @ ..] if day_offset(day).is_some() => {
            let date = now.date().checked_sub_signed(Duration::days(day_offset(day)?))?;
            Some(date.and_time(optional_time(rest)?))
        }
        [date, rest @ ..] if numeric_date(date).is_some() => {
            Some(numeric_date(date)?.and_time(optional_time(rest)?))
        }
        [day, month, year, rest @ ..] if month_number(month).is_some() => {
            let date = NaiveDate::from_ymd_opt(
                year.parse().ok()?,
                month_number(month)?,
                day.parse().ok()?,
            )?;
            Some(date.and_time(optional_time(rest)?))
        }
        [month, day, year, rest @ ..] if month_number(month).is_some() => {
            let date = NaiveDate::from_ymd_opt(
                year.parse().ok()?,
                month_number(month)?,
                day.parse().ok()?,
            )?;
            Some(date.and_time(optional_time(rest)?))
        }
        _ => None,
    }
}

/// Days back from today for the relative day words
fn day_offset(token: &str) -> Option<i64> {
    match token {
        "dzisiaj" | "dziś" | "today" => Some(0),
        "wczoraj" | "yesterday" => Some(1),
        "przedwczoraj" => Some(2),
        _ => None,
    }
}

fn relative_unit(token: &str) -> Option<Duration> {
    let unit = if token.starts_with("sekund") || token.starts_with("second") {
        Duration::seconds(1)
    } else if token.starts_with("minut") || token == "min" {
        Duration::minutes(1)
    } else if token.starts_with("godzin") || token.starts_with("hour") || token == "h" {
        Duration::hours(1)
    } else if token.starts_with("dni") || token == "dzień" || token.starts_with("day") {
        Duration::days(1)
    } else if token.starts_with("tydz") || token.starts_with("tygod") || token.starts_with("week") {
        Duration::weeks(1)
    } else {
        return None;
    };
    Some(unit)
}

fn month_number(token: &str) -> Option<u32> {
    MONTHS
        .iter()
        .find(|(name, _)| *name == token)
        .map(|(_, number)| *number)
}

/// `YYYY-MM-DD` or `DD.MM.YYYY`
fn numeric_date(token: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(token, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(token, "%d.%m.%Y"))
        .ok()
}

/// A trailing `HH:MM[:SS]` or `H:MM am|pm`, or midnight when nothing follows the date
fn optional_time(rest: &[&str]) -> Option<NaiveTime> {
    match rest {
        [] => Some(NaiveTime::MIN),
        [time] => NaiveTime::parse_from_str(time, "%H:%M:%S")
            .or_else(|_| NaiveTime::parse_from_str(time, "%H:%M"))
            .ok(),
        [time, meridiem @ ("am" | "pm")] => {
            NaiveTime::parse_from_str(&format!("{} {}", time, meridiem), "%I:%M %p").ok()
        }
        _ => None,
    }
}
