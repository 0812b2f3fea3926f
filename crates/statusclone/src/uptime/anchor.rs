//! Calendar anchoring for uptime bars.

use chrono::{Days, NaiveDate};
use regex::Regex;
use std::sync::OnceLock;

fn since_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?i)\bsince\s+(?:on\s+)?(\d{4}-\d{2}-\d{2}|[a-z]{3,9}\.?\s+\d{1,2}(?:st|nd|rd|th)?,?\s+\d{4}|\d{1,2}(?:st|nd|rd|th)?\s+[a-z]{3,9}\.?,?\s+\d{4})",
        )
        .expect("since regex is valid")
    })
}

fn ordinal_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)(\d)(st|nd|rd|th)\b").expect("ordinal regex is valid"))
}

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%B %d %Y", "%b %d %Y", "%d %B %Y", "%d %b %Y"];

/// Parse a human date like "Jan 5, 2024", "5th January 2024" or "2024-01-05".
pub fn parse_human_date(raw: &str) -> Option<NaiveDate> {
    let cleaned = ordinal_regex().replace_all(raw.trim(), "$1");
    let cleaned = cleaned
        .replace([',', '.'], " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(&cleaned, fmt).ok())
}

/// The date of the oldest bar when the page states it ("Uptime since Jan 5, 2024").
pub fn find_since_anchor(text: &str) -> Option<NaiveDate> {
    since_regex()
        .captures_iter(text)
        .find_map(|c| parse_human_date(&c[1]))
}

/// Anchor if known, otherwise the newest bar is `today`.
pub fn resolve_start_date(
    anchor: Option<NaiveDate>,
    series_len: usize,
    today: NaiveDate,
) -> Option<NaiveDate> {
    if anchor.is_some() {
        return anchor;
    }
    if series_len == 0 {
        return None;
    }
    today.checked_sub_days(Days::new(series_len as u64 - 1))
}

/// Calendar date of bar `index` given the page's start date.
pub fn day_at(start: NaiveDate, index: usize) -> Option<NaiveDate> {
    start.checked_add_days(Days::new(index as u64))
}
