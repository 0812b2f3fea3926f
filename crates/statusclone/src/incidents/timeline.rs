//! Deterministic timeline parsing for incident detail pages.
//!
//! Detail pages render each update as a status heading ("Resolved",
//! "Monitoring", ...) followed by the message and a "Posted <date>" line.

use crate::dom::text_lines;
use crate::status::timeline_heading;
use crate::types::{ExtractedIncidentUpdate, IncidentStatus};
use crate::uptime::anchor::parse_human_date;
use chrono::{NaiveTime, SecondsFormat, TimeZone, Utc};
use regex::Regex;
use std::sync::OnceLock;

/// Lines that end the timeline block.
const STOP_PREFIXES: &[&str] = &[
    "this incident affected",
    "this scheduled maintenance affected",
    "subscribe to updates",
    "powered by",
];

/// Longest line still considered a bare timestamp.
const MAX_DATE_LINE: usize = 80;

fn date_like_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?i)^(?:posted|updated)?\s*(?:on\s+)?(?:\d{4}-\d{2}-\d{2}|(?:jan|feb|mar|apr|may|jun|jul|aug|sep|oct|nov|dec)[a-z]*\.?\s+\d{1,2}\b)",
        )
        .expect("date-like regex is valid")
    })
}

fn human_timestamp_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?P<date>(?i:jan|feb|mar|apr|may|jun|jul|aug|sep|oct|nov|dec)[a-z]*\.?\s+\d{1,2}(?:st|nd|rd|th)?,?\s+\d{4})(?:\s*(?:-|,|at)?\s*(?P<h>\d{1,2}):(?P<m>\d{2})\s*(?P<ampm>(?i:am|pm))?)?(?:\s+(?P<tz>[A-Z]{2,5})\b)?",
        )
        .expect("timestamp regex is valid")
    })
}

fn iso_timestamp_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\d{4}-\d{2}-\d{2}T\d{2}:\d{2}(?::\d{2}(?:\.\d+)?)?(?:Z|[+-]\d{2}:?\d{2})")
            .expect("iso timestamp regex is valid")
    })
}

/// True for short lines that start with a date, optionally after "Posted".
pub fn is_date_line(line: &str) -> bool {
    line.len() <= MAX_DATE_LINE && date_like_regex().is_match(line.trim())
}

/// Parse a detail-page timestamp into RFC 3339 UTC.
///
/// Accepts ISO-8601 with an offset, or "Jan 5, 2024 - 10:00 UTC" style text
/// with no zone or a UTC/GMT zone. Anything else (missing year, other zones)
/// is `None`.
pub fn parse_timestamp(line: &str) -> Option<String> {
    if let Some(m) = iso_timestamp_regex().find(line) {
        return chrono::DateTime::parse_from_rfc3339(m.as_str())
            .ok()
            .map(|dt| dt.with_timezone(&Utc).to_rfc3339_opts(SecondsFormat::Secs, true));
    }

    let caps = human_timestamp_regex().captures(line)?;
    if let Some(tz) = caps.name("tz") {
        if !matches!(tz.as_str(), "UTC" | "GMT" | "Z") {
            return None;
        }
    }
    let date = parse_human_date(&caps["date"])?;
    let time = match (caps.name("h"), caps.name("m")) {
        (Some(h), Some(m)) => {
            let mut hour: u32 = h.as_str().parse().ok()?;
            let minute: u32 = m.as_str().parse().ok()?;
            match caps.name("ampm").map(|a| a.as_str().to_lowercase()) {
                Some(ref p) if p == "pm" && hour < 12 => hour += 12,
                Some(ref p) if p == "am" && hour == 12 => hour = 0,
                _ => {}
            }
            NaiveTime::from_hms_opt(hour, minute, 0)?
        }
        _ => NaiveTime::MIN,
    };
    Some(
        Utc.from_utc_datetime(&date.and_time(time))
            .to_rfc3339_opts(SecondsFormat::Secs, true),
    )
}

/// Split visible lines into updates at status headings.
///
/// Lines before the first heading are ignored. Date lines set the update's
/// timestamp when parseable and are never part of the message.
pub fn parse_timeline(lines: &[String]) -> Vec<ExtractedIncidentUpdate> {
    let mut updates: Vec<ExtractedIncidentUpdate> = Vec::new();
    let mut current: Option<(IncidentStatus, Vec<&str>, String)> = None;

    let close = |current: &mut Option<(IncidentStatus, Vec<&str>, String)>,
                 updates: &mut Vec<ExtractedIncidentUpdate>| {
        if let Some((status, message, timestamp)) = current.take() {
            if !message.is_empty() || !timestamp.is_empty() {
                updates.push(ExtractedIncidentUpdate {
                    status,
                    message: message.join("\n"),
                    timestamp,
                });
            }
        }
    };

    for line in lines {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let lower = line.to_lowercase();
        if STOP_PREFIXES.iter().any(|p| lower.starts_with(p)) {
            break;
        }
        if let Some(status) = timeline_heading(line) {
            close(&mut current, &mut updates);
            current = Some((status, Vec::new(), String::new()));
            continue;
        }
        let Some((_, message, timestamp)) = current.as_mut() else {
            continue;
        };
        if is_date_line(line) {
            if timestamp.is_empty() {
                if let Some(ts) = parse_timestamp(line) {
                    *timestamp = ts;
                }
            }
            continue;
        }
        message.push(line);
    }
    close(&mut current, &mut updates);
    updates
}

/// Timeline straight from detail-page markup.
pub fn timeline_from_html(html: &str) -> Vec<ExtractedIncidentUpdate> {
    parse_timeline(&text_lines(html))
}
