//! Deterministic bar decoding from SVG rectangles.

use super::color::{classify_rect, Cell};
use crate::dom::{tokenize, DomToken, RectSpec};
use crate::structure::heuristic::normalize_name;
use crate::types::UptimeDay;
use regex::Regex;
use std::collections::HashMap;
use std::sync::OnceLock;

/// Decoded bars and displayed percentage for one service.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ServiceUptime {
    pub uptime_pct: Option<f64>,
    /// Oldest first.
    pub uptime_days: Vec<UptimeDay>,
}

fn translate_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"translate\(\s*(-?\d+(?:\.\d+)?)").expect("translate regex is valid")
    })
}

fn percent_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(\d{1,3}(?:\.\d+)?)\s*%").expect("percent regex is valid"))
}

fn horizontal_position(rect: &RectSpec) -> Option<f64> {
    let x = rect
        .x
        .as_deref()
        .and_then(|x| x.trim().trim_end_matches("px").parse::<f64>().ok());
    let tx = rect
        .transform
        .as_deref()
        .and_then(|t| translate_regex().captures(t))
        .and_then(|c| c[1].parse::<f64>().ok());
    match (x, tx) {
        (None, None) => None,
        (x, tx) => Some(x.unwrap_or(0.0) + tx.unwrap_or(0.0)),
    }
}

/// Classify rectangles and order survivors left to right (oldest to newest).
///
/// Rectangles without a usable position keep their document position.
pub fn decode_rects(rects: &[RectSpec]) -> Vec<UptimeDay> {
    let mut cells: Vec<(f64, UptimeDay)> = rects
        .iter()
        .enumerate()
        .filter_map(|(idx, rect)| match classify_rect(rect) {
            Cell::Skip => None,
            Cell::Day(day) => Some((horizontal_position(rect).unwrap_or(idx as f64), day)),
        })
        .collect();
    cells.sort_by(|a, b| a.0.total_cmp(&b.0));
    cells.into_iter().map(|(_, day)| day).collect()
}

fn parse_percent(text: &str) -> Option<f64> {
    percent_regex()
        .captures(text)
        .and_then(|c| c[1].parse::<f64>().ok())
        .filter(|p| (0.0..=100.0).contains(p))
}

/// For each service, decode the nearest SVG bar that follows its name without
/// crossing into the next service's section.
///
/// Services with neither bars nor a percentage are absent from the map.
pub fn decode_uptime_bars(html: &str, service_names: &[String]) -> HashMap<String, ServiceUptime> {
    let tokens = tokenize(html);

    let mut known: HashMap<String, &str> = HashMap::new();
    for name in service_names {
        known.entry(normalize_name(name)).or_insert(name.as_str());
    }
    // Every occurrence of a known name, in document order.
    let occurrences: Vec<(usize, &str)> = tokens
        .iter()
        .enumerate()
        .filter_map(|(idx, t)| {
            let text = t.as_text()?;
            known.get(&normalize_name(text)).map(|&name| (idx, name))
        })
        .collect();

    let mut decoded = HashMap::new();
    for name in service_names {
        let Some(&(start, canonical)) = occurrences.iter().find(|(_, n)| *n == name.as_str())
        else {
            continue;
        };
        let bound = occurrences
            .iter()
            .find(|(idx, n)| *idx > start && *n != canonical)
            .map_or(tokens.len(), |(idx, _)| *idx);

        let section = &tokens[start + 1..bound];
        let uptime_days = section
            .iter()
            .find_map(|t| match t {
                DomToken::Svg { rects } if !rects.is_empty() => {
                    Some(decode_rects(rects)).filter(|days| !days.is_empty())
                }
                _ => None,
            })
            .unwrap_or_default();
        let uptime_pct = section
            .iter()
            .filter_map(DomToken::as_text)
            .find_map(parse_percent);

        if !uptime_days.is_empty() || uptime_pct.is_some() {
            decoded.insert(
                name.clone(),
                ServiceUptime {
                    uptime_pct,
                    uptime_days,
                },
            );
        }
    }
    decoded
}
