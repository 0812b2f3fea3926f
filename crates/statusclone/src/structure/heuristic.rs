//! Group and order inference from document position.
//!
//! Group headers are found by their "N components" count badges. The label is
//! the nearest preceding text that is not a known service, a status phrase or
//! a percentage. Each service's first occurrence joins the nearest preceding
//! group that still has room; a group never takes more services than its badge
//! declares. Display order is the order of first occurrences, with services
//! that never appear appended at the end.
//!
//! The assignment is greedy and has no second signal to cross-check against,
//! so a page whose badges disagree with its real nesting will be misattributed.

use super::{GroupAssignment, Structure, StructureInput, StructureStrategy};
use crate::dom::{tokenize, DomToken};
use crate::status::is_status_phrase;
use crate::types::{CloneResult, ExtractedService};
use async_trait::async_trait;
use regex::Regex;
use std::collections::{HashMap, HashSet};
use std::sync::OnceLock;

const MIN_BADGE_COUNT: usize = 1;
const MAX_BADGE_COUNT: usize = 200;

fn badge_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)^(.*?)\b(\d+)\s*components?\b").expect("badge regex is valid")
    })
}

fn split_badge_tail_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)^components?\b").expect("badge tail regex is valid"))
}

fn percentage_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\d{1,3}(?:[.,]\d+)?\s*%").expect("percentage regex is valid")
    })
}

/// Lowercased, whitespace-collapsed form used for name matching.
pub fn normalize_name(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// A declared group count found in the token stream.
#[derive(Debug, Clone, PartialEq)]
struct Badge {
    count: usize,
    /// Text before the count inside the same token ("Core (3 components)").
    prefix: Option<String>,
}

fn parse_badge(texts: &[&str], idx: usize) -> Option<Badge> {
    let text = texts[idx];
    let (count, prefix) = if let Some(caps) = badge_regex().captures(text) {
        let prefix = caps
            .get(1)
            .map(|m| m.as_str().trim().trim_end_matches(['(', '-', '·', '|', ':']).trim())
            .filter(|p| !p.is_empty())
            .map(str::to_string);
        (caps[2].parse::<usize>().ok()?, prefix)
    } else if text.chars().all(|c| c.is_ascii_digit()) {
        // Count and noun split across elements: <b>3</b> components
        let next = texts.get(idx + 1)?;
        if !split_badge_tail_regex().is_match(next) {
            return None;
        }
        (text.parse::<usize>().ok()?, None)
    } else {
        return None;
    };

    (MIN_BADGE_COUNT..=MAX_BADGE_COUNT)
        .contains(&count)
        .then_some(Badge { count, prefix })
}

struct GroupSlot {
    position: usize,
    label: String,
    remaining: usize,
}

/// Infer groups and order for `known` service names over document-order `texts`.
pub fn infer_groups(texts: &[&str], known: &[String]) -> (GroupAssignment, Vec<String>) {
    let mut by_norm: HashMap<String, &str> = HashMap::new();
    for name in known {
        by_norm.entry(normalize_name(name)).or_insert(name.as_str());
    }
    let is_known = |t: &str| by_norm.contains_key(&normalize_name(t));

    let is_label_candidate = |t: &str| {
        t.chars().any(char::is_alphabetic)
            && !is_known(t)
            && !is_status_phrase(t)
            && !percentage_regex().is_match(t)
            && !badge_regex().is_match(t)
            && !split_badge_tail_regex().is_match(t)
    };

    let mut slots: Vec<GroupSlot> = Vec::new();
    for idx in 0..texts.len() {
        let Some(badge) = parse_badge(texts, idx) else {
            continue;
        };
        let label = badge
            .prefix
            .filter(|p| is_label_candidate(p))
            .or_else(|| {
                (0..idx)
                    .rev()
                    .find(|&j| is_label_candidate(texts[j]))
                    .map(|j| texts[j].to_string())
            });
        if let Some(label) = label {
            slots.push(GroupSlot {
                position: idx,
                label,
                remaining: badge.count,
            });
        }
    }

    let mut groups = GroupAssignment::new();
    let mut order = Vec::new();
    let mut seen: HashSet<&str> = HashSet::new();

    for (idx, text) in texts.iter().enumerate() {
        let Some(&name) = by_norm.get(&normalize_name(text)) else {
            continue;
        };
        if !seen.insert(name) {
            continue;
        }
        order.push(name.to_string());
        if let Some(slot) = slots
            .iter_mut()
            .rev()
            .find(|s| s.position < idx && s.remaining > 0)
        {
            slot.remaining -= 1;
            groups.insert(name.to_string(), slot.label.clone());
        }
    }

    for name in known {
        if seen.insert(name.as_str()) {
            order.push(name.clone());
        }
    }

    (groups, order)
}

/// Apply inferred groups and order to the known services.
pub fn infer_structure(reduced_html: &str, known: &[ExtractedService]) -> Structure {
    let tokens = tokenize(reduced_html);
    let texts: Vec<&str> = tokens.iter().filter_map(DomToken::as_text).collect();
    let names: Vec<String> = known.iter().map(|s| s.name.clone()).collect();
    let (groups, order) = infer_groups(&texts, &names);

    let by_name: HashMap<&str, &ExtractedService> =
        known.iter().map(|s| (s.name.as_str(), s)).collect();
    let services = order
        .iter()
        .filter_map(|name| by_name.get(name.as_str()))
        .map(|svc| {
            let mut svc = (*svc).clone();
            svc.group = groups.get(&svc.name).cloned();
            svc
        })
        .collect();

    Structure {
        services,
        groups,
        order,
        page_name: None,
        source: "heuristic",
    }
}

/// Needs service names from the platform API; infers everything else from markup.
pub struct HeuristicStrategy;

#[async_trait]
impl StructureStrategy for HeuristicStrategy {
    fn name(&self) -> &'static str {
        "heuristic"
    }

    async fn attempt(&self, input: &StructureInput<'_>) -> CloneResult<Option<Structure>> {
        if input.known_services.is_empty() {
            return Ok(None);
        }
        let page_name = input.platform.and_then(|p| p.name.clone());
        Ok(Some(
            infer_structure(input.reduced_html, input.known_services).with_page_name(page_name),
        ))
    }
}
