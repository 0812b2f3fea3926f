// Copyright 2026 Statusclone Contributors
// SPDX-License-Identifier: Apache-2.0

//! Status vocabulary shared by every extraction strategy.
//!
//! Lexical cues are matched per word, case-insensitively, so `up` never matches
//! inside `update`. Ambiguous input maps to the least alarming status.

use crate::types::{Impact, IncidentStatus, ServiceStatus};

const MAINTENANCE_CUES: &[&str] = &["blue", "maintenance", "scheduled"];
const MAJOR_CUES: &[&str] = &["red", "down", "major"];
const PARTIAL_CUES: &[&str] = &["orange", "partial"];
const DEGRADED_CUES: &[&str] = &["yellow", "degraded", "slow"];
const OPERATIONAL_CUES: &[&str] = &["green", "up", "operational"];

/// Words that only ever describe a status, never a service or group name.
const STATUS_VOCABULARY: &[&str] = &[
    "operational",
    "degraded",
    "performance",
    "partial",
    "major",
    "minor",
    "outage",
    "under",
    "maintenance",
    "scheduled",
    "down",
    "up",
    "all",
    "systems",
    "normal",
    "investigating",
    "identified",
    "monitoring",
    "resolved",
];

fn words(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(|w| w.to_lowercase())
}

fn has_cue(words: &[String], cues: &[&str]) -> bool {
    words.iter().any(|w| cues.contains(&w.as_str()))
}

/// Map free text (a label, a class name, a platform enum) to a service status.
pub fn service_status_from_text(text: &str) -> ServiceStatus {
    let words: Vec<String> = words(text).collect();
    if has_cue(&words, MAINTENANCE_CUES) {
        ServiceStatus::Maintenance
    } else if has_cue(&words, MAJOR_CUES) {
        ServiceStatus::Major
    } else if has_cue(&words, PARTIAL_CUES) {
        ServiceStatus::Partial
    } else if has_cue(&words, DEGRADED_CUES) {
        ServiceStatus::Degraded
    } else {
        ServiceStatus::Operational
    }
}

/// Whether `text` carries a recognizable status cue at all.
pub fn has_status_cue(text: &str) -> bool {
    let words: Vec<String> = words(text).collect();
    [
        MAINTENANCE_CUES,
        MAJOR_CUES,
        PARTIAL_CUES,
        DEGRADED_CUES,
        OPERATIONAL_CUES,
    ]
    .iter()
    .any(|cues| has_cue(&words, cues))
}

/// True when every word of `text` belongs to the status vocabulary
/// ("Operational", "Partial Outage", "Under Maintenance", ...).
pub fn is_status_phrase(text: &str) -> bool {
    let mut any = false;
    for w in words(text) {
        if !STATUS_VOCABULARY.contains(&w.as_str()) {
            return false;
        }
        any = true;
    }
    any
}

/// Map a platform incident status to the local enum. Unknown values are
/// treated as a fresh incident.
pub fn incident_status_from_platform(value: &str) -> IncidentStatus {
    match value.trim().to_lowercase().replace([' ', '-'], "_").as_str() {
        "investigating" => IncidentStatus::Investigating,
        "identified" => IncidentStatus::Identified,
        "monitoring" | "verifying" => IncidentStatus::Monitoring,
        "resolved" | "postmortem" | "completed" => IncidentStatus::Resolved,
        "scheduled" | "in_progress" | "maintenance" => IncidentStatus::Maintenance,
        _ => IncidentStatus::Investigating,
    }
}

/// Map a platform impact level to the local enum. Unknown values are
/// treated as a major outage.
pub fn impact_from_platform(value: &str) -> Impact {
    match value.trim().to_lowercase().as_str() {
        "none" | "operational" => ServiceStatus::Operational,
        "minor" | "degraded" => ServiceStatus::Degraded,
        "major" | "partial" => ServiceStatus::Partial,
        "critical" => ServiceStatus::Major,
        "maintenance" => ServiceStatus::Maintenance,
        _ => ServiceStatus::Major,
    }
}

/// Timeline section headings as they appear on incident detail pages.
///
/// Returns `None` when the line is not exactly a heading.
pub fn timeline_heading(line: &str) -> Option<IncidentStatus> {
    match line.trim().to_lowercase().as_str() {
        "investigating" => Some(IncidentStatus::Investigating),
        "identified" => Some(IncidentStatus::Identified),
        "monitoring" | "verifying" => Some(IncidentStatus::Monitoring),
        "resolved" | "postmortem" | "completed" => Some(IncidentStatus::Resolved),
        "scheduled" | "in progress" => Some(IncidentStatus::Maintenance),
        // Generic progress notes carry no state of their own.
        "update" => Some(IncidentStatus::Investigating),
        _ => None,
    }
}
