//! Incidents read off the page markup with the completion collaborator.

use crate::acquisition::page_meta::resolve_link;
use crate::ai::{prompts, CompletionRequest, StructuredExtractor};
use crate::reduce::reduce_for_services;
use crate::status::{impact_from_platform, incident_status_from_platform};
use crate::types::{
    CloneResult, ExtractedIncident, ExtractedIncidentUpdate, Impact, ServiceStatus,
};
use regex::Regex;
use scraper::{Html, Selector};
use serde::Deserialize;
use std::collections::HashSet;
use std::sync::OnceLock;

fn history_href_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)(/history\b|incident[-_]?history|past[-_]incidents|/incidents/?(?:$|\?))")
            .expect("history href regex is valid")
    })
}

fn history_text_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\b(incident history|past incidents|view history|history)\b")
            .expect("history text regex is valid")
    })
}

#[derive(Debug, Default, Deserialize)]
struct IncidentsPayload {
    #[serde(default)]
    incidents: Vec<IncidentPayload>,
}

/// One incident as the collaborator returns it.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct IncidentPayload {
    #[serde(default)]
    title: String,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    impact: Option<String>,
    #[serde(default)]
    created_at: Option<String>,
    #[serde(default)]
    detail_url: Option<String>,
    #[serde(default)]
    updates: Vec<UpdatePayload>,
}

#[derive(Debug, Default, Deserialize)]
struct UpdatePayload {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    timestamp: Option<String>,
}

/// Local impact names first, then the platform's vocabulary.
fn parse_impact(value: &str) -> Impact {
    match value.trim().to_lowercase().as_str() {
        "degraded" => ServiceStatus::Degraded,
        "partial" => ServiceStatus::Partial,
        "major" => ServiceStatus::Major,
        other => impact_from_platform(other),
    }
}

impl IncidentPayload {
    /// Normalize into the output shape. `base` resolves a relative detail link.
    pub(crate) fn into_incident(self, base: &str) -> Option<ExtractedIncident> {
        let title = self.title.trim().to_string();
        if title.is_empty() {
            return None;
        }
        let updates: Vec<ExtractedIncidentUpdate> = self
            .updates
            .into_iter()
            .filter_map(|u| {
                let message = u.message.unwrap_or_default().trim().to_string();
                let timestamp = u.timestamp.unwrap_or_default().trim().to_string();
                if message.is_empty() && timestamp.is_empty() {
                    return None;
                }
                Some(ExtractedIncidentUpdate {
                    status: incident_status_from_platform(u.status.as_deref().unwrap_or_default()),
                    message,
                    timestamp,
                })
            })
            .collect();

        let status = match self.status.as_deref().filter(|s| !s.trim().is_empty()) {
            Some(s) => incident_status_from_platform(s),
            None => updates.first().map(|u| u.status).unwrap_or_default(),
        };
        let created_at = self
            .created_at
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty() && !c.eq_ignore_ascii_case("null"))
            .or_else(|| {
                updates
                    .iter()
                    .rev()
                    .find(|u| !u.timestamp.is_empty())
                    .map(|u| u.timestamp.clone())
            })
            .unwrap_or_default();

        Some(ExtractedIncident {
            title,
            status,
            impact: self.impact.as_deref().map_or(ServiceStatus::Major, parse_impact),
            created_at,
            updates,
            detail_url: self.detail_url.and_then(|href| resolve_link(base, &href)),
            api_id: None,
        })
    }
}

/// Link to a separate incident-history page, if the page has one.
pub fn find_history_link(html: &str, base: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let anchors = Selector::parse("a[href]").expect("static selector is valid");
    let base_trimmed = base.trim_end_matches('/');

    let mut by_text = None;
    for a in document.select(&anchors) {
        let href = a.value().attr("href").unwrap_or_default();
        let Some(resolved) = resolve_link(base, href) else {
            continue;
        };
        if resolved.trim_end_matches('/') == base_trimmed {
            continue;
        }
        if history_href_regex().is_match(href) {
            return Some(resolved);
        }
        let text = a.text().collect::<String>();
        if by_text.is_none() && history_text_regex().is_match(&text) {
            by_text = Some(resolved);
        }
    }
    by_text
}

/// Ask for every incident on a page.
pub async fn extract_incident_list(
    extractor: &StructuredExtractor,
    html: &str,
    base: &str,
) -> CloneResult<Vec<ExtractedIncident>> {
    let reduced = reduce_for_services(html);
    let request = CompletionRequest::new(prompts::system(), prompts::INCIDENTS).with_document(reduced);
    let payload: IncidentsPayload = extractor
        .complete_json(request, "incident extraction")
        .await?;
    Ok(payload
        .incidents
        .into_iter()
        .filter_map(|p| p.into_incident(base))
        .collect())
}

/// Ask for the full timeline of a single-incident page.
pub async fn extract_incident_detail(
    extractor: &StructuredExtractor,
    html: &str,
    url: &str,
) -> CloneResult<Option<ExtractedIncident>> {
    let reduced = reduce_for_services(html);
    let request =
        CompletionRequest::new(prompts::system(), prompts::INCIDENT_DETAIL).with_document(reduced);
    let payload: IncidentPayload = extractor
        .complete_json(request, "incident detail extraction")
        .await?;
    Ok(payload.into_incident(url))
}

fn title_key(title: &str) -> String {
    title
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Append `extra` incidents whose title is not already present.
pub fn merge_by_title(primary: &mut Vec<ExtractedIncident>, extra: Vec<ExtractedIncident>) {
    let mut seen: HashSet<String> = primary.iter().map(|i| title_key(&i.title)).collect();
    for incident in extra {
        if seen.insert(title_key(&incident.title)) {
            primary.push(incident);
        }
    }
}
