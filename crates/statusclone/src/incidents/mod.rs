// Copyright 2026 Statusclone Contributors
// SPDX-License-Identifier: Apache-2.0

//! Incident extraction.
//!
//! Two sources: the hosted platform's incident API, or the page markup read
//! by the completion collaborator (plus a linked history page when one
//! exists). Either way, incidents with a thin timeline get their detail page
//! fetched in bounded batches. Failures there are logged and skipped.

pub mod platform;
pub mod scrape;
pub mod timeline;

use crate::acquisition::batch::run_in_batches;
use crate::acquisition::Fetcher;
use crate::ai::StructuredExtractor;
use crate::progress::Reporter;
use crate::types::{CloneResult, ExtractedIncident, ExtractedIncidentUpdate};
use chrono::{DateTime, FixedOffset};
use tracing::{debug, info, warn};

/// Where incidents come from.
#[derive(Debug, Clone, Copy)]
pub enum IncidentSource<'a> {
    /// Hosted platform detected at `origin`.
    Platform { origin: &'a str },
    /// Rendered page markup.
    Page { url: &'a str, html: &'a str },
}

fn created(incident: &ExtractedIncident) -> Option<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc3339(incident.created_at.trim()).ok()
}

/// Newest first by creation time. Undated incidents keep their relative
/// order after the dated ones.
pub fn sort_newest_first(incidents: &mut [ExtractedIncident]) {
    incidents.sort_by(|a, b| created(b).cmp(&created(a)));
}

pub struct IncidentExtractor {
    fetcher: Fetcher,
    ai: Option<StructuredExtractor>,
}

impl IncidentExtractor {
    pub fn new(fetcher: Fetcher, ai: Option<StructuredExtractor>) -> Self {
        Self { fetcher, ai }
    }

    pub async fn extract(
        &self,
        source: IncidentSource<'_>,
        reporter: &Reporter,
    ) -> CloneResult<Vec<ExtractedIncident>> {
        let mut incidents = match source {
            IncidentSource::Platform { origin } => {
                match platform::fetch_platform_incidents(self.fetcher.http(), origin).await {
                    Some(list) => list,
                    None => {
                        debug!("no incident API at {origin}");
                        Vec::new()
                    }
                }
            }
            IncidentSource::Page { url, html } => self.from_page(url, html, reporter).await?,
        };

        sort_newest_first(&mut incidents);
        incidents.truncate(self.fetcher.config().max_history_incidents);

        match source {
            IncidentSource::Platform { .. } => {
                self.enrich(&mut incidents, platform::needs_enrichment, reporter)
                    .await
            }
            IncidentSource::Page { .. } => {
                self.enrich(&mut incidents, |i| i.updates.len() <= 1, reporter)
                    .await
            }
        }

        for incident in &mut incidents {
            incident.strip_transient();
        }
        info!("extracted {} incidents", incidents.len());
        Ok(incidents)
    }

    async fn from_page(
        &self,
        url: &str,
        html: &str,
        reporter: &Reporter,
    ) -> CloneResult<Vec<ExtractedIncident>> {
        let Some(ai) = &self.ai else {
            debug!("no completion provider; skipping markup incidents");
            return Ok(Vec::new());
        };

        let history = scrape::find_history_link(html, url);
        let mut incidents = scrape::extract_incident_list(ai, html, url).await?;

        if let Some(history_url) = history {
            reporter.report("Loading incident history");
            match self.fetcher.fetch_rendered(&history_url).await {
                Ok(doc) => match scrape::extract_incident_list(ai, &doc.html, &doc.url).await {
                    Ok(more) => scrape::merge_by_title(&mut incidents, more),
                    Err(e) => warn!("history extraction from {history_url} failed: {e}"),
                },
                Err(e) => warn!("history page {history_url} unavailable: {e}"),
            }
        }
        Ok(incidents)
    }

    /// Deterministic timeline first; the collaborator only when that finds
    /// at most one update.
    async fn detail_timeline(&self, url: &str) -> CloneResult<Vec<ExtractedIncidentUpdate>> {
        let doc = self.fetcher.fetch_document(url).await?;
        let updates = timeline::timeline_from_html(&doc.html);
        if updates.len() > 1 {
            return Ok(updates);
        }
        let Some(ai) = &self.ai else {
            return Ok(updates);
        };
        match scrape::extract_incident_detail(ai, &doc.html, &doc.url).await? {
            Some(detail) if detail.updates.len() > updates.len() => Ok(detail.updates),
            _ => Ok(updates),
        }
    }

    async fn enrich<F>(&self, incidents: &mut [ExtractedIncident], wants: F, reporter: &Reporter)
    where
        F: Fn(&ExtractedIncident) -> bool,
    {
        let targets: Vec<(usize, String)> = incidents
            .iter()
            .enumerate()
            .filter(|(_, i)| wants(i))
            .filter_map(|(idx, i)| Some((idx, i.detail_url.clone()?)))
            .collect();
        if targets.is_empty() {
            return;
        }
        reporter.report(format!("Loading details for {} incidents", targets.len()));

        let batch_size = self.fetcher.config().detail_batch_size;
        let results = run_in_batches(targets, batch_size, |(idx, url)| async move {
            (idx, self.detail_timeline(&url).await)
        })
        .await;

        for (idx, result) in results {
            let incident = &mut incidents[idx];
            match result {
                Ok(scraped) if scraped.is_empty() => {
                    debug!("no timeline found for \"{}\"", incident.title);
                }
                Ok(scraped) => {
                    if incident.api_id.is_some() {
                        incident.updates = platform::merge_updates(&incident.updates, scraped);
                    } else if scraped.len() > incident.updates.len() {
                        incident.updates = scraped;
                    }
                    if incident.created_at.is_empty() {
                        if let Some(oldest) = incident.updates.iter().rev().find(|u| !u.timestamp.is_empty()) {
                            incident.created_at = oldest.timestamp.clone();
                        }
                    }
                }
                Err(e) => {
                    warn!("detail page for \"{}\" failed: {e}", incident.title);
                    reporter.report(format!("Skipped details for \"{}\"", incident.title));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::testing::ScriptedProvider;
    use crate::config::{CompletionLimits, PipelineConfig};
    use crate::probe::statuspage::{INCIDENTS_PATH, UNRESOLVED_INCIDENTS_PATH};
    use crate::types::IncidentStatus;
    use serde_json::json;
    use std::sync::Arc;
    use wiremock::matchers::path;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const DETAIL: &str = r#"<html><body>
      <div class="update-row"><div>Resolved</div><div>All clear.</div><div>Posted Jan 05, 2024 - 10:00 UTC</div></div>
      <div class="update-row"><div>Investigating</div><div>Users report login failures.</div><div>Posted Jan 05, 2024 - 09:00 UTC</div></div>
    </body></html>"#;

    fn incident(title: &str, created_at: &str) -> ExtractedIncident {
        ExtractedIncident {
            title: title.into(),
            created_at: created_at.into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_sort_newest_first() {
        let mut list = vec![
            incident("old", "2024-01-01T00:00:00Z"),
            incident("undated", ""),
            incident("new", "2024-03-01T00:00:00+00:00"),
        ];
        sort_newest_first(&mut list);
        let titles: Vec<&str> = list.iter().map(|i| i.title.as_str()).collect();
        assert_eq!(titles, vec!["new", "old", "undated"]);
    }

    #[tokio::test]
    async fn test_platform_incidents_enriched_from_detail_page() {
        let server = MockServer::start().await;
        Mock::given(path(INCIDENTS_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "incidents": [{
                    "id": "abc", "name": "Login failures", "status": "resolved", "impact": "major",
                    "created_at": "2024-01-05T09:00:00Z",
                    "incident_updates": [
                        {"status": "resolved", "body": "", "display_at": "2024-01-05T10:00:00Z"},
                        {"status": "investigating", "body": "", "display_at": "2024-01-05T09:00:00Z"}
                    ]
                }]
            })))
            .mount(&server)
            .await;
        Mock::given(path(UNRESOLVED_INCIDENTS_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"incidents": []})))
            .mount(&server)
            .await;
        Mock::given(path("/incidents/abc"))
            .respond_with(ResponseTemplate::new(200).set_body_string(DETAIL))
            .mount(&server)
            .await;

        let extractor = IncidentExtractor::new(Fetcher::http_only(PipelineConfig::default()), None);
        let origin = server.uri();
        let incidents = extractor
            .extract(IncidentSource::Platform { origin: &origin }, &Reporter::silent())
            .await
            .unwrap();

        assert_eq!(incidents.len(), 1);
        let updates = &incidents[0].updates;
        assert_eq!(updates.len(), 2);
        assert_eq!(updates[0].message, "All clear.");
        assert_eq!(updates[0].status, IncidentStatus::Resolved);
        assert_eq!(updates[1].message, "Users report login failures.");
        assert!(incidents[0].detail_url.is_none());
        assert!(incidents[0].api_id.is_none());
    }

    #[tokio::test]
    async fn test_failed_detail_page_is_skipped() {
        let server = MockServer::start().await;
        Mock::given(path(INCIDENTS_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "incidents": [{"id": "x", "name": "Outage", "status": "investigating", "impact": "minor",
                               "incident_updates": [{"status": "investigating", "body": ""}]}]
            })))
            .mount(&server)
            .await;

        let extractor = IncidentExtractor::new(Fetcher::http_only(PipelineConfig::default()), None);
        let origin = server.uri();
        let incidents = extractor
            .extract(IncidentSource::Platform { origin: &origin }, &Reporter::silent())
            .await
            .unwrap();
        assert_eq!(incidents.len(), 1);
        assert_eq!(incidents[0].updates.len(), 1);
    }

    #[tokio::test]
    async fn test_page_incidents_with_history_and_detail() {
        let server = MockServer::start().await;
        Mock::given(path("/history"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<ul><li>Older outage</li></ul>"))
            .mount(&server)
            .await;
        Mock::given(path("/incidents/7"))
            .respond_with(ResponseTemplate::new(200).set_body_string(DETAIL))
            .mount(&server)
            .await;

        let provider = Arc::new(ScriptedProvider::json(vec![
            json!({"incidents": [
                {"title": "Login failures", "status": "resolved", "impact": "major",
                 "createdAt": "2024-01-05T09:00:00Z", "detailUrl": "/incidents/7",
                 "updates": [{"status": "resolved", "message": "Fixed", "timestamp": "2024-01-05T10:00:00Z"}]}
            ]}),
            json!({"incidents": [
                {"title": "login failures", "createdAt": "2024-01-05T09:00:00Z",
                 "updates": [{"status": "resolved", "message": "dup", "timestamp": "x"}, {"message": "dup2", "timestamp": "y"}]},
                {"title": "Older outage", "status": "resolved", "createdAt": "2023-12-01T00:00:00Z",
                 "updates": [{"status": "resolved", "message": "Old", "timestamp": "2023-12-01T01:00:00Z"},
                             {"status": "investigating", "message": "Older", "timestamp": "2023-12-01T00:00:00Z"}]}
            ]}),
        ]));
        let ai = StructuredExtractor::new(provider.clone(), CompletionLimits::default());
        let extractor =
            IncidentExtractor::new(Fetcher::http_only(PipelineConfig::default()), Some(ai));

        let url = format!("{}/", server.uri());
        let html = r#"<h2>Past incidents</h2><a href="/history">Incident history</a>"#;
        let incidents = extractor
            .extract(IncidentSource::Page { url: &url, html }, &Reporter::silent())
            .await
            .unwrap();

        assert_eq!(provider.calls(), 2);
        let titles: Vec<&str> = incidents.iter().map(|i| i.title.as_str()).collect();
        assert_eq!(titles, vec!["Login failures", "Older outage"]);
        assert_eq!(incidents[0].updates.len(), 2);
        assert_eq!(incidents[0].updates[1].message, "Users report login failures.");
    }
}
