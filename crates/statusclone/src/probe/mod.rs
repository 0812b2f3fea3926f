// Copyright 2026 Statusclone Contributors
// SPDX-License-Identifier: Apache-2.0

//! Platform probe: detect a hosted status-page API at the page's origin.
//!
//! A miss is never an error. Any non-success answer means "fall back to
//! generic scraping".

pub mod statuspage;

use crate::acquisition::http_client::HttpClient;
use crate::status::service_status_from_text;
use crate::types::{ExtractedResult, ExtractedService};
use statuspage::{ComponentRecord, ComponentsRecord, SummaryRecord, COMPONENTS_PATH, SUMMARY_PATH};
use std::collections::{HashMap, HashSet};
use tracing::{debug, info};

/// What the platform API told us about the page.
#[derive(Debug, Clone, Default)]
pub struct PlatformPage {
    /// `scheme://host[:port]` the API lives under.
    pub origin: String,
    pub name: Option<String>,
    /// Merged component listing, group headers included.
    pub components: Vec<ComponentRecord>,
}

impl PlatformPage {
    /// True when the API exposes explicit group identifiers.
    pub fn has_hierarchy(&self) -> bool {
        self.components
            .iter()
            .any(|c| c.group || c.group_id.as_deref().is_some_and(|g| !g.is_empty()))
    }

    fn is_group_header(&self, component: &ComponentRecord) -> bool {
        component.group
            || component.components.as_ref().is_some_and(|c| !c.is_empty())
    }

    fn group_name_of(&self, component: &ComponentRecord) -> Option<String> {
        if let Some(group_id) = component.group_id.as_deref().filter(|g| !g.is_empty()) {
            if let Some(parent) = self.components.iter().find(|c| c.id == group_id) {
                return Some(parent.name.clone());
            }
        }
        self.components
            .iter()
            .find(|c| {
                c.components
                    .as_ref()
                    .is_some_and(|ids| ids.iter().any(|id| id == &component.id))
            })
            .map(|c| c.name.clone())
    }

    /// Services (group headers excluded), ordered by group position then item position.
    ///
    /// Without hierarchy every service is top level, ordered by its own position.
    pub fn services(&self) -> Vec<ExtractedService> {
        let position_of: HashMap<&str, i64> = self
            .components
            .iter()
            .map(|c| (c.name.as_str(), c.position.unwrap_or(i64::MAX)))
            .collect();

        let mut keyed: Vec<((i64, u8, i64), ExtractedService)> = self
            .components
            .iter()
            .filter(|c| !c.name.trim().is_empty() && !self.is_group_header(c))
            .map(|c| {
                let own = c.position.unwrap_or(i64::MAX);
                let mut svc = ExtractedService::new(c.name.trim(), service_status_from_text(&c.status));
                let key = match self.group_name_of(c) {
                    Some(group) => {
                        let group_pos = position_of.get(group.as_str()).copied().unwrap_or(own);
                        svc.group = Some(group);
                        (group_pos, 1, own)
                    }
                    None => (own, 0, 0),
                };
                (key, svc)
            })
            .collect();

        // Stable: ties keep API order.
        keyed.sort_by_key(|(key, _)| *key);
        keyed.into_iter().map(|(_, svc)| svc).collect()
    }

    /// Names of every service the API lists, in display order.
    pub fn service_names(&self) -> Vec<String> {
        self.services().into_iter().map(|s| s.name).collect()
    }

    /// Best-effort payload built purely from API data.
    pub fn to_result(&self) -> ExtractedResult {
        ExtractedResult {
            name: self.name.clone().unwrap_or_default(),
            services: self.services(),
            ..Default::default()
        }
    }
}

/// Probe the summary endpoint at `origin`, merging in the complete component
/// listing when the primary one is truncated.
///
/// Returns `None` when the summary endpoint is absent or unusable. A present API
/// with zero components yields `Some` with no components.
pub async fn probe_known_platform(http: &HttpClient, origin: &str) -> Option<PlatformPage> {
    let origin = origin.trim_end_matches('/');
    let summary_url = format!("{origin}{SUMMARY_PATH}");
    let components_url = format!("{origin}{COMPONENTS_PATH}");

    let (summary, listing) = tokio::join!(
        http.get_json::<SummaryRecord>(&summary_url),
        http.get_json::<ComponentsRecord>(&components_url),
    );

    let summary = match summary {
        Ok(Some(s)) => s,
        Ok(None) => {
            debug!("no platform API at {origin}");
            return None;
        }
        Err(e) => {
            debug!("platform probe for {origin} failed: {e}");
            return None;
        }
    };

    let mut components = summary.components;
    if let Ok(Some(listing)) = listing {
        let known: HashSet<String> = components.iter().map(identity_key).collect();
        let extra: Vec<ComponentRecord> = listing
            .components
            .into_iter()
            .filter(|c| !known.contains(&identity_key(c)))
            .collect();
        if !extra.is_empty() {
            info!("merged {} components missing from the summary listing", extra.len());
            components.extend(extra);
        }
    }

    Some(PlatformPage {
        origin: origin.to_string(),
        name: summary
            .page
            .and_then(|p| p.name)
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty()),
        components,
    })
}

fn identity_key(component: &ComponentRecord) -> String {
    if component.id.is_empty() {
        format!("name:{}", component.name.trim().to_lowercase())
    } else {
        component.id.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ServiceStatus;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn component(id: &str, name: &str, position: i64) -> ComponentRecord {
        ComponentRecord {
            id: id.into(),
            name: name.into(),
            status: "operational".into(),
            position: Some(position),
            ..Default::default()
        }
    }

    #[test]
    fn test_hierarchy_sorted_by_group_then_item() {
        let mut group = component("g", "Core", 1);
        group.group = true;
        group.components = Some(vec!["b".into(), "a".into()]);
        let mut a = component("a", "API", 2);
        a.group_id = Some("g".into());
        let mut b = component("b", "Auth", 1);
        b.group_id = Some("g".into());
        b.status = "partial_outage".into();
        let web = component("w", "Website", 0);

        let page = PlatformPage {
            components: vec![a, web, group, b],
            ..Default::default()
        };
        assert!(page.has_hierarchy());
        let services = page.services();
        let names: Vec<&str> = services.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["Website", "Auth", "API"]);
        assert_eq!(services[1].group.as_deref(), Some("Core"));
        assert_eq!(services[1].status, ServiceStatus::Partial);
        assert_eq!(services[0].group, None);
    }

    #[test]
    fn test_flat_listing_has_no_hierarchy() {
        let page = PlatformPage {
            components: vec![component("a", "API", 2), component("b", "Web", 1)],
            ..Default::default()
        };
        assert!(!page.has_hierarchy());
        assert_eq!(page.service_names(), vec!["Web", "API"]);
    }

    #[tokio::test]
    async fn test_probe_merges_secondary_listing() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(SUMMARY_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "page": {"name": "Acme"},
                "components": [{"id": "a", "name": "API", "status": "operational", "position": 1}]
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(COMPONENTS_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "components": [
                    {"id": "a", "name": "API", "status": "operational", "position": 1},
                    {"id": "b", "name": "Billing", "status": "major_outage", "position": 2}
                ]
            })))
            .mount(&server)
            .await;

        let http = HttpClient::new(5_000);
        let page = probe_known_platform(&http, &server.uri()).await.unwrap();
        assert_eq!(page.name.as_deref(), Some("Acme"));
        assert_eq!(page.components.len(), 2);
        assert_eq!(page.services()[1].status, ServiceStatus::Major);
    }

    #[tokio::test]
    async fn test_probe_miss_is_none() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        let http = HttpClient::new(5_000);
        assert!(probe_known_platform(&http, &server.uri()).await.is_none());
    }

    #[tokio::test]
    async fn test_probe_zero_components_is_found_nothing() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(SUMMARY_PATH))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"components": []})),
            )
            .mount(&server)
            .await;
        let http = HttpClient::new(5_000);
        let page = probe_known_platform(&http, &server.uri()).await.unwrap();
        assert!(page.components.is_empty());
        assert!(page.services().is_empty());
    }
}
