//! Incidents from the hosted platform's public API.

use crate::acquisition::http_client::HttpClient;
use crate::probe::statuspage::{
    IncidentRecord, IncidentsRecord, INCIDENTS_PATH, UNRESOLVED_INCIDENTS_PATH,
};
use crate::status::{impact_from_platform, incident_status_from_platform};
use crate::types::{ExtractedIncident, ExtractedIncidentUpdate};
use std::collections::HashSet;
use tracing::debug;

/// Fetch the incident listing and the unresolved listing concurrently and
/// merge them by id. `None` when neither endpoint answered.
pub async fn fetch_platform_incidents(
    http: &HttpClient,
    origin: &str,
) -> Option<Vec<ExtractedIncident>> {
    let listing_url = format!("{origin}{INCIDENTS_PATH}");
    let unresolved_url = format!("{origin}{UNRESOLVED_INCIDENTS_PATH}");
    let (listing, unresolved) = tokio::join!(
        http.get_json::<IncidentsRecord>(&listing_url),
        http.get_json::<IncidentsRecord>(&unresolved_url),
    );
    let listing = listing.unwrap_or_else(|e| {
        debug!("incident listing failed: {e}");
        None
    });
    let unresolved = unresolved.unwrap_or_else(|e| {
        debug!("unresolved listing failed: {e}");
        None
    });
    if listing.is_none() && unresolved.is_none() {
        return None;
    }

    let mut seen = HashSet::new();
    let incidents = listing
        .into_iter()
        .chain(unresolved)
        .flat_map(|r| r.incidents)
        .filter(|r| r.id.is_empty() || seen.insert(r.id.clone()))
        .map(|r| map_incident(r, origin))
        .collect();
    Some(incidents)
}

/// Convert one API record. Update messages may be empty when the listing
/// omits bodies.
pub fn map_incident(record: IncidentRecord, origin: &str) -> ExtractedIncident {
    let updates: Vec<ExtractedIncidentUpdate> = record
        .incident_updates
        .iter()
        .map(|u| ExtractedIncidentUpdate {
            status: incident_status_from_platform(&u.status),
            message: u.body.as_deref().unwrap_or_default().trim().to_string(),
            timestamp: u.timestamp().unwrap_or_default().to_string(),
        })
        .collect();

    let created_at = record
        .created_at
        .clone()
        .filter(|c| !c.is_empty())
        .or_else(|| updates.last().map(|u| u.timestamp.clone()))
        .unwrap_or_default();

    let detail_url = match record.shortlink.as_deref().filter(|s| !s.is_empty()) {
        Some(link) => Some(link.to_string()),
        None if !record.id.is_empty() => Some(format!("{origin}/incidents/{}", record.id)),
        None => None,
    };

    ExtractedIncident {
        title: record.name.trim().to_string(),
        status: incident_status_from_platform(&record.status),
        impact: impact_from_platform(&record.impact),
        created_at,
        updates,
        detail_url,
        api_id: Some(record.id).filter(|id| !id.is_empty()),
    }
}

/// True when the timeline is missing messages worth scraping for.
pub fn needs_enrichment(incident: &ExtractedIncident) -> bool {
    incident.updates.is_empty() || incident.updates.iter().any(|u| u.message.is_empty())
}

/// Combine API updates with scraped ones, both newest first, by position.
///
/// API status and timestamp win; scraped text fills empty messages. Scraped
/// updates past the API's count are appended.
pub fn merge_updates(
    api: &[ExtractedIncidentUpdate],
    scraped: Vec<ExtractedIncidentUpdate>,
) -> Vec<ExtractedIncidentUpdate> {
    let mut scraped = scraped.into_iter();
    let mut merged: Vec<ExtractedIncidentUpdate> = api
        .iter()
        .map(|a| {
            let s = scraped.next();
            let mut update = a.clone();
            if update.message.is_empty() {
                if let Some(s) = &s {
                    update.message = s.message.clone();
                }
            }
            if update.timestamp.is_empty() {
                if let Some(s) = s {
                    update.timestamp = s.timestamp;
                }
            }
            update
        })
        .collect();
    merged.extend(scraped);
    merged
}
