// Copyright 2026 Statusclone Contributors
// SPDX-License-Identifier: Apache-2.0

//! Committing a clone result to a status-page store.
//!
//! The store is a narrow "insert rows, get ids back" seam. Rows go in entity
//! groups: services, then uptime days, then incidents, then their updates.
//! A failure part way leaves earlier groups committed; callers that need
//! atomicity across groups must provide it in their store.

use crate::types::{
    CloneError, CloneResult, ExtractedResult, Impact, IncidentStatus, ServiceStatus,
};
use crate::uptime::anchor::day_at;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceRow {
    pub status_page_id: String,
    pub name: String,
    pub status: ServiceStatus,
    pub group_name: Option<String>,
    pub display_order: u32,
    pub uptime_pct: Option<f64>,
}

/// One known day. Days without data are not stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UptimeDayRow {
    pub service_id: String,
    /// `YYYY-MM-DD`.
    pub day: String,
    pub up: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncidentRow {
    pub status_page_id: String,
    pub title: String,
    pub status: IncidentStatus,
    pub impact: Impact,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncidentUpdateRow {
    pub incident_id: String,
    pub status: IncidentStatus,
    pub message: String,
    pub timestamp: String,
    /// 0 is the newest update.
    pub display_order: u32,
}

/// Batch inserts returning generated ids in input order.
#[async_trait]
pub trait StatusPageStore: Send + Sync {
    async fn insert_services(&self, rows: Vec<ServiceRow>) -> CloneResult<Vec<String>>;

    async fn insert_uptime_days(&self, rows: Vec<UptimeDayRow>) -> CloneResult<usize>;

    async fn insert_incidents(&self, rows: Vec<IncidentRow>) -> CloneResult<Vec<String>>;

    async fn insert_incident_updates(&self, rows: Vec<IncidentUpdateRow>) -> CloneResult<usize>;
}

/// Row counts for one commit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PersistSummary {
    pub services: usize,
    pub uptime_days: usize,
    pub incidents: usize,
    pub incident_updates: usize,
}

fn expect_ids(ids: Vec<String>, wanted: usize, what: &str) -> CloneResult<Vec<String>> {
    if ids.len() != wanted {
        return Err(CloneError::Persistence(format!(
            "store returned {} ids for {wanted} {what}",
            ids.len()
        )));
    }
    Ok(ids)
}

/// Write `result` under `status_page_id`.
pub async fn persist_result(
    store: &dyn StatusPageStore,
    status_page_id: &str,
    result: &ExtractedResult,
) -> CloneResult<PersistSummary> {
    let mut summary = PersistSummary::default();

    let service_rows: Vec<ServiceRow> = result
        .services
        .iter()
        .enumerate()
        .map(|(idx, s)| ServiceRow {
            status_page_id: status_page_id.to_string(),
            name: s.name.clone(),
            status: s.status,
            group_name: s.group.clone(),
            display_order: idx as u32,
            uptime_pct: s.uptime_pct,
        })
        .collect();
    let wanted = service_rows.len();
    let service_ids = if wanted > 0 {
        expect_ids(store.insert_services(service_rows).await?, wanted, "services")?
    } else {
        Vec::new()
    };
    summary.services = service_ids.len();

    match result.start_date {
        Some(start) => {
            let mut day_rows = Vec::new();
            for (service, id) in result.services.iter().zip(&service_ids) {
                for (idx, day) in service.uptime_days.iter().enumerate() {
                    let (Some(up), Some(date)) = (day, day_at(start, idx)) else {
                        continue;
                    };
                    day_rows.push(UptimeDayRow {
                        service_id: id.clone(),
                        day: date.format("%Y-%m-%d").to_string(),
                        up: *up,
                    });
                }
            }
            if !day_rows.is_empty() {
                summary.uptime_days = store.insert_uptime_days(day_rows).await?;
            }
        }
        None if result.uptime_len() > 0 => {
            warn!("uptime series without a start date; skipping uptime rows");
        }
        None => {}
    }

    let incident_rows: Vec<IncidentRow> = result
        .incidents
        .iter()
        .map(|i| IncidentRow {
            status_page_id: status_page_id.to_string(),
            title: i.title.clone(),
            status: i.status,
            impact: i.impact,
            created_at: i.created_at.clone(),
        })
        .collect();
    let wanted = incident_rows.len();
    let incident_ids = if wanted > 0 {
        expect_ids(store.insert_incidents(incident_rows).await?, wanted, "incidents")?
    } else {
        Vec::new()
    };
    summary.incidents = incident_ids.len();

    let update_rows: Vec<IncidentUpdateRow> = result
        .incidents
        .iter()
        .zip(&incident_ids)
        .flat_map(|(incident, id)| {
            incident
                .updates
                .iter()
                .enumerate()
                .map(move |(idx, u)| IncidentUpdateRow {
                    incident_id: id.clone(),
                    status: u.status,
                    message: u.message.clone(),
                    timestamp: u.timestamp.clone(),
                    display_order: idx as u32,
                })
        })
        .collect();
    if !update_rows.is_empty() {
        summary.incident_updates = store.insert_incident_updates(update_rows).await?;
    }

    info!(
        "persisted page {status_page_id}: {} services, {} uptime days, {} incidents, {} updates",
        summary.services, summary.uptime_days, summary.incidents, summary.incident_updates
    );
    Ok(summary)
}
