//! Completion-assisted bar classification.

use super::svg::ServiceUptime;
use crate::ai::{prompts, CompletionRequest, StructuredExtractor};
use crate::structure::heuristic::normalize_name;
use crate::types::{CloneResult, UptimeDay};
use chrono::NaiveDate;
use serde::Deserialize;
use std::collections::HashMap;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UptimePayload {
    #[serde(default)]
    start_date: Option<String>,
    #[serde(default)]
    services: Vec<ServicePayload>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ServicePayload {
    #[serde(default)]
    name: String,
    #[serde(default)]
    uptime_pct: Option<f64>,
    #[serde(default)]
    uptime_days: Vec<UptimeDay>,
}

/// What the collaborator read off the page.
#[derive(Debug, Default)]
pub struct AiUptime {
    pub series: HashMap<String, ServiceUptime>,
    pub start_date: Option<NaiveDate>,
}

/// Ask for per-service series over the uptime-reduced markup. Names the
/// collaborator invents are dropped; the rest are mapped back to `service_names`.
pub async fn classify_with_ai(
    extractor: &StructuredExtractor,
    reduced_html: &str,
    service_names: &[String],
) -> CloneResult<AiUptime> {
    let request = CompletionRequest::new(prompts::system(), prompts::uptime(service_names))
        .with_document(reduced_html);
    let payload: UptimePayload = extractor.complete_json(request, "uptime extraction").await?;

    let canonical: HashMap<String, &String> = service_names
        .iter()
        .map(|n| (normalize_name(n), n))
        .collect();

    let series = payload
        .services
        .into_iter()
        .filter_map(|svc| {
            let name = canonical.get(&normalize_name(&svc.name))?;
            let pct = svc.uptime_pct.filter(|p| (0.0..=100.0).contains(p));
            (!svc.uptime_days.is_empty() || pct.is_some()).then(|| {
                (
                    (*name).clone(),
                    ServiceUptime {
                        uptime_pct: pct,
                        uptime_days: svc.uptime_days,
                    },
                )
            })
        })
        .collect();

    let start_date = payload
        .start_date
        .as_deref()
        .and_then(|d| NaiveDate::parse_from_str(d.trim(), "%Y-%m-%d").ok());

    Ok(AiUptime { series, start_date })
}
