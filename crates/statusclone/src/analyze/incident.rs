//! Free-text incident descriptions to a structured incident.

use crate::ai::{prompts, CompletionRequest, StructuredExtractor};
use crate::incidents::scrape::IncidentPayload;
use crate::types::{CloneError, CloneResult, ExtractedIncident, ExtractedIncidentUpdate};
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Longest message copied from the input when the collaborator gave no updates.
const MAX_FALLBACK_MESSAGE: usize = 2_000;

/// An incident plus the organization it names, if any.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzedIncident {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization: Option<String>,
    #[serde(flatten)]
    pub incident: ExtractedIncident,
}

#[derive(Debug, Default, Deserialize)]
struct TextPayload {
    #[serde(default)]
    organization: Option<String>,
    #[serde(flatten)]
    incident: IncidentPayload,
}

pub async fn analyze_incident_text(
    extractor: &StructuredExtractor,
    text: &str,
) -> CloneResult<AnalyzedIncident> {
    let text = text.trim();
    if text.is_empty() {
        return Err(CloneError::InvalidInput("incident text is empty".to_string()));
    }

    let request =
        CompletionRequest::new(prompts::system(), prompts::INCIDENT_TEXT).with_document(text);
    let payload: TextPayload = extractor
        .complete_json(request, "incident text analysis")
        .await?;

    let mut incident = payload
        .incident
        .into_incident("")
        .ok_or_else(|| CloneError::ExtractionFailed("no incident title in the answer".to_string()))?;

    if incident.created_at.is_empty() {
        incident.created_at = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);
    }
    if incident.updates.is_empty() {
        incident.updates.push(ExtractedIncidentUpdate {
            status: incident.status,
            message: text.chars().take(MAX_FALLBACK_MESSAGE).collect(),
            timestamp: incident.created_at.clone(),
        });
    }
    incident.strip_transient();

    let organization = payload
        .organization
        .map(|o| o.trim().to_string())
        .filter(|o| !o.is_empty() && !o.eq_ignore_ascii_case("null"));

    Ok(AnalyzedIncident {
        organization,
        incident,
    })
}
