// Copyright 2026 Statusclone Contributors
// SPDX-License-Identifier: Apache-2.0

//! Request-scoped data model for the clone pipeline and the crate-wide error type.
//!
//! Everything here is built once per clone/analysis invocation and handed to the
//! persistence collaborator as an insert payload. Nothing is durable.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Per-day availability: `Some(true)` up, `Some(false)` down, `None` no data.
pub type UptimeDay = Option<bool>;

/// Service health, also used for incident impact.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceStatus {
    #[default]
    Operational,
    Degraded,
    Partial,
    Major,
    Maintenance,
}

/// Incident impact shares the service status vocabulary.
pub type Impact = ServiceStatus;

impl ServiceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Operational => "operational",
            Self::Degraded => "degraded",
            Self::Partial => "partial",
            Self::Major => "major",
            Self::Maintenance => "maintenance",
        }
    }
}

impl std::fmt::Display for ServiceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle state of an incident or one of its updates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IncidentStatus {
    #[default]
    Investigating,
    Identified,
    Monitoring,
    Maintenance,
    Resolved,
}

impl IncidentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Investigating => "investigating",
            Self::Identified => "identified",
            Self::Monitoring => "monitoring",
            Self::Maintenance => "maintenance",
            Self::Resolved => "resolved",
        }
    }
}

impl std::fmt::Display for IncidentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single service (component) on the cloned page.
///
/// Hierarchy is flat: `group` names the enclosing category, `None` means top level.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedService {
    pub name: String,
    #[serde(default)]
    pub status: ServiceStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uptime_pct: Option<f64>,
    /// Oldest first.
    #[serde(default)]
    pub uptime_days: Vec<UptimeDay>,
}

impl ExtractedService {
    pub fn new(name: impl Into<String>, status: ServiceStatus) -> Self {
        Self {
            name: name.into(),
            status,
            ..Self::default()
        }
    }

    pub fn in_group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }
}

/// One entry of an incident timeline.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractedIncidentUpdate {
    #[serde(default)]
    pub status: IncidentStatus,
    /// Empty when scraping could not recover the prose.
    #[serde(default)]
    pub message: String,
    /// ISO-8601.
    #[serde(default)]
    pub timestamp: String,
}

/// An incident with its updates, newest update first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedIncident {
    pub title: String,
    #[serde(default)]
    pub status: IncidentStatus,
    #[serde(default = "default_impact")]
    pub impact: Impact,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub updates: Vec<ExtractedIncidentUpdate>,
    /// Detail page used while enriching; never serialized.
    #[serde(skip)]
    pub detail_url: Option<String>,
    /// Platform identifier used while deduplicating; never serialized.
    #[serde(skip)]
    pub api_id: Option<String>,
}

fn default_impact() -> Impact {
    ServiceStatus::Major
}

impl ExtractedIncident {
    /// Drop the fields that only matter during extraction.
    pub fn strip_transient(&mut self) {
        self.detail_url = None;
        self.api_id = None;
    }
}

/// The full payload produced by one clone invocation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedResult {
    pub name: String,
    #[serde(default)]
    pub services: Vec<ExtractedService>,
    /// Newest first.
    #[serde(default)]
    pub incidents: Vec<ExtractedIncident>,
    /// Calendar date of the oldest uptime bar.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
}

impl ExtractedResult {
    /// Longest uptime series across all services.
    pub fn uptime_len(&self) -> usize {
        self.services
            .iter()
            .map(|s| s.uptime_days.len())
            .max()
            .unwrap_or(0)
    }
}

/// Errors that can occur anywhere in the pipeline.
#[derive(thiserror::Error, Debug)]
pub enum CloneError {
    #[error("Could not fetch {url}: every request profile was rejected. Try a different URL.")]
    FetchBlocked { url: String },

    #[error("Unsupported image format: {0}")]
    UnsupportedImageFormat(String),

    #[error("Rate limited by AI provider: {0}")]
    RateLimited(String),

    #[error("AI quota exhausted: {0}")]
    QuotaExhausted(String),

    #[error("Extraction failed: {0}")]
    ExtractionFailed(String),

    #[error("No services found on this status page")]
    NoServicesFound,

    #[error("{operation} timed out after {seconds}s")]
    Timeout { operation: String, seconds: u64 },

    #[error("Render error: {0}")]
    Render(String),

    #[error("Completion error: {0}")]
    Completion(String),

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Client disconnected")]
    Cancelled,

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CloneError {
    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::FetchBlocked { .. } => "E_FETCH_BLOCKED",
            Self::UnsupportedImageFormat(_) => "E_UNSUPPORTED_IMAGE",
            Self::RateLimited(_) => "E_RATE_LIMITED",
            Self::QuotaExhausted(_) => "E_QUOTA_EXHAUSTED",
            Self::ExtractionFailed(_) => "E_EXTRACTION_FAILED",
            Self::NoServicesFound => "E_NO_SERVICES",
            Self::Timeout { .. } => "E_TIMEOUT",
            Self::Render(_) => "E_RENDER",
            Self::Completion(_) => "E_COMPLETION",
            Self::Persistence(_) => "E_PERSISTENCE",
            Self::InvalidInput(_) => "E_INVALID_INPUT",
            Self::Cancelled => "E_CANCELLED",
            Self::Http(_) => "E_HTTP",
            Self::Json(_) => "E_JSON",
        }
    }

    /// Whether the caller may retry the same request later.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::RateLimited(_) | Self::Timeout { .. } | Self::Http(_) | Self::Render(_)
        )
    }
}

/// Convenience result type.
pub type CloneResult<T> = Result<T, CloneError>;
