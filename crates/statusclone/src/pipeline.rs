// Copyright 2026 Statusclone Contributors
// SPDX-License-Identifier: Apache-2.0

//! Clone orchestrator.
//!
//! Stages run in order: connect, probe the platform API, fetch or render the
//! page, extract services, decode uptime, extract incidents. Uptime and
//! incidents are optional facets whose failures only cost that facet. No
//! services at all is fatal.

use crate::acquisition::page_meta::{normalize_url, origin_of, page_name};
use crate::acquisition::{Fetcher, PageDocument};
use crate::ai::StructuredExtractor;
use crate::incidents::{IncidentExtractor, IncidentSource};
use crate::probe::{probe_known_platform, PlatformPage};
use crate::progress::{self, CloneStage, ProgressEnvelope, Reporter};
use crate::reduce::reduce_for_services;
use crate::structure::{Structure, StructureExtractor, StructureInput};
use crate::types::{CloneError, CloneResult, ExtractedResult};
use crate::uptime::UptimeDecoder;
use chrono::Utc;
use std::sync::Arc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::{info, warn};
use url::Url;

pub struct ClonePipeline {
    fetcher: Fetcher,
    ai_enabled: bool,
    structure: StructureExtractor,
    uptime: UptimeDecoder,
    incidents: IncidentExtractor,
}

fn ensure_open(reporter: &Reporter) -> CloneResult<()> {
    if reporter.is_closed() {
        return Err(CloneError::Cancelled);
    }
    Ok(())
}

impl ClonePipeline {
    /// Without `ai` every completion-backed strategy yields nothing.
    pub fn new(fetcher: Fetcher, ai: Option<StructuredExtractor>) -> Self {
        Self {
            ai_enabled: ai.is_some(),
            structure: StructureExtractor::new(ai.clone()),
            uptime: UptimeDecoder::new(ai.clone(), fetcher.config().uptime_days),
            incidents: IncidentExtractor::new(fetcher.clone(), ai),
            fetcher,
        }
    }

    /// Replace the structure strategy chain.
    pub fn with_structure_extractor(mut self, structure: StructureExtractor) -> Self {
        self.structure = structure;
        self
    }

    /// Start a run in the background and stream its events.
    ///
    /// The stream always ends with exactly one `result` or `error` event,
    /// even if the run panics. Dropping the stream makes the remaining
    /// stages bail out early.
    pub fn clone_page(self: Arc<Self>, url: impl Into<String>) -> UnboundedReceiverStream<ProgressEnvelope> {
        let url = url.into();
        let (reporter, rx) = progress::channel(uuid::Uuid::new_v4().to_string());

        tokio::spawn(async move {
            let worker = {
                let reporter = reporter.clone();
                tokio::spawn(async move { self.run(&url, &reporter).await })
            };
            let outcome = match worker.await {
                Ok(outcome) => outcome,
                Err(e) => Err(CloneError::ExtractionFailed(format!(
                    "clone task aborted: {e}"
                ))),
            };
            if let Err(e) = &outcome {
                warn!(request_id = reporter.request_id(), "clone failed: {e}");
            }
            reporter.finish(&outcome);
        });

        UnboundedReceiverStream::new(rx)
    }

    /// Run every stage, reporting progress. Does not send the terminal event.
    pub async fn run(&self, url: &str, reporter: &Reporter) -> CloneResult<ExtractedResult> {
        let target = normalize_url(url)?;
        let origin = origin_of(&target);
        reporter.stage(CloneStage::Connecting);
        if !self.ai_enabled {
            reporter.report("AI extraction unavailable, using deterministic strategies only");
        }

        ensure_open(reporter)?;
        reporter.stage(CloneStage::ProbingPlatform);
        let platform = probe_known_platform(self.fetcher.http(), &origin)
            .await
            .filter(|p| !p.components.is_empty());
        match &platform {
            Some(p) => {
                reporter.stage(CloneStage::PlatformDetected);
                reporter.report(format!("Found {} components via platform API", p.components.len()));
            }
            None => reporter.stage(CloneStage::FallingBackToMarkup),
        }

        ensure_open(reporter)?;
        let page = self.load_page(&target, platform.as_ref()).await?;
        let raw_html = page.as_ref().map_or("", |p| p.html.as_str());

        ensure_open(reporter)?;
        reporter.stage(CloneStage::ExtractingServices);
        let structure = self.extract_structure(raw_html, platform.as_ref()).await?;
        let mut services = structure.services.clone();
        reporter.report(format!(
            "Found {} services via {} extraction",
            services.len(),
            structure.source
        ));

        ensure_open(reporter)?;
        reporter.stage(CloneStage::ExtractingUptime);
        let mut start_date = None;
        if !raw_html.is_empty() {
            let names: Vec<String> = services.iter().map(|s| s.name.clone()).collect();
            match self.uptime.decode(raw_html, &names, Utc::now().date_naive()).await {
                Ok(outcome) => {
                    outcome.apply_to(&mut services);
                    start_date = outcome.start_date;
                    reporter.report(format!(
                        "Decoded uptime for {} services",
                        outcome.series.len()
                    ));
                }
                Err(e) => {
                    warn!("uptime extraction failed: {e}");
                    reporter.report(format!("Uptime history unavailable: {e}"));
                }
            }
        }

        ensure_open(reporter)?;
        reporter.stage(CloneStage::ExtractingIncidents);
        let source = match (&platform, &page) {
            (Some(_), _) => IncidentSource::Platform { origin: &origin },
            (None, Some(doc)) => IncidentSource::Page {
                url: &doc.url,
                html: &doc.html,
            },
            (None, None) => IncidentSource::Page {
                url: target.as_str(),
                html: "",
            },
        };
        let incidents = match self.incidents.extract(source, reporter).await {
            Ok(list) => {
                reporter.report(format!("Found {} incidents", list.len()));
                list
            }
            Err(e) => {
                warn!("incident extraction failed: {e}");
                reporter.report(format!("Incidents unavailable: {e}"));
                Vec::new()
            }
        };

        ensure_open(reporter)?;
        reporter.stage(CloneStage::Finalizing);
        let name = resolve_name(platform.as_ref(), &structure, raw_html, &target);
        info!(
            "cloned {name}: {} services, {} incidents",
            services.len(),
            incidents.len()
        );
        Ok(ExtractedResult {
            name,
            services,
            incidents,
            start_date,
        })
    }

    /// Rendered page markup. With platform data in hand a failed fetch only
    /// costs the markup-derived facets.
    async fn load_page(
        &self,
        target: &Url,
        platform: Option<&PlatformPage>,
    ) -> CloneResult<Option<PageDocument>> {
        match self.fetcher.fetch_rendered(target.as_str()).await {
            Ok(doc) => Ok(Some(doc)),
            Err(e) if platform.is_some() => {
                warn!("page fetch failed, continuing with platform data only: {e}");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    async fn extract_structure(
        &self,
        raw_html: &str,
        platform: Option<&PlatformPage>,
    ) -> CloneResult<Structure> {
        let reduced = reduce_for_services(raw_html);
        let known = platform.map(PlatformPage::services).unwrap_or_default();
        let input = StructureInput {
            raw_html,
            reduced_html: &reduced,
            platform,
            known_services: &known,
        };
        match self.structure.extract(&input).await {
            Ok(structure) if !structure.is_empty() => Ok(structure),
            outcome if !known.is_empty() => {
                if let Err(e) = outcome {
                    warn!("structure extraction failed, using flat platform list: {e}");
                }
                Ok(Structure::from_services(known, "platform"))
            }
            Ok(_) => Err(CloneError::NoServicesFound),
            Err(e) => Err(e),
        }
    }
}

/// Platform name, then the structure's, then page metadata, then the host.
fn resolve_name(
    platform: Option<&PlatformPage>,
    structure: &Structure,
    raw_html: &str,
    target: &Url,
) -> String {
    platform
        .and_then(|p| p.name.clone())
        .or_else(|| structure.page_name.clone())
        .filter(|n| !n.trim().is_empty())
        .or_else(|| page_name(raw_html))
        .unwrap_or_else(|| target.host_str().unwrap_or_default().to_string())
}
