//! Last resort: ask the completion collaborator for a `{name, status, children[]}` tree.

use super::{Structure, StructureInput, StructureStrategy};
use crate::ai::{prompts, CompletionRequest, StructuredExtractor};
use crate::status::service_status_from_text;
use crate::types::{CloneResult, ExtractedService};
use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

#[derive(Debug, Default, Deserialize)]
struct ServicesPayload {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    services: Vec<ServiceNode>,
}

#[derive(Debug, Default, Deserialize)]
struct ServiceNode {
    #[serde(default)]
    name: String,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    children: Vec<ServiceNode>,
}

/// Flatten the tree: a node with children is a group header, its children
/// become services whose `group` is the header's name.
fn flatten(nodes: Vec<ServiceNode>, parent: Option<&str>, out: &mut Vec<ExtractedService>) {
    for node in nodes {
        let name = node.name.trim().to_string();
        if node.children.is_empty() {
            if name.is_empty() {
                continue;
            }
            let status = service_status_from_text(node.status.as_deref().unwrap_or_default());
            let mut svc = ExtractedService::new(name, status);
            svc.group = parent.map(str::to_string);
            out.push(svc);
        } else {
            let group = if name.is_empty() { parent.map(str::to_string) } else { Some(name) };
            flatten(node.children, group.as_deref(), out);
        }
    }
}

pub struct AiStrategy {
    extractor: Option<StructuredExtractor>,
}

impl AiStrategy {
    pub fn new(extractor: Option<StructuredExtractor>) -> Self {
        Self { extractor }
    }
}

#[async_trait]
impl StructureStrategy for AiStrategy {
    fn name(&self) -> &'static str {
        "ai"
    }

    async fn attempt(&self, input: &StructureInput<'_>) -> CloneResult<Option<Structure>> {
        let Some(extractor) = &self.extractor else {
            debug!("AI extraction unavailable, no completion provider configured");
            return Ok(None);
        };
        if input.reduced_html.trim().is_empty() {
            return Ok(None);
        }

        let request = CompletionRequest::new(prompts::system(), prompts::SERVICES)
            .with_document(input.reduced_html);
        let payload: ServicesPayload = extractor.complete_json(request, "service extraction").await?;

        let mut services = Vec::new();
        flatten(payload.services, None, &mut services);
        if services.is_empty() {
            return Ok(None);
        }
        let page_name = payload.name.map(|n| n.trim().to_string()).filter(|n| !n.is_empty());
        Ok(Some(
            Structure::from_services(services, self.name()).with_page_name(page_name),
        ))
    }
}
