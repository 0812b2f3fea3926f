//! Fetch layer: resilient HTTP retrieval with a rendering upgrade.
//!
//! [`Fetcher::fetch_rendered`] prefers the configured renderer and silently
//! degrades to a plain fetch when rendering is unavailable or fails.

pub mod batch;
pub mod http_client;
pub mod page_meta;

use crate::config::PipelineConfig;
use crate::renderer::{expand, NoopRenderer, RenderRequest, Renderer};
use crate::types::CloneResult;
use http_client::HttpClient;
use std::sync::Arc;
use tracing::{info, warn};

/// Markup for a page and how it was obtained.
#[derive(Debug, Clone)]
pub struct PageDocument {
    pub url: String,
    pub html: String,
    pub content_type: Option<String>,
    /// True when the markup came from the renderer rather than a plain GET.
    pub rendered: bool,
}

/// HTTP client plus optional renderer.
#[derive(Clone)]
pub struct Fetcher {
    http: HttpClient,
    renderer: Arc<dyn Renderer>,
    config: PipelineConfig,
}

impl Fetcher {
    pub fn new(renderer: Arc<dyn Renderer>, config: PipelineConfig) -> Self {
        Self {
            http: HttpClient::new(config.fetch_timeout_ms),
            renderer,
            config,
        }
    }

    /// A fetcher that never renders.
    pub fn http_only(config: PipelineConfig) -> Self {
        Self::new(Arc::new(NoopRenderer), config)
    }

    pub fn http(&self) -> &HttpClient {
        &self.http
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Plain GET with header-profile rotation.
    pub async fn fetch_document(&self, url: &str) -> CloneResult<PageDocument> {
        let doc = self.http.fetch_document(url).await?;
        Ok(PageDocument {
            url: doc.final_url,
            html: doc.body,
            content_type: doc.content_type,
            rendered: false,
        })
    }

    /// Render with the expansion script, degrading to [`Self::fetch_document`].
    pub async fn fetch_rendered(&self, url: &str) -> CloneResult<PageDocument> {
        if self.renderer.is_available() {
            let request = RenderRequest {
                url: url.to_string(),
                wait_ms: self.config.render_settle_ms,
                actions: expand::plan_for(&self.config),
                timeout_ms: self.config.render_timeout_ms,
            };
            match self.renderer.render(&request).await {
                Ok(html) => {
                    info!("rendered {url} with {} ({} bytes)", self.renderer.name(), html.len());
                    return Ok(PageDocument {
                        url: url.to_string(),
                        html,
                        content_type: Some("text/html".to_string()),
                        rendered: true,
                    });
                }
                Err(e) => {
                    warn!("render of {url} failed, falling back to plain fetch: {e}");
                }
            }
        }
        self.fetch_document(url).await
    }
}
