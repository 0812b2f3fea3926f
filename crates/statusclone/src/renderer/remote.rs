//! Hosted render API backend.
//!
//! POSTs `{url, formats, waitFor, actions, timeout}` and reads the rendered
//! markup from `data.rawHtml` (falling back to `data.html`).

use super::{RenderAction, RenderRequest, Renderer};
use crate::types::{CloneError, CloneResult};
use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Renderer backed by an external scrape/render service.
pub struct RemoteRenderer {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<SecretString>,
}

impl std::fmt::Debug for RemoteRenderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteRenderer")
            .field("endpoint", &self.endpoint)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

impl RemoteRenderer {
    pub fn new(endpoint: impl Into<String>, api_key: Option<SecretString>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
            api_key,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ScrapeRequest<'a> {
    url: &'a str,
    formats: [&'static str; 2],
    wait_for: u64,
    actions: &'a [RenderAction],
    timeout: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ScrapeResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    data: Option<ScrapeData>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ScrapeData {
    #[serde(default)]
    raw_html: Option<String>,
    #[serde(default)]
    html: Option<String>,
}

impl RemoteRenderer {
    /// One request/response exchange, body included.
    async fn exchange(&self, request: &RenderRequest) -> CloneResult<String> {
        let body = ScrapeRequest {
            url: &request.url,
            formats: ["rawHtml", "html"],
            wait_for: request.wait_ms,
            actions: &request.actions,
            timeout: request.timeout_ms,
        };

        let mut builder = self.client.post(&self.endpoint).json(&body);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key.expose_secret());
        }

        let resp = builder.send().await?;
        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(CloneError::Render(format!("render service HTTP {status}: {text}")));
        }

        let parsed: ScrapeResponse = resp.json().await?;
        if !parsed.success {
            return Err(CloneError::Render(
                parsed
                    .error
                    .unwrap_or_else(|| "render service reported failure".to_string()),
            ));
        }

        parsed
            .data
            .and_then(|d| d.raw_html.or(d.html))
            .filter(|h| !h.trim().is_empty())
            .ok_or_else(|| CloneError::Render("render service returned no markup".to_string()))
    }
}

#[async_trait]
impl Renderer for RemoteRenderer {
    async fn render(&self, request: &RenderRequest) -> CloneResult<String> {
        let budget = Duration::from_millis(request.timeout_ms);
        let html = tokio::time::timeout(budget, self.exchange(request))
            .await
            .map_err(|_| CloneError::Timeout {
                operation: "render".to_string(),
                seconds: budget.as_secs(),
            })??;

        debug!("rendered {} via remote service ({} bytes)", request.url, html.len());
        Ok(html)
    }

    fn name(&self) -> &str {
        "remote"
    }
}
