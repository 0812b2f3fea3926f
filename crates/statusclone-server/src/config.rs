// Copyright 2026 Statusclone Contributors
// SPDX-License-Identifier: Apache-2.0

//! Process-level configuration shared by every subcommand.
//!
//! Each flag falls back to an environment variable. Pipeline tuning comes from
//! `STATUSCLONE_*` variables via [`PipelineConfig::from_env`].

use crate::rest::AppState;
use anyhow::{Context, Result};
use clap::Args;
use secrecy::SecretString;
use statusclone::renderer::remote::RemoteRenderer;
use statusclone::renderer::{NoopRenderer, Renderer};
use statusclone::{ClonePipeline, Fetcher, OpenAiCompatProvider, PipelineConfig, StructuredExtractor};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Extra transport headroom on top of the completion budget.
const PROVIDER_TIMEOUT_SLACK_SECS: u64 = 10;

#[derive(Debug, Clone, Args)]
pub struct ServerConfig {
    /// Address the HTTP server listens on.
    #[arg(
        long,
        env = "STATUSCLONE_LISTEN",
        default_value = "127.0.0.1:8080",
        global = true
    )]
    pub listen: SocketAddr,

    /// Base URL of an OpenAI-compatible chat-completions API.
    #[arg(long, env = "STATUSCLONE_AI_BASE_URL", global = true)]
    pub ai_base_url: Option<String>,

    /// Model used for structured extraction.
    #[arg(long, env = "STATUSCLONE_AI_MODEL", global = true)]
    pub ai_model: Option<String>,

    /// API key for the completion endpoint. Falls back to OPENAI_API_KEY.
    #[arg(
        long,
        env = "STATUSCLONE_AI_API_KEY",
        hide_env_values = true,
        global = true
    )]
    pub ai_api_key: Option<String>,

    /// Hosted render service endpoint.
    #[arg(long, env = "STATUSCLONE_RENDER_URL", global = true)]
    pub render_url: Option<String>,

    /// API key for the render service.
    #[arg(
        long,
        env = "STATUSCLONE_RENDER_API_KEY",
        hide_env_values = true,
        global = true
    )]
    pub render_api_key: Option<String>,

    /// Render with a local headless Chromium instead of the render service.
    #[arg(long, env = "STATUSCLONE_CHROMIUM", global = true)]
    pub chromium: bool,
}

fn secret(value: Option<String>) -> Option<SecretString> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .map(SecretString::from)
}

impl ServerConfig {
    /// The completion key, if any source provides one.
    pub fn api_key(&self) -> Option<SecretString> {
        secret(self.ai_api_key.clone()).or_else(|| secret(std::env::var("OPENAI_API_KEY").ok()))
    }

    /// Wire up the pipeline and analyzers.
    pub async fn build_state(&self) -> Result<AppState> {
        let pipeline_config = PipelineConfig::from_env();
        let renderer = self.renderer().await?;
        let fetcher = Fetcher::new(renderer, pipeline_config.clone());

        let analyzer = match self.api_key() {
            Some(key) => {
                let provider = OpenAiCompatProvider::new(
                    key,
                    self.ai_base_url.clone(),
                    self.ai_model.clone(),
                    Duration::from_secs(
                        pipeline_config.completion_timeout_secs + PROVIDER_TIMEOUT_SLACK_SECS,
                    ),
                )
                .context("failed to create completion client")?;
                info!("AI extraction enabled (model: {})", provider.model());
                Some(StructuredExtractor::new(
                    Arc::new(provider),
                    pipeline_config.completion_limits(),
                ))
            }
            None => {
                warn!("no AI API key configured; AI extraction disabled");
                None
            }
        };

        let http = fetcher.http().clone();
        let pipeline = Arc::new(ClonePipeline::new(fetcher, analyzer.clone()));
        Ok(AppState {
            pipeline,
            analyzer,
            http,
        })
    }

    async fn renderer(&self) -> Result<Arc<dyn Renderer>> {
        if self.chromium {
            return launch_chromium().await;
        }
        match &self.render_url {
            Some(endpoint) => {
                info!("using render service at {endpoint}");
                Ok(Arc::new(RemoteRenderer::new(
                    endpoint.clone(),
                    secret(self.render_api_key.clone()),
                )))
            }
            None => {
                info!("no renderer configured, HTTP-only mode");
                Ok(Arc::new(NoopRenderer))
            }
        }
    }
}

#[cfg(feature = "chromium")]
async fn launch_chromium() -> Result<Arc<dyn Renderer>> {
    let renderer = statusclone::renderer::chromium::ChromiumRenderer::launch()
        .await
        .context("failed to launch headless Chromium")?;
    info!("Chromium renderer initialized");
    Ok(Arc::new(renderer))
}

#[cfg(not(feature = "chromium"))]
async fn launch_chromium() -> Result<Arc<dyn Renderer>> {
    anyhow::bail!("--chromium requires a build with the `chromium` feature")
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use secrecy::ExposeSecret;

    #[derive(Parser)]
    struct TestCli {
        #[command(flatten)]
        config: ServerConfig,
    }

    #[test]
    fn test_flag_key_wins_and_blank_is_none() {
        let cli = TestCli::parse_from(["statusclone", "--ai-api-key", "sk-flag"]);
        assert_eq!(
            cli.config.api_key().map(|k| k.expose_secret().to_string()),
            Some("sk-flag".to_string())
        );
        assert!(secret(Some("   ".to_string())).is_none());
    }

    #[test]
    fn test_listen_default() {
        let cli = TestCli::parse_from(["statusclone"]);
        assert_eq!(cli.config.listen.port(), 8080);
        assert!(!cli.config.chromium);
    }
}
