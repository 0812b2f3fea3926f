//! Chromium-based renderer using chromiumoxide.

use super::{RenderAction, RenderRequest, Renderer, ScrollDirection};
use crate::types::{CloneError, CloneResult};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::page::Page;
use futures::StreamExt;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, warn};

/// Find the Chromium binary path.
pub fn find_chromium() -> Option<PathBuf> {
    // 1. STATUSCLONE_CHROMIUM_PATH env
    if let Ok(p) = std::env::var("STATUSCLONE_CHROMIUM_PATH") {
        let path = PathBuf::from(&p);
        if path.exists() {
            return Some(path);
        }
    }

    // 2. ~/.statusclone/chromium/
    if let Some(home) = dirs::home_dir() {
        let candidates = [
            home.join(".statusclone/chromium/chrome-linux64/chrome"),
            home.join(".statusclone/chromium/chrome"),
        ];
        for c in candidates {
            if c.exists() {
                return Some(c);
            }
        }
    }

    // 3. System PATH
    ["google-chrome", "chromium", "chromium-browser"]
        .iter()
        .find_map(|bin| which::which(bin).ok())
}

/// Headless Chromium renderer. One browser, one tab per render.
pub struct ChromiumRenderer {
    browser: Browser,
}

impl ChromiumRenderer {
    /// Launch a headless Chromium instance.
    pub async fn launch() -> CloneResult<Self> {
        let chrome_path = find_chromium().ok_or_else(|| {
            CloneError::Render(
                "Chromium not found. Set STATUSCLONE_CHROMIUM_PATH or install Chrome.".to_string(),
            )
        })?;

        let config = BrowserConfig::builder()
            .chrome_executable(chrome_path)
            .arg("--headless=new")
            .arg("--disable-gpu")
            .arg("--no-sandbox")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-extensions")
            .build()
            .map_err(|e| CloneError::Render(format!("failed to build browser config: {e}")))?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| CloneError::Render(format!("failed to launch Chromium: {e}")))?;

        tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                let _ = event;
            }
        });

        Ok(Self { browser })
    }

    async fn run_actions(page: &Page, actions: &[RenderAction]) {
        for action in actions {
            match action {
                RenderAction::Wait { milliseconds } => {
                    tokio::time::sleep(Duration::from_millis(*milliseconds)).await;
                }
                RenderAction::Scroll { direction } => {
                    let script = match direction {
                        ScrollDirection::Down => "window.scrollTo(0, document.body.scrollHeight)",
                        ScrollDirection::Up => "window.scrollTo(0, 0)",
                    };
                    if let Err(e) = page.evaluate(script).await {
                        debug!("scroll failed: {e}");
                    }
                }
                RenderAction::ExecuteJavascript { script } => {
                    // Expansion is lossy by nature; a failing pass is not fatal.
                    if let Err(e) = page.evaluate(script.as_str()).await {
                        warn!("interaction script failed: {e}");
                    }
                }
            }
        }
    }

    async fn render_page(&self, request: &RenderRequest) -> CloneResult<String> {
        let page = self
            .browser
            .new_page(request.url.as_str())
            .await
            .map_err(|e| CloneError::Render(format!("navigation failed: {e}")))?;
        let _ = page.wait_for_navigation().await;

        tokio::time::sleep(Duration::from_millis(request.wait_ms)).await;
        Self::run_actions(&page, &request.actions).await;

        let html = page
            .evaluate("document.documentElement.outerHTML")
            .await
            .map_err(|e| CloneError::Render(format!("failed to get HTML: {e}")))?
            .into_value::<String>()
            .map_err(|e| CloneError::Render(format!("failed to convert HTML result: {e:?}")));

        let _ = page.close().await;
        html
    }
}

#[async_trait]
impl Renderer for ChromiumRenderer {
    async fn render(&self, request: &RenderRequest) -> CloneResult<String> {
        let budget = Duration::from_millis(request.timeout_ms);
        tokio::time::timeout(budget, self.render_page(request))
            .await
            .map_err(|_| CloneError::Timeout {
                operation: "render".to_string(),
                seconds: budget.as_secs(),
            })?
    }

    fn name(&self) -> &str {
        "chromium"
    }
}
