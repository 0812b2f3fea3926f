// Copyright 2026 Statusclone Contributors
// SPDX-License-Identifier: Apache-2.0

//! Renderer abstraction for JavaScript-heavy pages.
//!
//! A renderer loads a page, runs an ordered action script against it and hands
//! back the resulting markup. Backends: a hosted render API ([`remote`]), a local
//! headless Chromium ([`chromium`], behind the `chromium` feature) and
//! [`NoopRenderer`] when neither is configured.

#[cfg(feature = "chromium")]
pub mod chromium;
pub mod expand;
pub mod remote;

use crate::types::{CloneError, CloneResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Scroll target for a [`RenderAction::Scroll`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScrollDirection {
    Up,
    Down,
}

/// One step of the interaction script.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum RenderAction {
    Wait { milliseconds: u64 },
    Scroll { direction: ScrollDirection },
    ExecuteJavascript { script: String },
}

/// What to render and how to interact with it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderRequest {
    pub url: String,
    /// Wait after load before the first action.
    pub wait_ms: u64,
    pub actions: Vec<RenderAction>,
    /// Overall budget for the render.
    pub timeout_ms: u64,
}

/// A headless rendering capability.
#[async_trait]
pub trait Renderer: Send + Sync {
    /// Render the page and return its final markup.
    async fn render(&self, request: &RenderRequest) -> CloneResult<String>;

    /// False when rendering is not configured; callers skip straight to a plain fetch.
    fn is_available(&self) -> bool {
        true
    }

    /// Backend name for logs.
    fn name(&self) -> &str;
}

/// A renderer that is never available.
///
/// Plain HTTP fetching still works; only the rendering upgrade is lost.
pub struct NoopRenderer;

#[async_trait]
impl Renderer for NoopRenderer {
    async fn render(&self, _request: &RenderRequest) -> CloneResult<String> {
        Err(CloneError::Render(
            "no renderer configured, HTTP-only mode".to_string(),
        ))
    }

    fn is_available(&self) -> bool {
        false
    }

    fn name(&self) -> &str {
        "noop"
    }
}
