//! Scripted completion provider for unit tests.

use super::{Completion, CompletionProvider, CompletionRequest};
use crate::types::{CloneError, CloneResult};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

/// Answers requests from a fixed script, in order, and records what it was asked.
pub struct ScriptedProvider {
    script: Mutex<VecDeque<CloneResult<Completion>>>,
    seen: Mutex<Vec<CompletionRequest>>,
    delay: Option<Duration>,
}

impl ScriptedProvider {
    pub fn new(script: Vec<CloneResult<Completion>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            seen: Mutex::new(Vec::new()),
            delay: None,
        }
    }

    /// Every answer is a complete, untruncated JSON text.
    pub fn json(answers: Vec<serde_json::Value>) -> Self {
        Self::new(
            answers
                .into_iter()
                .map(|v| {
                    Ok(Completion {
                        text: v.to_string(),
                        truncated: false,
                    })
                })
                .collect(),
        )
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.seen.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.seen.lock().unwrap().clone()
    }

    pub fn document_lengths(&self) -> Vec<usize> {
        self.seen
            .lock()
            .unwrap()
            .iter()
            .map(|r| r.document.as_ref().map_or(0, |d| d.chars().count()))
            .collect()
    }
}

#[async_trait]
impl CompletionProvider for ScriptedProvider {
    async fn complete(&self, request: &CompletionRequest) -> CloneResult<Completion> {
        self.seen.lock().unwrap().push(request.clone());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(CloneError::Completion("script exhausted".into())))
    }

    fn name(&self) -> &str {
        "scripted"
    }
}
