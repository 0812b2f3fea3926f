//! Shared fixtures for the integration tests: a scripted completion provider
//! and helpers to run a pipeline against a wiremock origin.

#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::Value;
use statusclone::ai::{Completion, CompletionRequest};
use statusclone::{
    CloneError, ClonePipeline, CloneResult, CompletionLimits, CompletionProvider, Fetcher,
    PipelineConfig, ProgressEnvelope, StructuredExtractor,
};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tokio_stream::StreamExt;

/// Answers completion requests from a queue of JSON values, in order.
pub struct FakeProvider {
    answers: Mutex<VecDeque<Value>>,
    prompts: Mutex<Vec<String>>,
}

impl FakeProvider {
    pub fn new(answers: Vec<Value>) -> Arc<Self> {
        Arc::new(Self {
            answers: Mutex::new(answers.into()),
            prompts: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionProvider for FakeProvider {
    async fn complete(&self, request: &CompletionRequest) -> CloneResult<Completion> {
        self.prompts.lock().unwrap().push(request.user.clone());
        match self.answers.lock().unwrap().pop_front() {
            Some(answer) => Ok(Completion {
                text: format!("```json\n{answer}\n```"),
                truncated: false,
            }),
            None => Err(CloneError::Completion("no scripted answer left".into())),
        }
    }

    fn name(&self) -> &str {
        "fake"
    }
}

pub fn extractor(provider: Arc<FakeProvider>) -> StructuredExtractor {
    StructuredExtractor::new(provider, CompletionLimits::default())
}

/// A pipeline that never renders.
pub fn pipeline(ai: Option<StructuredExtractor>) -> Arc<ClonePipeline> {
    pipeline_with(PipelineConfig::default(), ai)
}

pub fn pipeline_with(config: PipelineConfig, ai: Option<StructuredExtractor>) -> Arc<ClonePipeline> {
    Arc::new(ClonePipeline::new(Fetcher::http_only(config), ai))
}

/// Run `clone_page` to completion and collect every envelope.
pub async fn collect_events(pipeline: Arc<ClonePipeline>, url: &str) -> Vec<ProgressEnvelope> {
    pipeline.clone_page(url).collect().await
}
