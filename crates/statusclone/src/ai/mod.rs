// Copyright 2026 Statusclone Contributors
// SPDX-License-Identifier: Apache-2.0

//! Structured-completion collaborator.
//!
//! ## Modules
//!
//! - `openai`: OpenAI-compatible chat-completions client
//! - `json_repair`: fence stripping and truncated-JSON repair
//! - `structured`: typed extraction with timeout, trimming and repair
//! - `prompts`: the instructions sent for each extraction purpose

pub mod json_repair;
pub mod openai;
pub mod prompts;
pub mod structured;
#[cfg(test)]
pub(crate) mod testing;

pub use openai::OpenAiCompatProvider;
pub use structured::StructuredExtractor;

use crate::types::CloneResult;
use async_trait::async_trait;

/// An image attached to a completion request.
#[derive(Debug, Clone, PartialEq)]
pub enum ImageInput {
    Url(String),
    Base64 { media_type: String, data: String },
}

impl ImageInput {
    /// URL form accepted by chat-completion APIs (`data:` URL for inline bytes).
    pub fn to_url(&self) -> String {
        match self {
            ImageInput::Url(url) => url.clone(),
            ImageInput::Base64 { media_type, data } => format!("data:{media_type};base64,{data}"),
        }
    }
}

/// One structured-completion call.
#[derive(Debug, Clone, Default)]
pub struct CompletionRequest {
    pub system: String,
    pub user: String,
    /// Inlined document text, cut to the character budget before sending.
    pub document: Option<String>,
    pub images: Vec<ImageInput>,
    pub max_tokens: u32,
}

impl CompletionRequest {
    pub fn new(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            user: user.into(),
            max_tokens: 16_000,
            ..Default::default()
        }
    }

    pub fn with_document(mut self, document: impl Into<String>) -> Self {
        self.document = Some(document.into());
        self
    }

    pub fn with_image(mut self, image: ImageInput) -> Self {
        self.images.push(image);
        self
    }

    /// User prompt followed by the document, as one text block.
    pub fn user_text(&self) -> String {
        match &self.document {
            Some(doc) => format!("{}\n\n{}", self.user, doc),
            None => self.user.clone(),
        }
    }
}

/// Raw completion text.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Completion {
    pub text: String,
    /// The provider stopped because of its output length limit.
    pub truncated: bool,
}

/// A chat-completion capability.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    async fn complete(&self, request: &CompletionRequest) -> CloneResult<Completion>;

    /// Provider name for logs.
    fn name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_url_forms() {
        assert_eq!(
            ImageInput::Url("https://x.test/a.png".into()).to_url(),
            "https://x.test/a.png"
        );
        let inline = ImageInput::Base64 {
            media_type: "image/png".into(),
            data: "AAAA".into(),
        };
        assert_eq!(inline.to_url(), "data:image/png;base64,AAAA");
    }

    #[test]
    fn test_user_text_appends_document() {
        let req = CompletionRequest::new("sys", "Extract.").with_document("<p>x</p>");
        assert_eq!(req.user_text(), "Extract.\n\n<p>x</p>");
        assert_eq!(CompletionRequest::new("s", "u").user_text(), "u");
    }
}
