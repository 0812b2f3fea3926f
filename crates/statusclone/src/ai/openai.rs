//! OpenAI-compatible chat-completions provider.
//!
//! Works against any endpoint speaking the `/chat/completions` wire format.
//! Signals `truncated` when the provider reports `finish_reason == "length"`.

use super::{Completion, CompletionProvider, CompletionRequest};
use crate::types::{CloneError, CloneResult};
use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, info};

pub const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Chat-completions client with secure API key handling.
pub struct OpenAiCompatProvider {
    /// Never exposed in logs or debug output.
    api_key: SecretString,
    api_base: String,
    model: String,
    temperature: f32,
    client: reqwest::Client,
}

impl std::fmt::Debug for OpenAiCompatProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiCompatProvider")
            .field("api_key", &"[REDACTED]")
            .field("api_base", &self.api_base)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .finish()
    }
}

impl OpenAiCompatProvider {
    /// `request_timeout` is a transport-level ceiling; callers apply their own
    /// completion budget on top.
    pub fn new(
        api_key: SecretString,
        api_base: Option<String>,
        model: Option<String>,
        request_timeout: Duration,
    ) -> CloneResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| CloneError::Completion(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            api_key,
            api_base: api_base
                .map(|b| b.trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_API_BASE.to_string()),
            model: model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            temperature: 0.0,
            client,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn build_request(&self, request: &CompletionRequest) -> ChatCompletionRequest {
        let text = request.user_text();
        let user_content = if request.images.is_empty() {
            MessageContent::Text(text)
        } else {
            let mut parts = vec![ContentPart::Text { text }];
            parts.extend(request.images.iter().map(|img| ContentPart::ImageUrl {
                image_url: ImageUrl { url: img.to_url() },
            }));
            MessageContent::Parts(parts)
        };

        ChatCompletionRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: MessageContent::Text(request.system.clone()),
                },
                ChatMessage {
                    role: "user",
                    content: user_content,
                },
            ],
            temperature: self.temperature,
            max_tokens: Some(request.max_tokens),
            response_format: Some(ResponseFormat {
                format_type: "json_object",
            }),
        }
    }
}

#[async_trait]
impl CompletionProvider for OpenAiCompatProvider {
    async fn complete(&self, request: &CompletionRequest) -> CloneResult<Completion> {
        info!("requesting completion (model: {})", self.model);

        let start_time = Instant::now();
        let url = format!("{}/chat/completions", self.api_base);
        let response = self
            .client
            .post(&url)
            .bearer_auth(self.api_key.expose_secret())
            .json(&self.build_request(request))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    CloneError::Timeout {
                        operation: "completion".to_string(),
                        seconds: start_time.elapsed().as_secs(),
                    }
                } else {
                    CloneError::Completion(format!("request failed: {e}"))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(match status.as_u16() {
                429 => CloneError::RateLimited(body),
                402 => CloneError::QuotaExhausted(body),
                _ => CloneError::Completion(format!("API error ({status}): {body}")),
            });
        }

        let body: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| CloneError::Completion(format!("failed to parse response: {e}")))?;

        let choice = body
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| CloneError::Completion("no choices in response".to_string()))?;
        let truncated = choice.finish_reason.as_deref() == Some("length");
        let text = choice.message.content.unwrap_or_default();

        debug!(
            "completion received in {:?} ({} chars, truncated: {truncated})",
            start_time.elapsed(),
            text.len()
        );
        Ok(Completion { text, truncated })
    }

    fn name(&self) -> &str {
        "openai-compatible"
    }
}

// Request/Response types

#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: MessageContent,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Debug, Serialize)]
struct ImageUrl {
    url: String,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::ImageInput;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn provider(base: &str) -> OpenAiCompatProvider {
        OpenAiCompatProvider::new(
            SecretString::from("sk-test".to_string()),
            Some(base.to_string()),
            Some("test-model".to_string()),
            Duration::from_secs(5),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_length_finish_reason_marks_truncated() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("authorization", "Bearer sk-test"))
            .and(body_partial_json(serde_json::json!({"model": "test-model"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{
                    "message": {"content": "{\"services\":["},
                    "finish_reason": "length"
                }]
            })))
            .mount(&server)
            .await;

        let completion = provider(&server.uri())
            .complete(&CompletionRequest::new("sys", "user"))
            .await
            .unwrap();
        assert!(completion.truncated);
        assert_eq!(completion.text, "{\"services\":[");
    }

    #[tokio::test]
    async fn test_rate_limit_and_quota_passed_through() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_string("slow down"))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(402).set_body_string("add credits"))
            .mount(&server)
            .await;

        let p = provider(&server.uri());
        let req = CompletionRequest::new("sys", "user");
        let first = p.complete(&req).await.unwrap_err();
        assert!(matches!(first, CloneError::RateLimited(ref m) if m == "slow down"));
        let second = p.complete(&req).await.unwrap_err();
        assert!(matches!(second, CloneError::QuotaExhausted(_)));
    }

    #[test]
    fn test_image_request_uses_content_parts() {
        let p = provider("https://api.test/v1/");
        let req = CompletionRequest::new("sys", "describe").with_image(ImageInput::Url(
            "https://x.test/diagram.png".into(),
        ));
        let json = serde_json::to_value(p.build_request(&req)).unwrap();
        assert_eq!(json["messages"][1]["content"][0]["type"], "text");
        assert_eq!(
            json["messages"][1]["content"][1]["image_url"]["url"],
            "https://x.test/diagram.png"
        );
        assert_eq!(json["messages"][0]["content"], "sys");
    }

    #[test]
    fn test_debug_redacts_key() {
        let dbg = format!("{:?}", provider("https://api.test"));
        assert!(!dbg.contains("sk-test"));
    }
}
