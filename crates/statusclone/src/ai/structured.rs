//! Typed extraction on top of a [`CompletionProvider`].
//!
//! Every call is cut to the document budget, bounded by a hard timeout and
//! repaired when the output is truncated. A payload that still cannot be
//! parsed is retried once with half the document before giving up with
//! [`CloneError::ExtractionFailed`].

use super::json_repair::parse_or_repair;
use super::{CompletionProvider, CompletionRequest};
use crate::config::CompletionLimits;
use crate::types::{CloneError, CloneResult};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tracing::warn;

/// Below this many characters a retry with less input is pointless.
const MIN_RETRY_CHARS: usize = 2_000;

#[derive(Clone)]
pub struct StructuredExtractor {
    provider: Arc<dyn CompletionProvider>,
    limits: CompletionLimits,
}

impl StructuredExtractor {
    pub fn new(provider: Arc<dyn CompletionProvider>, limits: CompletionLimits) -> Self {
        Self { provider, limits }
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Run `request` and decode the JSON answer into `T`.
    pub async fn complete_json<T: DeserializeOwned>(
        &self,
        mut request: CompletionRequest,
        operation: &str,
    ) -> CloneResult<T> {
        if let Some(doc) = request.document.as_mut() {
            let cut = truncate_chars(doc, self.limits.max_document_chars).len();
            doc.truncate(cut);
        }

        match self.attempt(&request, operation).await {
            Err(CloneError::ExtractionFailed(reason)) => {
                let Some(doc) = request.document.as_mut().filter(|d| d.len() > MIN_RETRY_CHARS)
                else {
                    return Err(CloneError::ExtractionFailed(reason));
                };
                warn!("{operation}: {reason}; retrying with a trimmed document");
                let half = truncate_chars(doc, doc.chars().count() / 2).len();
                doc.truncate(half);
                self.attempt(&request, operation).await
            }
            other => other,
        }
    }

    async fn attempt<T: DeserializeOwned>(
        &self,
        request: &CompletionRequest,
        operation: &str,
    ) -> CloneResult<T> {
        let completion = tokio::time::timeout(self.limits.timeout, self.provider.complete(request))
            .await
            .map_err(|_| CloneError::Timeout {
                operation: operation.to_string(),
                seconds: self.limits.timeout.as_secs(),
            })??;

        if completion.truncated {
            warn!("{operation}: completion hit the length limit, repairing");
        }
        let (value, _) = parse_or_repair(&completion.text)?;
        serde_json::from_value(value)
            .map_err(|e| CloneError::ExtractionFailed(format!("{operation}: unexpected shape: {e}")))
    }
}

/// Longest prefix of `s` with at most `max` characters.
pub fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::testing::ScriptedProvider;
    use crate::ai::Completion;
    use serde::Deserialize;
    use std::time::Duration;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Payload {
        services: Vec<Named>,
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct Named {
        name: String,
    }

    fn limits() -> CompletionLimits {
        CompletionLimits {
            timeout: Duration::from_secs(5),
            max_document_chars: 10_000,
        }
    }

    #[tokio::test]
    async fn test_truncated_completion_is_repaired() {
        let provider = Arc::new(ScriptedProvider::new(vec![Ok(Completion {
            text: r#"{"services":[{"name":"A""#.into(),
            truncated: true,
        })]));
        let extractor = StructuredExtractor::new(provider, limits());
        let payload: Payload = extractor
            .complete_json(CompletionRequest::new("s", "u"), "services")
            .await
            .unwrap();
        assert_eq!(payload.services, vec![Named { name: "A".into() }]);
    }

    #[tokio::test]
    async fn test_document_cut_to_budget_and_halved_on_retry() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            Ok(Completion {
                text: "garbage".into(),
                truncated: false,
            }),
            Ok(Completion {
                text: r#"{"services":[]}"#.into(),
                truncated: false,
            }),
        ]));
        let extractor = StructuredExtractor::new(provider.clone(), limits());
        let request = CompletionRequest::new("s", "u").with_document("x".repeat(50_000));
        let payload: Payload = extractor.complete_json(request, "services").await.unwrap();
        assert!(payload.services.is_empty());
        assert_eq!(provider.document_lengths(), vec![10_000, 5_000]);
    }

    #[tokio::test]
    async fn test_unparseable_twice_is_extraction_failed() {
        let bad = || {
            Ok(Completion {
                text: "nope".into(),
                truncated: false,
            })
        };
        let provider = Arc::new(ScriptedProvider::new(vec![bad(), bad()]));
        let extractor = StructuredExtractor::new(provider, limits());
        let request = CompletionRequest::new("s", "u").with_document("y".repeat(4_000));
        let err = extractor
            .complete_json::<Payload>(request, "services")
            .await
            .unwrap_err();
        assert!(matches!(err, CloneError::ExtractionFailed(_)));
    }

    #[tokio::test]
    async fn test_slow_provider_times_out() {
        let provider = Arc::new(ScriptedProvider::new(vec![]).with_delay(Duration::from_millis(500)));
        let extractor = StructuredExtractor::new(
            provider,
            CompletionLimits {
                timeout: Duration::from_millis(20),
                max_document_chars: 100,
            },
        );
        let err = extractor
            .complete_json::<Payload>(CompletionRequest::new("s", "u"), "uptime")
            .await
            .unwrap_err();
        assert!(matches!(err, CloneError::Timeout { ref operation, .. } if operation == "uptime"));
    }

    #[tokio::test]
    async fn test_rate_limit_not_retried() {
        let provider = Arc::new(ScriptedProvider::new(vec![Err(CloneError::RateLimited(
            "429".into(),
        ))]));
        let extractor = StructuredExtractor::new(provider.clone(), limits());
        let request = CompletionRequest::new("s", "u").with_document("z".repeat(9_000));
        let err = extractor
            .complete_json::<Payload>(request, "services")
            .await
            .unwrap_err();
        assert!(matches!(err, CloneError::RateLimited(_)));
        assert_eq!(provider.calls(), 1);
    }

    #[test]
    fn test_truncate_chars_respects_boundaries() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("abc", 10), "abc");
    }
}
