// Copyright 2026 Statusclone Contributors
// SPDX-License-Identifier: Apache-2.0

//! Progress events for a clone run.
//!
//! A run emits any number of `progress` events followed by exactly one
//! terminal event: `result` on success or `error` on failure. The
//! [`Reporter`] enforces that and drops everything once the consumer has
//! gone away.

use crate::types::{CloneError, CloneResult, ExtractedResult};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::info;

/// One event on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum CloneEvent {
    Progress {
        message: String,
    },
    Result {
        success: bool,
        data: ExtractedResult,
    },
    Error {
        message: String,
        /// Stable machine-readable kind, see [`CloneError::code`].
        code: String,
        retryable: bool,
    },
}

impl CloneEvent {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Progress { .. })
    }
}

impl From<&CloneError> for CloneEvent {
    fn from(e: &CloneError) -> Self {
        Self::Error {
            message: e.to_string(),
            code: e.code().to_string(),
            retryable: e.is_retryable(),
        }
    }
}

/// An event tagged with its run and position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressEnvelope {
    pub request_id: String,
    /// Starts at 1 and increases by one per event.
    pub seq: u64,
    #[serde(flatten)]
    pub event: CloneEvent,
}

/// Named pipeline stages, rendered as the human progress message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloneStage {
    Connecting,
    ProbingPlatform,
    PlatformDetected,
    FallingBackToMarkup,
    ExtractingServices,
    ExtractingUptime,
    ExtractingIncidents,
    Finalizing,
}

impl std::fmt::Display for CloneStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Connecting => write!(f, "Connecting to status page"),
            Self::ProbingPlatform => write!(f, "Checking for a hosted status platform"),
            Self::PlatformDetected => write!(f, "Hosted platform detected, reading its API"),
            Self::FallingBackToMarkup => write!(f, "No platform API, reading the page itself"),
            Self::ExtractingServices => write!(f, "Extracting services"),
            Self::ExtractingUptime => write!(f, "Extracting uptime history"),
            Self::ExtractingIncidents => write!(f, "Extracting incidents"),
            Self::Finalizing => write!(f, "Finalizing"),
        }
    }
}

/// Sender half handed to the pipeline.
///
/// Cheap to clone; clones share the sequence counter and terminal flag.
#[derive(Clone)]
pub struct Reporter {
    tx: Option<mpsc::UnboundedSender<ProgressEnvelope>>,
    request_id: Arc<str>,
    seq: Arc<AtomicU64>,
    finished: Arc<AtomicBool>,
}

/// Create a reporter and the stream of envelopes it produces.
pub fn channel(request_id: impl Into<String>) -> (Reporter, mpsc::UnboundedReceiver<ProgressEnvelope>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let reporter = Reporter {
        tx: Some(tx),
        request_id: Arc::from(request_id.into()),
        seq: Arc::new(AtomicU64::new(0)),
        finished: Arc::new(AtomicBool::new(false)),
    };
    (reporter, rx)
}

impl Reporter {
    /// A reporter nobody listens to.
    pub fn silent() -> Self {
        Self {
            tx: None,
            request_id: Arc::from("silent"),
            seq: Arc::new(AtomicU64::new(0)),
            finished: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    /// True once the receiving side has been dropped.
    pub fn is_closed(&self) -> bool {
        self.tx.as_ref().is_some_and(|tx| tx.is_closed())
    }

    pub fn is_finished(&self) -> bool {
        self.finished.load(Ordering::SeqCst)
    }

    /// Free-form progress message. Ignored after the terminal event.
    pub fn report(&self, message: impl Into<String>) {
        if self.is_finished() {
            return;
        }
        self.send(CloneEvent::Progress {
            message: message.into(),
        });
    }

    pub fn stage(&self, stage: CloneStage) {
        info!(request_id = %self.request_id, "{stage}");
        self.report(stage.to_string());
    }

    /// Send the terminal event. Only the first call has any effect.
    pub fn finish(&self, outcome: &CloneResult<ExtractedResult>) -> bool {
        if self.finished.swap(true, Ordering::SeqCst) {
            return false;
        }
        let event = match outcome {
            Ok(data) => CloneEvent::Result {
                success: true,
                data: data.clone(),
            },
            Err(e) => CloneEvent::from(e),
        };
        self.send(event);
        true
    }

    fn send(&self, event: CloneEvent) {
        let Some(tx) = &self.tx else {
            return;
        };
        let seq = self.seq.fetch_add(1, Ordering::SeqCst) + 1;
        // A dropped receiver means the client left; nothing to do.
        let _ = tx.send(ProgressEnvelope {
            request_id: self.request_id.to_string(),
            seq,
            event,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_json_diff::assert_json_eq;
    use serde_json::json;

    #[test]
    fn test_wire_shape() {
        let envelope = ProgressEnvelope {
            request_id: "r1".into(),
            seq: 3,
            event: CloneEvent::Progress {
                message: "Extracting services".into(),
            },
        };
        assert_json_eq!(
            serde_json::to_value(&envelope).unwrap(),
            json!({"requestId": "r1", "seq": 3, "type": "progress", "message": "Extracting services"})
        );

        let parsed: ProgressEnvelope = serde_json::from_value(json!({
            "requestId": "r1", "seq": 4, "type": "error",
            "message": "No services found on this status page", "code": "E_NO_SERVICES", "retryable": false
        }))
        .unwrap();
        assert!(parsed.event.is_terminal());
    }

    #[tokio::test]
    async fn test_exactly_one_terminal_event() {
        let (reporter, mut rx) = channel("run");
        reporter.stage(CloneStage::Connecting);
        assert!(reporter.finish(&Err(CloneError::NoServicesFound)));
        assert!(!reporter.finish(&Ok(ExtractedResult::default())));
        reporter.report("late");
        drop(reporter);

        let mut events = Vec::new();
        while let Some(e) = rx.recv().await {
            events.push(e);
        }
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].seq, 1);
        assert_eq!(events[1].seq, 2);
        assert!(matches!(events[1].event, CloneEvent::Error { ref code, .. } if code == "E_NO_SERVICES"));
    }

    #[test]
    fn test_closed_after_receiver_dropped() {
        let (reporter, rx) = channel("run");
        assert!(!reporter.is_closed());
        drop(rx);
        assert!(reporter.is_closed());
        reporter.report("nobody listening");
        assert!(!Reporter::silent().is_closed());
    }
}
