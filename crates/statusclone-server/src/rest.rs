// Copyright 2026 Statusclone Contributors
// SPDX-License-Identifier: Apache-2.0

//! HTTP API.
//!
//! `POST /api/v1/clone` streams a clone run as Server-Sent Events, one
//! [`ProgressEnvelope`] per event, ending with a single `result` or `error`.
//! The analyzers answer with plain JSON. Closing the connection drops the
//! event receiver, which makes the pipeline skip its remaining stages.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use futures::StreamExt;
use serde::Deserialize;
use serde_json::{json, Value};
use statusclone::acquisition::http_client::HttpClient;
use statusclone::analyze::{
    analyze_diagram_image, analyze_incident_text, AnalyzedIncident, DiagramAnalysis, DiagramInput,
};
use statusclone::{CloneError, ClonePipeline, ProgressEnvelope, StructuredExtractor};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

/// Everything a handler needs. Built once per process.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<ClonePipeline>,
    /// `None` when no completion key is configured.
    pub analyzer: Option<StructuredExtractor>,
    pub http: HttpClient,
}

/// Build the axum Router with all endpoints.
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/api/v1/clone", post(clone_sse))
        .route("/api/v1/analyze/incident", post(handle_analyze_incident))
        .route("/api/v1/analyze/diagram", post(handle_analyze_diagram))
        .layer(cors)
        .with_state(state)
}

/// Serve until the listener fails.
pub async fn start(addr: SocketAddr, state: Arc<AppState>) -> anyhow::Result<()> {
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("REST API listening on http://{addr}");
    axum::serve(listener, app).await?;
    Ok(())
}

// ── Errors ──────────────────────────────────────────────────────

/// A [`CloneError`] rendered as an HTTP status plus a JSON body.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    code: &'static str,
    message: String,
    retryable: bool,
}

impl ApiError {
    fn ai_unavailable() -> Self {
        Self {
            status: StatusCode::SERVICE_UNAVAILABLE,
            code: "E_AI_UNAVAILABLE",
            message: "AI extraction unavailable: no completion API key configured".to_string(),
            retryable: false,
        }
    }
}

/// HTTP status for a pipeline error.
pub fn status_for(err: &CloneError) -> StatusCode {
    match err {
        CloneError::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
        CloneError::QuotaExhausted(_) => StatusCode::PAYMENT_REQUIRED,
        CloneError::UnsupportedImageFormat(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
        CloneError::ExtractionFailed(_)
        | CloneError::InvalidInput(_)
        | CloneError::NoServicesFound => StatusCode::UNPROCESSABLE_ENTITY,
        CloneError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
        _ => StatusCode::BAD_GATEWAY,
    }
}

impl From<CloneError> for ApiError {
    fn from(err: CloneError) -> Self {
        Self {
            status: status_for(&err),
            code: err.code(),
            retryable: err.is_retryable(),
            message: err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            warn!("request failed ({}): {}", self.code, self.message);
        }
        let body = json!({
            "error": {
                "code": self.code,
                "message": self.message,
                "retryable": self.retryable,
            }
        });
        (self.status, Json(body)).into_response()
    }
}

// ── Handlers ────────────────────────────────────────────────────

async fn health(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "ai": state.analyzer.is_some(),
    }))
}

#[derive(Debug, Deserialize)]
struct CloneRequest {
    url: String,
}

/// Stream one clone run.
///
/// URL validation happens inside the run so even a bad URL yields a
/// well-formed stream ending in an `error` event.
async fn clone_sse(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CloneRequest>,
) -> Sse<impl futures::Stream<Item = Result<Event, Infallible>>> {
    let mut events = Arc::clone(&state.pipeline).clone_page(body.url);

    let stream = async_stream::stream! {
        while let Some(envelope) = events.next().await {
            let terminal = envelope.event.is_terminal();
            match sse_event(&envelope) {
                Some(event) => yield Ok(event),
                None => warn!(request_id = %envelope.request_id, "dropping unserializable event"),
            }
            if terminal {
                break;
            }
        }
    };

    Sse::new(stream).keep_alive(KeepAlive::default())
}

fn sse_event(envelope: &ProgressEnvelope) -> Option<Event> {
    let data = serde_json::to_string(envelope).ok()?;
    Some(Event::default().id(envelope.seq.to_string()).data(data))
}

#[derive(Debug, Deserialize)]
struct IncidentTextRequest {
    #[serde(default)]
    text: String,
}

async fn handle_analyze_incident(
    State(state): State<Arc<AppState>>,
    Json(body): Json<IncidentTextRequest>,
) -> Result<Json<AnalyzedIncident>, ApiError> {
    let analyzer = state.analyzer.as_ref().ok_or_else(ApiError::ai_unavailable)?;
    let incident = analyze_incident_text(analyzer, &body.text).await?;
    Ok(Json(incident))
}

/// Exactly one of `image` (base64 or `data:` URL) or `imageUrl`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DiagramRequest {
    #[serde(default)]
    image: Option<String>,
    #[serde(default)]
    image_url: Option<String>,
}

impl DiagramRequest {
    fn into_input(self) -> Result<DiagramInput, CloneError> {
        let image = self.image.filter(|s| !s.trim().is_empty());
        let image_url = self.image_url.filter(|s| !s.trim().is_empty());
        match (image, image_url) {
            (Some(data), None) => Ok(DiagramInput::Base64(data)),
            (None, Some(url)) => Ok(DiagramInput::Url(url)),
            (Some(_), Some(_)) => Err(CloneError::InvalidInput(
                "send either image or imageUrl, not both".to_string(),
            )),
            (None, None) => Err(CloneError::InvalidInput(
                "image or imageUrl is required".to_string(),
            )),
        }
    }
}

async fn handle_analyze_diagram(
    State(state): State<Arc<AppState>>,
    Json(body): Json<DiagramRequest>,
) -> Result<Json<DiagramAnalysis>, ApiError> {
    let input = body.into_input()?;
    let analyzer = state.analyzer.as_ref().ok_or_else(ApiError::ai_unavailable)?;
    let analysis = analyze_diagram_image(analyzer, &state.http, &input).await?;
    Ok(Json(analysis))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            status_for(&CloneError::RateLimited("slow down".into())),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            status_for(&CloneError::QuotaExhausted("out".into())),
            StatusCode::PAYMENT_REQUIRED
        );
        assert_eq!(
            status_for(&CloneError::Timeout {
                operation: "completion".into(),
                seconds: 120
            }),
            StatusCode::GATEWAY_TIMEOUT
        );
        assert_eq!(
            status_for(&CloneError::Completion("boom".into())),
            StatusCode::BAD_GATEWAY
        );
    }

    #[test]
    fn test_diagram_request_needs_one_source() {
        let both = DiagramRequest {
            image: Some("aGk=".into()),
            image_url: Some("https://x.io/a.png".into()),
        };
        assert!(matches!(both.into_input(), Err(CloneError::InvalidInput(_))));
        assert!(matches!(
            DiagramRequest::default().into_input(),
            Err(CloneError::InvalidInput(_))
        ));
        let url = DiagramRequest {
            image_url: Some("https://x.io/a.png".into()),
            ..Default::default()
        };
        assert_eq!(
            url.into_input().unwrap(),
            DiagramInput::Url("https://x.io/a.png".into())
        );
    }
}
