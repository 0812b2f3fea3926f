//! Architecture or status diagrams to a service list.

use crate::acquisition::http_client::HttpClient;
use crate::ai::{prompts, CompletionRequest, ImageInput, StructuredExtractor};
use crate::status::service_status_from_text;
use crate::types::{CloneError, CloneResult, ServiceStatus};
use base64::Engine;
use image::ImageFormat;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Largest image accepted, decoded.
const MAX_IMAGE_BYTES: usize = 20 * 1024 * 1024;

/// Where the image comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum DiagramInput {
    /// Raw base64 or a `data:` URL.
    Base64(String),
    /// `http(s)` image URL.
    Url(String),
    /// Image bytes already in hand, e.g. read from a file.
    Bytes(Vec<u8>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagramService {
    pub name: String,
    pub status: ServiceStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiagramAnalysis {
    pub organization: String,
    pub services: Vec<DiagramService>,
    pub summary: String,
}

#[derive(Debug, Default, Deserialize)]
struct DiagramPayload {
    #[serde(default)]
    organization: Option<String>,
    #[serde(default)]
    services: Vec<ServicePayload>,
    #[serde(default)]
    summary: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ServicePayload {
    #[serde(default)]
    name: String,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    group: Option<String>,
    #[serde(default)]
    description: Option<String>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty() && !v.eq_ignore_ascii_case("null"))
}

fn looks_like_svg(bytes: &[u8]) -> bool {
    let head = String::from_utf8_lossy(&bytes[..bytes.len().min(512)]).to_lowercase();
    let head = head.trim_start();
    head.starts_with("<svg") || (head.starts_with("<?xml") && head.contains("<svg"))
}

/// Sniff the format and wrap the bytes for the collaborator.
///
/// Only raster formats vision models accept pass; SVG is rejected by name.
pub fn prepare_image(bytes: &[u8]) -> CloneResult<ImageInput> {
    if bytes.is_empty() {
        return Err(CloneError::InvalidInput("image is empty".to_string()));
    }
    if bytes.len() > MAX_IMAGE_BYTES {
        return Err(CloneError::InvalidInput(format!(
            "image is {} bytes, limit is {MAX_IMAGE_BYTES}",
            bytes.len()
        )));
    }
    if looks_like_svg(bytes) {
        return Err(CloneError::UnsupportedImageFormat(
            "SVG diagrams are not supported; export the diagram as PNG or JPEG".to_string(),
        ));
    }
    let format = image::guess_format(bytes)
        .map_err(|_| CloneError::UnsupportedImageFormat("unrecognized image data".to_string()))?;
    match format {
        ImageFormat::Png | ImageFormat::Jpeg | ImageFormat::Gif | ImageFormat::WebP => {
            Ok(ImageInput::Base64 {
                media_type: format.to_mime_type().to_string(),
                data: base64::engine::general_purpose::STANDARD.encode(bytes),
            })
        }
        other => Err(CloneError::UnsupportedImageFormat(format!("{other:?}"))),
    }
}

/// Decode raw base64 or a `data:` URL.
pub fn decode_base64_input(raw: &str) -> CloneResult<Vec<u8>> {
    let raw = raw.trim();
    let payload = match raw.strip_prefix("data:") {
        Some(rest) => {
            let (meta, data) = rest
                .split_once(',')
                .ok_or_else(|| CloneError::InvalidInput("malformed data URL".to_string()))?;
            if meta.to_lowercase().starts_with("image/svg") {
                return Err(CloneError::UnsupportedImageFormat(
                    "SVG diagrams are not supported; export the diagram as PNG or JPEG"
                        .to_string(),
                ));
            }
            data
        }
        None => raw,
    };
    let compact: String = payload.chars().filter(|c| !c.is_whitespace()).collect();
    base64::engine::general_purpose::STANDARD
        .decode(compact.as_bytes())
        .map_err(|e| CloneError::InvalidInput(format!("Invalid base64: {e}")))
}

async fn download(http: &HttpClient, url: &str) -> CloneResult<Vec<u8>> {
    let resp = http.inner().get(url).send().await?;
    if !resp.status().is_success() {
        return Err(CloneError::FetchBlocked {
            url: url.to_string(),
        });
    }
    let declared_svg = resp
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.to_lowercase().starts_with("image/svg"));
    if declared_svg {
        return Err(CloneError::UnsupportedImageFormat(
            "SVG diagrams are not supported; export the diagram as PNG or JPEG".to_string(),
        ));
    }
    Ok(resp.bytes().await?.to_vec())
}

/// Load, validate and describe a diagram.
pub async fn analyze_diagram_image(
    extractor: &StructuredExtractor,
    http: &HttpClient,
    input: &DiagramInput,
) -> CloneResult<DiagramAnalysis> {
    let bytes = match input {
        DiagramInput::Base64(raw) => decode_base64_input(raw)?,
        DiagramInput::Url(url) if url.trim_start().starts_with("data:") => {
            decode_base64_input(url)?
        }
        DiagramInput::Url(url) => download(http, url.trim()).await?,
        DiagramInput::Bytes(bytes) => bytes.clone(),
    };
    let image = prepare_image(&bytes)?;
    debug!("diagram image accepted ({} bytes)", bytes.len());

    let request = CompletionRequest::new(prompts::system(), prompts::DIAGRAM).with_image(image);
    let payload: DiagramPayload = extractor
        .complete_json(request, "diagram analysis")
        .await?;

    let services = payload
        .services
        .into_iter()
        .filter_map(|s| {
            let name = s.name.trim().to_string();
            (!name.is_empty()).then(|| DiagramService {
                name,
                status: service_status_from_text(s.status.as_deref().unwrap_or_default()),
                group: non_empty(s.group),
                description: non_empty(s.description),
            })
        })
        .collect();

    Ok(DiagramAnalysis {
        organization: non_empty(payload.organization).unwrap_or_default(),
        services,
        summary: non_empty(payload.summary).unwrap_or_default(),
    })
}
