//! `statusclone analyze-incident` and `statusclone analyze-diagram`.

use crate::cli::output;
use crate::config::ServerConfig;
use anyhow::{anyhow, Context, Result};
use statusclone::analyze::{analyze_diagram_image, analyze_incident_text, DiagramInput};
use statusclone::StructuredExtractor;
use std::path::{Path, PathBuf};
use tokio::io::AsyncReadExt;

fn require_analyzer(analyzer: Option<StructuredExtractor>) -> Result<StructuredExtractor> {
    analyzer.ok_or_else(|| {
        anyhow!("AI extraction unavailable: set STATUSCLONE_AI_API_KEY or OPENAI_API_KEY")
    })
}

/// Text from the argument, a file, or stdin when neither is given.
async fn incident_text(text: Option<String>, file: Option<PathBuf>) -> Result<String> {
    if let Some(text) = text {
        return Ok(text);
    }
    if let Some(path) = file {
        return tokio::fs::read_to_string(&path)
            .await
            .with_context(|| format!("failed to read {}", path.display()));
    }
    let mut buf = String::new();
    tokio::io::stdin()
        .read_to_string(&mut buf)
        .await
        .context("failed to read incident text from stdin")?;
    Ok(buf)
}

pub async fn run_incident(
    config: &ServerConfig,
    text: Option<String>,
    file: Option<PathBuf>,
    compact: bool,
) -> Result<()> {
    let text = incident_text(text, file).await?;
    let state = config.build_state().await?;
    let analyzer = require_analyzer(state.analyzer)?;
    let incident = analyze_incident_text(&analyzer, &text).await?;
    output::print_json(&incident, compact)
}

/// `http(s)` URLs and `data:` URLs pass through; anything else is a file path.
pub async fn diagram_input(source: &str) -> Result<DiagramInput> {
    let trimmed = source.trim();
    let lower = trimmed.to_lowercase();
    if lower.starts_with("http://") || lower.starts_with("https://") {
        return Ok(DiagramInput::Url(trimmed.to_string()));
    }
    if lower.starts_with("data:") {
        return Ok(DiagramInput::Base64(trimmed.to_string()));
    }
    let path = Path::new(trimmed);
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;
    Ok(DiagramInput::Bytes(bytes))
}

pub async fn run_diagram(config: &ServerConfig, source: &str, compact: bool) -> Result<()> {
    let input = diagram_input(source).await?;
    let state = config.build_state().await?;
    let analyzer = require_analyzer(state.analyzer)?;
    let analysis = analyze_diagram_image(&analyzer, &state.http, &input).await?;
    output::print_json(&analysis, compact)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::{assert_err, assert_ok};

    #[tokio::test]
    async fn test_diagram_sources() {
        assert_eq!(
            diagram_input(" https://example.com/arch.png ").await.unwrap(),
            DiagramInput::Url("https://example.com/arch.png".into())
        );
        assert!(matches!(
            diagram_input("data:image/png;base64,AAAA").await.unwrap(),
            DiagramInput::Base64(_)
        ));
        assert_err!(diagram_input("/definitely/not/here.png").await);
    }

    #[tokio::test]
    async fn test_explicit_text_wins() {
        let text = assert_ok!(incident_text(Some("API down".into()), Some(PathBuf::from("/nope"))).await);
        assert_eq!(text, "API down");
    }
}
