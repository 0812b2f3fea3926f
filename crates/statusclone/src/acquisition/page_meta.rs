//! URL normalization and page-level metadata.
//!
//! Synchronous because `scraper::Html` is `!Send`; never hold a parsed
//! document across an `.await`.

use crate::types::{CloneError, CloneResult};
use scraper::{Html, Selector};
use url::Url;

/// Accept bare hosts (`status.example.com`) and reject non-HTTP schemes.
pub fn normalize_url(input: &str) -> CloneResult<Url> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(CloneError::InvalidInput("URL is required".to_string()));
    }
    let candidate = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("https://{trimmed}")
    };
    let url = Url::parse(&candidate)
        .map_err(|e| CloneError::InvalidInput(format!("invalid URL '{trimmed}': {e}")))?;
    match url.scheme() {
        "http" | "https" if url.host_str().is_some() => Ok(url),
        other => Err(CloneError::InvalidInput(format!(
            "unsupported URL scheme '{other}'"
        ))),
    }
}

/// `scheme://host[:port]` without a trailing slash.
pub fn origin_of(url: &Url) -> String {
    url.origin().ascii_serialization()
}

/// Resolve `href` against `base`, keeping only http(s) results.
pub fn resolve_link(base: &str, href: &str) -> Option<String> {
    let base = Url::parse(base).ok()?;
    let joined = base.join(href.trim()).ok()?;
    matches!(joined.scheme(), "http" | "https").then(|| joined.to_string())
}

/// Best display name for the page: `og:site_name`, then `<title>` without a
/// trailing "Status" qualifier.
pub fn page_name(html: &str) -> Option<String> {
    let document = Html::parse_document(html);

    let og = Selector::parse(r#"meta[property="og:site_name"]"#).expect("static selector is valid");
    if let Some(name) = document
        .select(&og)
        .filter_map(|m| m.value().attr("content"))
        .map(clean_title)
        .find(|s| !s.is_empty())
    {
        return Some(name);
    }

    let title = Selector::parse("title").expect("static selector is valid");
    document
        .select(&title)
        .map(|t| clean_title(&t.text().collect::<String>()))
        .find(|s| !s.is_empty())
}

fn clean_title(raw: &str) -> String {
    let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    let lower = collapsed.to_lowercase();
    for suffix in [" status page", " status", " - status", " | status"] {
        if lower.ends_with(suffix) && collapsed.len() > suffix.len() {
            return collapsed[..collapsed.len() - suffix.len()]
                .trim_end_matches([' ', '-', '|'])
                .to_string();
        }
    }
    collapsed
}
