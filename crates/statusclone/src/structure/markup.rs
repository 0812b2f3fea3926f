//! Selector-driven extraction for the common hosted status-page markup.
//!
//! Group containers carry `is-group` or a `.child-components-container`; the
//! group's own header is the first `.component-inner-container` inside it.

use super::{Structure, StructureInput, StructureStrategy};
use crate::acquisition::page_meta::page_name;
use crate::status::service_status_from_text;
use crate::types::{CloneResult, ExtractedService, ServiceStatus};
use async_trait::async_trait;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::sync::OnceLock;

fn count_suffix_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\(?\s*\d+\s*components?\s*\)?").expect("count suffix regex is valid")
    })
}

fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("static selector is valid")
}

fn has_class(el: &ElementRef<'_>, class: &str) -> bool {
    el.value().classes().any(|c| c == class)
}

fn clean_name(raw: &str) -> String {
    let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    count_suffix_regex()
        .replace_all(&collapsed, "")
        .trim()
        .trim_end_matches('?')
        .trim()
        .to_string()
}

fn status_of(inner: &ElementRef<'_>, status_sel: &Selector) -> ServiceStatus {
    if let Some(attr) = inner.value().attr("data-component-status") {
        return service_status_from_text(attr);
    }
    if let Some(label) = inner.select(status_sel).next() {
        return service_status_from_text(&label.text().collect::<String>());
    }
    service_status_from_text(inner.value().attr("class").unwrap_or_default())
}

/// Extract services from hosted status-page markup. Empty when the markup is
/// not recognised.
pub fn extract_from_markup(html: &str) -> Vec<ExtractedService> {
    let document = Html::parse_document(html);
    let container_sel = selector(".component-container");
    let inner_sel = selector(".component-inner-container");
    let child_sel = selector(".child-components-container .component-inner-container");
    let children_box_sel = selector(".child-components-container");
    let name_sel = selector(".name");
    let status_sel = selector(".component-status");

    let name_of = |inner: &ElementRef<'_>| {
        inner
            .select(&name_sel)
            .next()
            .map(|n| clean_name(&n.text().collect::<String>()))
            .filter(|n| !n.is_empty())
    };

    let mut services = Vec::new();
    for container in document.select(&container_sel) {
        let nested = container
            .ancestors()
            .filter_map(ElementRef::wrap)
            .any(|a| has_class(&a, "component-container"));
        if nested {
            continue;
        }

        let is_group = has_class(&container, "is-group")
            || container.select(&children_box_sel).next().is_some();
        let Some(header) = container.select(&inner_sel).next() else {
            continue;
        };

        if is_group {
            let group = name_of(&header);
            for child in container.select(&child_sel) {
                if let Some(name) = name_of(&child) {
                    let mut svc = ExtractedService::new(name, status_of(&child, &status_sel));
                    svc.group = group.clone();
                    services.push(svc);
                }
            }
        } else if let Some(name) = name_of(&header) {
            services.push(ExtractedService::new(name, status_of(&header, &status_sel)));
        }
    }
    services
}

pub struct MarkupStrategy;

#[async_trait]
impl StructureStrategy for MarkupStrategy {
    fn name(&self) -> &'static str {
        "markup"
    }

    async fn attempt(&self, input: &StructureInput<'_>) -> CloneResult<Option<Structure>> {
        let services = extract_from_markup(input.raw_html);
        if services.is_empty() {
            return Ok(None);
        }
        Ok(Some(
            Structure::from_services(services, self.name()).with_page_name(page_name(input.raw_html)),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HOSTED: &str = r#"<html><head><title>Acme Status</title></head><body>
      <div class="components-container">
        <div class="component-container border-color is-group">
          <div class="component-inner-container status-green" data-component-status="operational">
            <span class="name">
              Core Platform <span class="group-parentheses">(2 components)</span>
            </span>
            <span class="component-status">Operational</span>
          </div>
          <div class="child-components-container">
            <div class="component-inner-container status-red" data-component-status="major_outage">
              <span class="name">API</span><span class="component-status">Major Outage</span>
            </div>
            <div class="component-inner-container status-green">
              <span class="name">Dashboard</span><span class="component-status">Degraded Performance</span>
            </div>
          </div>
        </div>
        <div class="component-container border-color">
          <div class="component-inner-container status-blue">
            <span class="name">Email Delivery</span>
          </div>
        </div>
      </div></body></html>"#;

    #[test]
    fn test_hosted_markup_hierarchy() {
        let services = extract_from_markup(HOSTED);
        assert_eq!(services.len(), 3);
        assert_eq!(services[0].name, "API");
        assert_eq!(services[0].group.as_deref(), Some("Core Platform"));
        assert_eq!(services[0].status, ServiceStatus::Major);
        assert_eq!(services[1].status, ServiceStatus::Degraded);
        assert_eq!(services[2].name, "Email Delivery");
        assert_eq!(services[2].group, None);
        assert_eq!(services[2].status, ServiceStatus::Maintenance);
    }

    #[test]
    fn test_unrecognised_markup_is_empty() {
        assert!(extract_from_markup("<html><body><p>hello</p></body></html>").is_empty());
    }

    #[tokio::test]
    async fn test_strategy_sets_page_name() {
        let input = StructureInput {
            raw_html: HOSTED,
            reduced_html: "",
            platform: None,
            known_services: &[],
        };
        let s = MarkupStrategy.attempt(&input).await.unwrap().unwrap();
        assert_eq!(s.page_name.as_deref(), Some("Acme"));
        assert_eq!(s.groups.len(), 2);
    }
}
