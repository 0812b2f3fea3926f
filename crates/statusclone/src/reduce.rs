// Copyright 2026 Statusclone Contributors
// SPDX-License-Identifier: Apache-2.0

//! Markup reducer: shrink a document to what one extraction purpose needs.
//!
//! The document is parsed and re-serialized, dropping whole subtrees and
//! attributes but never reordering what survives. Output is stable under
//! re-application.

use scraper::node::Node;
use scraper::{ElementRef, Html};

struct ReduceProfile {
    drop_tags: &'static [&'static str],
    strip_presentation: bool,
}

const SERVICES: ReduceProfile = ReduceProfile {
    drop_tags: &[
        "script", "style", "noscript", "head", "footer", "nav", "svg", "template", "iframe",
        "link", "meta",
    ],
    strip_presentation: true,
};

const UPTIME: ReduceProfile = ReduceProfile {
    drop_tags: &[
        "script", "style", "noscript", "head", "footer", "nav", "template", "iframe", "link",
        "meta",
    ],
    strip_presentation: false,
};

const VOID: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

/// Minimal markup for "which services exist": no SVG, no `style`/`class`/`data-*`.
pub fn reduce_for_services(html: &str) -> String {
    reduce(html, &SERVICES)
}

/// Minimal markup for uptime bars: SVG and its attributes survive.
pub fn reduce_for_uptime(html: &str) -> String {
    reduce(html, &UPTIME)
}

fn reduce(html: &str, profile: &ReduceProfile) -> String {
    let document = Html::parse_document(html);
    let mut out = String::with_capacity(html.len() / 4);
    write_children(document.root_element(), profile, &mut out);
    out
}

fn write_children(element: ElementRef<'_>, profile: &ReduceProfile, out: &mut String) {
    for child in element.children() {
        if let Some(el) = ElementRef::wrap(child) {
            write_element(el, profile, out);
        } else if let Node::Text(text) = child.value() {
            write_text(text, out);
        }
        // Comments, doctypes and processing instructions are dropped.
    }
}

fn write_element(element: ElementRef<'_>, profile: &ReduceProfile, out: &mut String) {
    let data = element.value();
    let name = data.name();
    if profile.drop_tags.contains(&name) {
        return;
    }

    out.push('<');
    out.push_str(name);
    for (attr, value) in data.attrs() {
        if profile.strip_presentation && is_presentational(attr) {
            continue;
        }
        out.push(' ');
        out.push_str(attr);
        out.push_str("=\"");
        escape_into(value, true, out);
        out.push('"');
    }
    out.push('>');

    if VOID.contains(&name) {
        return;
    }
    write_children(element, profile, out);
    out.push_str("</");
    out.push_str(name);
    out.push('>');
}

fn is_presentational(attr: &str) -> bool {
    attr == "style" || attr == "class" || attr.starts_with("data-")
}

fn write_text(text: &str, out: &mut String) {
    let core = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if core.is_empty() {
        return;
    }
    // Dropped siblings can make two text runs adjacent; never emit a double space.
    if text.starts_with(char::is_whitespace) && !out.ends_with(' ') {
        out.push(' ');
    }
    escape_into(&core, false, out);
    if text.ends_with(char::is_whitespace) {
        out.push(' ');
    }
}

fn escape_into(value: &str, attribute: bool, out: &mut String) {
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' if !attribute => out.push_str("&lt;"),
            '>' if !attribute => out.push_str("&gt;"),
            '"' if attribute => out.push_str("&quot;"),
            '\u{a0}' if attribute => out.push_str("&nbsp;"),
            _ => out.push(c),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r##"<!DOCTYPE html><html><head><title>Acme Status</title>
        <style>.x{color:red}</style></head>
        <body class="page" data-theme="dark">
          <nav><a href="/">Home</a></nav>
          <!-- components -->
          <div class="group" style="color:red" data-id="1" id="core">
            <span>Core   Services</span> <span>2 components</span>
            <div class="component"><span class="name">API</span>
              <svg width="10"><rect x="0" fill="#22c55e"></rect></svg>
              <span>Operational</span></div>
          </div>
          <p>a &amp; b &lt; c</p>
          <script>alert(1)</script>
          <footer>Powered by</footer>
        </body></html>"##;

    #[test]
    fn test_services_variant_strips_noise() {
        let out = reduce_for_services(PAGE);
        assert!(!out.contains("<head"));
        assert!(!out.contains("<nav"));
        assert!(!out.contains("<footer"));
        assert!(!out.contains("<svg"));
        assert!(!out.contains("<script"));
        assert!(!out.contains("class="));
        assert!(!out.contains("style="));
        assert!(!out.contains("data-"));
        assert!(!out.contains("<!--"));
        assert!(out.contains(r#"id="core""#));
        assert!(out.contains("Core Services"));
        assert!(out.contains("a &amp; b &lt; c"));
    }

    #[test]
    fn test_uptime_variant_keeps_svg() {
        let out = reduce_for_uptime(PAGE);
        assert!(out.contains("<svg"));
        assert!(out.contains(r##"fill="#22c55e""##));
        assert!(out.contains(r#"class="name""#));
        assert!(!out.contains("<script"));
        assert!(!out.contains("<footer"));
    }

    #[test]
    fn test_services_reduction_is_idempotent() {
        let once = reduce_for_services(PAGE);
        let twice = reduce_for_services(&once);
        assert_eq!(once, twice);

        let once = reduce_for_uptime(PAGE);
        assert_eq!(once, reduce_for_uptime(&once));
    }

    #[test]
    fn test_document_order_preserved() {
        let out = reduce_for_services(PAGE);
        let core = out.find("Core Services").unwrap();
        let badge = out.find("2 components").unwrap();
        let api = out.find("API").unwrap();
        let status = out.find("Operational").unwrap();
        assert!(core < badge && badge < api && api < status);
    }

    #[test]
    fn test_adjacent_text_after_drop_has_single_space() {
        let out = reduce_for_services("<p>alpha <script>x</script> beta</p>");
        assert!(out.contains("alpha beta"));
        assert_eq!(out, reduce_for_services(&out));
    }
}
