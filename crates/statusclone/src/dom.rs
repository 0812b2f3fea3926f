//! Document-order views over parsed markup.
//!
//! Extractors reason about "what comes after what", so the tree is flattened
//! into a token stream where document order stands in for visual order. All
//! functions are synchronous; `scraper::Html` is `!Send`.

use scraper::node::Node;
use scraper::{ElementRef, Html};

/// One rectangle primitive inside an SVG, attributes as written.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RectSpec {
    pub x: Option<String>,
    pub fill: Option<String>,
    pub class: Option<String>,
    pub opacity: Option<String>,
    pub fill_opacity: Option<String>,
    pub style: Option<String>,
    /// Own `transform` or the nearest enclosing one.
    pub transform: Option<String>,
}

/// A flattened piece of the document.
#[derive(Debug, Clone, PartialEq)]
pub enum DomToken {
    /// A non-empty text node, whitespace collapsed.
    Text(String),
    /// An `<svg>` block with its rectangles in document order.
    Svg { rects: Vec<RectSpec> },
}

impl DomToken {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            DomToken::Text(t) => Some(t),
            DomToken::Svg { .. } => None,
        }
    }
}

const INVISIBLE: &[&str] = &["script", "style", "noscript", "template", "head"];

/// Flatten `html` into text and SVG tokens in document order.
pub fn tokenize(html: &str) -> Vec<DomToken> {
    let document = Html::parse_document(html);
    let mut tokens = Vec::new();
    walk(document.root_element(), &mut tokens);
    tokens
}

fn walk(element: ElementRef<'_>, out: &mut Vec<DomToken>) {
    for child in element.children() {
        if let Some(el) = ElementRef::wrap(child) {
            let name = el.value().name();
            if INVISIBLE.contains(&name) {
                continue;
            }
            if name == "svg" {
                let mut rects = Vec::new();
                collect_rects(el, None, &mut rects);
                out.push(DomToken::Svg { rects });
                continue;
            }
            walk(el, out);
        } else if let Node::Text(text) = child.value() {
            let collapsed = collapse(text);
            if !collapsed.is_empty() {
                out.push(DomToken::Text(collapsed));
            }
        }
    }
}

fn collect_rects(element: ElementRef<'_>, inherited: Option<&str>, out: &mut Vec<RectSpec>) {
    for child in element.children().filter_map(ElementRef::wrap) {
        let attrs = child.value();
        let transform = attrs.attr("transform").or(inherited);
        if attrs.name() == "rect" {
            out.push(RectSpec {
                x: attrs.attr("x").map(str::to_string),
                fill: attrs.attr("fill").map(str::to_string),
                class: attrs.attr("class").map(str::to_string),
                opacity: attrs.attr("opacity").map(str::to_string),
                fill_opacity: attrs.attr("fill-opacity").map(str::to_string),
                style: attrs.attr("style").map(str::to_string),
                transform: transform.map(str::to_string),
            });
        } else {
            collect_rects(child, transform, out);
        }
    }
}

/// Collapse runs of whitespace to single spaces and trim.
pub fn collapse(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

const BLOCK: &[&str] = &[
    "address", "article", "aside", "blockquote", "br", "dd", "details", "div", "dl", "dt",
    "fieldset", "figcaption", "figure", "footer", "form", "h1", "h2", "h3", "h4", "h5", "h6",
    "header", "hr", "li", "main", "nav", "ol", "p", "pre", "section", "summary", "table", "tbody",
    "td", "th", "thead", "tr", "ul",
];

/// Visible text split into lines at block-level element boundaries.
///
/// Inline elements (`<strong>`, `<a>`, `<small>`, ...) stay on their line.
pub fn text_lines(html: &str) -> Vec<String> {
    let document = Html::parse_document(html);
    let mut lines = Vec::new();
    let mut current = String::new();
    collect_lines(document.root_element(), &mut current, &mut lines);
    flush(&mut current, &mut lines);
    lines
}

fn collect_lines(element: ElementRef<'_>, current: &mut String, lines: &mut Vec<String>) {
    for child in element.children() {
        if let Some(el) = ElementRef::wrap(child) {
            let name = el.value().name();
            if INVISIBLE.contains(&name) || name == "svg" {
                continue;
            }
            let block = BLOCK.contains(&name);
            if block {
                flush(current, lines);
            }
            collect_lines(el, current, lines);
            if block {
                flush(current, lines);
            }
        } else if let Node::Text(text) = child.value() {
            current.push_str(text);
        }
    }
}

fn flush(current: &mut String, lines: &mut Vec<String>) {
    let line = collapse(current);
    if !line.is_empty() {
        lines.push(line);
    }
    current.clear();
}
