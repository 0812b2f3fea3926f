//! Day-cell color classification.
//!
//! Numeric rule on the parsed fill: near-equal channels mean no data, a
//! dominant green channel means up, a dominant red channel (red, orange,
//! yellow) means down. Blue or purple cells carry no availability signal.
//! Cells without a usable fill fall back to class-name keywords.

use crate::dom::RectSpec;
use crate::types::UptimeDay;

/// Channel spread below which a color reads as gray.
const GRAY_SPREAD: u8 = 30;

/// Outcome for one rectangle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Cell {
    /// Not a data cell (transparent hover overlay, invisible spacer).
    Skip,
    Day(UptimeDay),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: f32,
}

impl Rgba {
    const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 1.0 }
    }
}

const NAMED: &[(&str, Rgba)] = &[
    ("green", Rgba::rgb(0, 128, 0)),
    ("lime", Rgba::rgb(0, 255, 0)),
    ("limegreen", Rgba::rgb(50, 205, 50)),
    ("forestgreen", Rgba::rgb(34, 139, 34)),
    ("seagreen", Rgba::rgb(46, 139, 87)),
    ("mediumseagreen", Rgba::rgb(60, 179, 113)),
    ("darkgreen", Rgba::rgb(0, 100, 0)),
    ("red", Rgba::rgb(255, 0, 0)),
    ("darkred", Rgba::rgb(139, 0, 0)),
    ("crimson", Rgba::rgb(220, 20, 60)),
    ("firebrick", Rgba::rgb(178, 34, 34)),
    ("orange", Rgba::rgb(255, 165, 0)),
    ("darkorange", Rgba::rgb(255, 140, 0)),
    ("orangered", Rgba::rgb(255, 69, 0)),
    ("yellow", Rgba::rgb(255, 255, 0)),
    ("gold", Rgba::rgb(255, 215, 0)),
    ("gray", Rgba::rgb(128, 128, 128)),
    ("grey", Rgba::rgb(128, 128, 128)),
    ("silver", Rgba::rgb(192, 192, 192)),
    ("lightgray", Rgba::rgb(211, 211, 211)),
    ("lightgrey", Rgba::rgb(211, 211, 211)),
    ("darkgray", Rgba::rgb(169, 169, 169)),
    ("darkgrey", Rgba::rgb(169, 169, 169)),
    ("gainsboro", Rgba::rgb(220, 220, 220)),
    ("white", Rgba::rgb(255, 255, 255)),
    ("black", Rgba::rgb(0, 0, 0)),
    ("blue", Rgba::rgb(0, 0, 255)),
    ("royalblue", Rgba::rgb(65, 105, 225)),
    ("steelblue", Rgba::rgb(70, 130, 180)),
    ("purple", Rgba::rgb(128, 0, 128)),
];

const NO_DATA_CLASSES: &[&str] = &["nodata", "no-data", "unknown", "empty"];
const DOWN_CLASSES: &[&str] = &[
    "degraded", "partial", "warning", "major", "outage", "down", "critical",
];
const UP_CLASSES: &[&str] = &["operational", "success", "healthy"];

/// Parse `#rgb`, `#rgba`, `#rrggbb`, `#rrggbbaa`, `rgb()`, `rgba()` or a named color.
pub fn parse_color(value: &str) -> Option<Rgba> {
    let v = value.trim().to_lowercase();
    if let Some(hex) = v.strip_prefix('#') {
        return parse_hex(hex);
    }
    if let Some(args) = v
        .strip_prefix("rgba(")
        .or_else(|| v.strip_prefix("rgb("))
        .and_then(|rest| rest.strip_suffix(')'))
    {
        return parse_rgb_args(args);
    }
    NAMED.iter().find(|(name, _)| *name == v).map(|(_, c)| *c)
}

fn parse_hex(hex: &str) -> Option<Rgba> {
    let digit = |i: usize| u8::from_str_radix(hex.get(i..i + 1)?, 16).ok();
    let pair = |i: usize| u8::from_str_radix(hex.get(i..i + 2)?, 16).ok();
    match hex.len() {
        3 | 4 => {
            let expand = |d: u8| d * 17;
            let a = if hex.len() == 4 {
                f32::from(expand(digit(3)?)) / 255.0
            } else {
                1.0
            };
            Some(Rgba {
                r: expand(digit(0)?),
                g: expand(digit(1)?),
                b: expand(digit(2)?),
                a,
            })
        }
        6 | 8 => {
            let a = if hex.len() == 8 {
                f32::from(pair(6)?) / 255.0
            } else {
                1.0
            };
            Some(Rgba {
                r: pair(0)?,
                g: pair(2)?,
                b: pair(4)?,
                a,
            })
        }
        _ => None,
    }
}

fn parse_rgb_args(args: &str) -> Option<Rgba> {
    let parts: Vec<&str> = args
        .split([',', ' ', '/'])
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect();
    if parts.len() < 3 {
        return None;
    }
    let channel = |p: &str| -> Option<u8> {
        let n = match p.strip_suffix('%') {
            Some(pct) => pct.parse::<f32>().ok()? * 2.55,
            None => p.parse::<f32>().ok()?,
        };
        Some(n.round().clamp(0.0, 255.0) as u8)
    };
    let a = match parts.get(3) {
        Some(p) => match p.strip_suffix('%') {
            Some(pct) => pct.parse::<f32>().ok()? / 100.0,
            None => p.parse::<f32>().ok()?,
        },
        None => 1.0,
    };
    Some(Rgba {
        r: channel(parts[0])?,
        g: channel(parts[1])?,
        b: channel(parts[2])?,
        a,
    })
}

/// Numeric rule for an opaque color.
pub fn classify_rgb(r: u8, g: u8, b: u8) -> UptimeDay {
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    if max - min < GRAY_SPREAD {
        None
    } else if g > r && g >= b {
        Some(true)
    } else if r >= g && r > b {
        Some(false)
    } else {
        None
    }
}

/// Keyword rule on a class attribute. `None` when no keyword matches.
pub fn classify_class(class: &str) -> Option<UptimeDay> {
    let class = class.to_lowercase();
    let has = |words: &[&str]| words.iter().any(|w| class.contains(w));
    if has(NO_DATA_CLASSES) {
        Some(None)
    } else if has(DOWN_CLASSES) {
        Some(Some(false))
    } else if has(UP_CLASSES) {
        Some(Some(true))
    } else {
        None
    }
}

fn style_property<'a>(style: &'a str, property: &str) -> Option<&'a str> {
    style.split(';').find_map(|decl| {
        let (key, value) = decl.split_once(':')?;
        (key.trim().eq_ignore_ascii_case(property)).then(|| value.trim())
    })
}

fn is_zero_opacity(value: Option<&str>) -> bool {
    value
        .map(|v| v.trim().trim_end_matches('%'))
        .and_then(|v| v.parse::<f32>().ok())
        .is_some_and(|o| o <= 0.0)
}

/// Classify one rectangle.
pub fn classify_rect(rect: &RectSpec) -> Cell {
    let style = rect.style.as_deref().unwrap_or_default();
    let invisible = [
        rect.opacity.as_deref(),
        rect.fill_opacity.as_deref(),
        style_property(style, "opacity"),
        style_property(style, "fill-opacity"),
    ]
    .into_iter()
    .any(is_zero_opacity);
    if invisible {
        return Cell::Skip;
    }

    let fill = style_property(style, "fill").or(rect.fill.as_deref());
    if let Some(fill) = fill.map(str::trim) {
        if fill.eq_ignore_ascii_case("transparent") || fill.eq_ignore_ascii_case("none") {
            return Cell::Skip;
        }
        if let Some(color) = parse_color(fill) {
            if color.a <= 0.0 {
                return Cell::Skip;
            }
            return Cell::Day(classify_rgb(color.r, color.g, color.b));
        }
    }

    let from_class = rect.class.as_deref().and_then(classify_class);
    Cell::Day(from_class.unwrap_or(None))
}
