//! JSON extraction and repair for completion output.
//!
//! Handles:
//! - Markdown code fence wrapping (```json ... ```)
//! - Prose around the JSON payload
//! - Trailing commas
//! - Output cut off by a length limit (unterminated strings, unclosed
//!   objects and arrays, dangling keys)

use crate::types::{CloneError, CloneResult};
use serde_json::Value;
use tracing::{debug, warn};

const MAX_CUTBACKS: usize = 64;

/// Parse `raw`, repairing it if needed. Returns the value and whether repair was needed.
pub fn parse_or_repair(raw: &str) -> CloneResult<(Value, bool)> {
    let cleaned = preprocess(raw);
    if let Ok(value) = serde_json::from_str::<Value>(&cleaned) {
        return Ok((value, false));
    }

    let body = match cleaned.find(['{', '[']) {
        Some(start) => &cleaned[start..],
        None => {
            return Err(CloneError::ExtractionFailed(format!(
                "no JSON payload in completion: {}",
                preview(&cleaned)
            )))
        }
    };

    debug!("initial JSON parse failed, attempting repair");
    let mut candidate = body.to_string();
    for _ in 0..MAX_CUTBACKS {
        if let Ok(value) = serde_json::from_str::<Value>(&close_open_structures(&candidate)) {
            warn!("completion JSON repaired");
            return Ok((value, true));
        }
        // Drop the last (possibly partial) element and try again.
        match last_structural_comma(&candidate) {
            Some(idx) => candidate.truncate(idx),
            None => break,
        }
    }

    // Trailing prose after a complete payload.
    if let Some(value) = first_complete_value(body) {
        warn!("completion JSON extracted from mixed content");
        return Ok((value, true));
    }

    Err(CloneError::ExtractionFailed(format!(
        "could not parse or repair completion JSON: {}",
        preview(&cleaned)
    )))
}

fn preprocess(raw: &str) -> String {
    let mut s = raw.trim().trim_start_matches('\u{feff}').trim();
    if s.starts_with("```") {
        s = match s.find('\n') {
            Some(nl) => &s[nl + 1..],
            None => s.trim_start_matches('`'),
        };
    }
    let s = s.trim_end();
    s.strip_suffix("```").unwrap_or(s).trim().to_string()
}

fn preview(s: &str) -> String {
    s.chars().take(200).collect()
}

/// Close an unterminated string, drop a dangling separator and append the
/// closers for every open object/array in nesting order.
fn close_open_structures(s: &str) -> String {
    let mut stack: Vec<char> = Vec::new();
    let mut in_string = false;
    let mut escape = false;
    let mut out = String::with_capacity(s.len() + 8);

    for ch in s.chars() {
        if in_string {
            if escape {
                escape = false;
            } else if ch == '\\' {
                escape = true;
            } else if ch == '"' {
                in_string = false;
            }
            out.push(ch);
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => stack.push('}'),
            '[' => stack.push(']'),
            '}' | ']' => {
                if stack.last() == Some(&ch) {
                    stack.pop();
                }
            }
            _ => {}
        }
        out.push(ch);
    }

    if in_string {
        if escape {
            out.pop();
        }
        out.push('"');
    }

    let trimmed_len = out.trim_end().len();
    out.truncate(trimmed_len);
    if out.ends_with(',') {
        out.pop();
    } else if out.ends_with(':') {
        out.push_str("null");
    }

    let out = strip_trailing_commas(&out);
    let mut out = out;
    while let Some(closer) = stack.pop() {
        out.push(closer);
    }
    out
}

/// Remove commas that directly precede `}` or `]`, outside strings.
fn strip_trailing_commas(s: &str) -> String {
    let chars: Vec<char> = s.chars().collect();
    let mut out = String::with_capacity(s.len());
    let mut in_string = false;
    let mut escape = false;

    for (i, &ch) in chars.iter().enumerate() {
        if in_string {
            if escape {
                escape = false;
            } else if ch == '\\' {
                escape = true;
            } else if ch == '"' {
                in_string = false;
            }
            out.push(ch);
            continue;
        }
        if ch == '"' {
            in_string = true;
        } else if ch == ',' {
            let next = chars[i + 1..].iter().find(|c| !c.is_whitespace());
            if matches!(next, Some('}') | Some(']')) {
                continue;
            }
        }
        out.push(ch);
    }
    out
}

/// Byte index of the last comma outside any string.
fn last_structural_comma(s: &str) -> Option<usize> {
    let mut in_string = false;
    let mut escape = false;
    let mut last = None;
    for (i, ch) in s.char_indices() {
        if in_string {
            if escape {
                escape = false;
            } else if ch == '\\' {
                escape = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            ',' => last = Some(i),
            _ => {}
        }
    }
    last
}

fn first_complete_value(s: &str) -> Option<Value> {
    let mut stream = serde_json::Deserializer::from_str(s).into_iter::<Value>();
    stream.next().and_then(Result::ok)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_valid_json_untouched() {
        let (value, repaired) = parse_or_repair(r#"{"a": [1, 2]}"#).unwrap();
        assert_eq!(value, json!({"a": [1, 2]}));
        assert!(!repaired);
    }

    #[test]
    fn test_strips_code_fences() {
        let (value, _) = parse_or_repair("```json\n{\"ok\": true}\n```").unwrap();
        assert_eq!(value, json!({"ok": true}));
    }

    #[test]
    fn test_truncated_services_payload() {
        let (value, repaired) = parse_or_repair(r#"{"services":[{"name":"A""#).unwrap();
        assert!(repaired);
        assert_eq!(value, json!({"services": [{"name": "A"}]}));
    }

    #[test]
    fn test_truncated_inside_string_and_key() {
        let (value, _) = parse_or_repair(r#"{"services":[{"name":"A"},{"name":"Bil"#).unwrap();
        assert_eq!(value, json!({"services": [{"name": "A"}, {"name": "Bil"}]}));

        let (value, _) = parse_or_repair(r#"{"a":1,"b"#).unwrap();
        assert_eq!(value, json!({"a": 1}));

        let (value, _) = parse_or_repair(r#"{"a":1,"b":"#).unwrap();
        assert_eq!(value, json!({"a": 1, "b": null}));
    }

    #[test]
    fn test_nested_closers_in_order() {
        let (value, _) = parse_or_repair(r#"{"x":{"y":[{"z":[1,2"#).unwrap();
        assert_eq!(value, json!({"x": {"y": [{"z": [1, 2]}]}}));
    }

    #[test]
    fn test_trailing_commas_and_prose() {
        let (value, _) = parse_or_repair(r#"{"a":[1,2,],}"#).unwrap();
        assert_eq!(value, json!({"a": [1, 2]}));

        let (value, _) = parse_or_repair("Here you go: {\"a\": 1} hope that helps").unwrap();
        assert_eq!(value, json!({"a": 1}));
    }

    #[test]
    fn test_unrepairable_is_extraction_failed() {
        let err = parse_or_repair("no json here at all").unwrap_err();
        assert!(matches!(err, CloneError::ExtractionFailed(_)));
    }
}
