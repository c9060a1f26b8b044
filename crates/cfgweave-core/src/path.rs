//! Path-expression grammar: dotted keys, numeric indices, `*` wildcards and
//! `#(key=="value")` predicate filters, evaluated against a scope's canonical
//! JSON form.

use crate::error::{Error, Result};

/// Split a path expression into top-level segments, respecting `#(...)`
/// groups so a literal `.` inside a predicate's value does not split it.
fn split_segments(path: &str) -> Vec<&str> {
    let mut segments = Vec::new();
    let mut depth = 0usize;
    let mut start = 0usize;
    for (i, ch) in path.char_indices() {
        match ch {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            '.' if depth == 0 => {
                segments.push(&path[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    segments.push(&path[start..]);
    segments
}

enum Segment<'a> {
    Key(&'a str),
    Index(usize),
    Wildcard,
    Predicate { key: &'a str, value: &'a str },
}

fn parse_segment(raw: &str) -> Result<Segment<'_>> {
    if raw == "*" {
        return Ok(Segment::Wildcard);
    }
    if let Some(inner) = raw.strip_prefix("#(").and_then(|s| s.strip_suffix(')')) {
        let (key, value) = inner
            .split_once("==")
            .ok_or_else(|| Error::path(format!("invalid predicate segment '{raw}'")))?;
        let value = value.trim().trim_matches('"').trim_matches('\'');
        return Ok(Segment::Predicate {
            key: key.trim(),
            value,
        });
    }
    if let Ok(index) = raw.parse::<usize>() {
        return Ok(Segment::Index(index));
    }
    if raw.is_empty() {
        return Err(Error::path("empty path segment"));
    }
    Ok(Segment::Key(raw))
}

/// Evaluate `path` against `root`, returning the selected sub-value.
///
/// `path` must be non-empty; the empty-whole-scope case is handled by callers
/// before reaching the grammar evaluator.
pub fn evaluate(root: &serde_json::Value, path: &str) -> Result<serde_json::Value> {
    if path.is_empty() {
        return Err(Error::path("empty path"));
    }
    let segments = split_segments(path);
    walk(root, &segments, path)
}

fn walk(value: &serde_json::Value, segments: &[&str], full_path: &str) -> Result<serde_json::Value> {
    let Some((head, rest)) = segments.split_first() else {
        return Ok(value.clone());
    };

    match parse_segment(head)? {
        Segment::Key(key) => {
            let obj = value
                .as_object()
                .ok_or_else(|| Error::path(format!("path not found: {full_path}")))?;
            let next = obj
                .get(key)
                .ok_or_else(|| Error::path(format!("path not found: {full_path}")))?;
            walk(next, rest, full_path)
        }
        Segment::Index(index) => {
            let arr = value
                .as_array()
                .ok_or_else(|| Error::path(format!("path not found: {full_path}")))?;
            let next = arr
                .get(index)
                .ok_or_else(|| Error::path(format!("path not found: {full_path}")))?;
            walk(next, rest, full_path)
        }
        Segment::Wildcard => {
            let arr = value
                .as_array()
                .ok_or_else(|| Error::path(format!("path not found: {full_path}")))?;
            let mut out = Vec::with_capacity(arr.len());
            for item in arr {
                out.push(walk(item, rest, full_path)?);
            }
            Ok(serde_json::Value::Array(out))
        }
        Segment::Predicate { key, value: target } => {
            let arr = value
                .as_array()
                .ok_or_else(|| Error::path(format!("path not found: {full_path}")))?;
            let found = arr.iter().find(|item| {
                item.get(key)
                    .map(|v| value_matches(v, target))
                    .unwrap_or(false)
            });
            let found = found.ok_or_else(|| Error::path(format!("path not found: {full_path}")))?;
            walk(found, rest, full_path)
        }
    }
}

fn value_matches(value: &serde_json::Value, target: &str) -> bool {
    match value {
        serde_json::Value::String(s) => s == target,
        serde_json::Value::Bool(b) => b.to_string() == target,
        serde_json::Value::Number(n) => n.to_string() == target,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn dotted_key_lookup() {
        let root = json!({"db": {"host": "h", "port": 5432}});
        assert_eq!(evaluate(&root, "db.host").unwrap(), json!("h"));
    }

    #[test]
    fn numeric_index_lookup() {
        let root = json!({"items": ["a", "b"]});
        assert_eq!(evaluate(&root, "items.0").unwrap(), json!("a"));
    }

    #[test]
    fn predicate_filter_selects_matching_element() {
        let root = json!({"items": [{"key": "x", "v": 1}, {"key": "y", "v": 2}]});
        assert_eq!(
            evaluate(&root, r#"items.#(key=="y").v"#).unwrap(),
            json!(2)
        );
    }

    #[test]
    fn wildcard_maps_over_sequence() {
        let root = json!({"items": [{"v": 1}, {"v": 2}]});
        assert_eq!(evaluate(&root, "items.*.v").unwrap(), json!([1, 2]));
    }

    #[test]
    fn missing_path_is_path_error() {
        let root = json!({"a": 1});
        assert!(evaluate(&root, "b.c").is_err());
    }

    #[test]
    fn empty_path_is_rejected() {
        let root = json!({"a": 1});
        assert!(evaluate(&root, "").is_err());
    }
}
