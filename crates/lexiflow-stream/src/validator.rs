//! Candidate-line validation
//!
//! Model output is not a reliable JSON emitter: lines arrive wrapped in
//! markdown fences, with two objects glued together, or with a sentence of
//! commentary around the object. Everything here is total: any input
//! produces records or [`Rejection`]s, never a panic or an error.

use crate::shape::RecordShape;
use regex::Regex;
use serde_json::{Map, Value};
use std::fmt;
use std::sync::LazyLock;

static OPENING_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*```[A-Za-z0-9_+\-]*").expect("valid fence regex"));

static CLOSING_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"```\s*$").expect("valid fence regex"));

static BARE_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*```[A-Za-z0-9_+\-]*\s*$").expect("valid fence regex"));

/// Why a candidate line produced no record
///
/// None of these end a session; callers log and move on.
#[derive(Debug, Clone, PartialEq)]
pub enum Rejection {
    /// Not parseable as a JSON object (ValidationFailure)
    Malformed(String),
    /// Parsed, but failed the declared shape contract (ValidationFailure)
    Shape(String),
    /// Well-formed record refused by the caller's predicate (AcceptanceRejection)
    Acceptance,
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::Malformed(reason) => write!(f, "malformed line: {}", reason),
            Rejection::Shape(reason) => write!(f, "shape contract failed: {}", reason),
            Rejection::Acceptance => write!(f, "rejected by acceptance predicate"),
        }
    }
}

/// True for a line that is nothing but a markdown fence marker
pub fn is_fence_marker(line: &str) -> bool {
    BARE_FENCE.is_match(line)
}

/// Remove C0 and C1 control characters (including newlines and tabs)
pub fn strip_control_chars(line: &str) -> String {
    line.chars().filter(|c| !c.is_control()).collect()
}

/// Remove a leading fence with optional language tag and a trailing fence
pub fn strip_fences(line: &str) -> &str {
    let trimmed = line.trim();
    if !trimmed.starts_with("```") {
        return trimmed;
    }
    let without_open = match OPENING_FENCE.find(trimmed) {
        Some(open) => &trimmed[open.end()..],
        None => trimmed,
    };
    let without_close = match CLOSING_FENCE.find(without_open) {
        Some(close) => &without_open[..close.start()],
        None => without_open,
    };
    without_close.trim()
}

/// Extract every JSON object a candidate line holds, in order
///
/// Each element is either a parsed object or the reason its segment was
/// rejected; an input with nothing usable yields a single rejection.
pub fn extract_objects(line: &str) -> Vec<Result<Map<String, Value>, Rejection>> {
    let cleaned = strip_control_chars(line);
    let text = strip_fences(&cleaned);

    if text.is_empty() {
        return vec![Err(Rejection::Malformed("empty line".to_string()))];
    }

    if let Ok(Value::Object(object)) = serde_json::from_str::<Value>(text) {
        return vec![Ok(object)];
    }

    if text.contains("}{") {
        return split_concatenated(text)
            .into_iter()
            .flat_map(extract_objects)
            .collect();
    }

    vec![parse_object_span(text)]
}

/// Split `{..}{..}` into its objects at each literal `}{` boundary
fn split_concatenated(text: &str) -> Vec<&str> {
    let mut segments = Vec::new();
    let mut start = 0;
    for (idx, _) in text.match_indices("}{") {
        segments.push(&text[start..=idx]);
        start = idx + 1;
    }
    segments.push(&text[start..]);
    segments
}

/// Parse the span from the first `{` to the last `}`
fn parse_object_span(text: &str) -> Result<Map<String, Value>, Rejection> {
    let (Some(first), Some(last)) = (text.find('{'), text.rfind('}')) else {
        return Err(Rejection::Malformed("no JSON object found".to_string()));
    };
    if last < first {
        return Err(Rejection::Malformed("no JSON object found".to_string()));
    }

    match serde_json::from_str::<Value>(&text[first..=last]) {
        Ok(Value::Object(object)) => Ok(object),
        Ok(other) => Err(Rejection::Malformed(format!(
            "expected an object, found {}",
            json_kind(&other)
        ))),
        Err(e) => Err(Rejection::Malformed(e.to_string())),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Extract objects from `line` and check each against `shape`
pub fn validate<S: RecordShape + ?Sized>(line: &str, shape: &S) -> Vec<Result<S::Record, Rejection>> {
    extract_objects(line)
        .into_iter()
        .map(|object| object.and_then(|object| shape.accept(object)))
        .collect()
}
