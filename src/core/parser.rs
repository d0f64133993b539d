//! Tolerant AI Response Parser
//!
//! Models are asked for a JSON object keyed by field, but they do not always
//! produce valid JSON: the reply may be wrapped in a code fence, and quotes
//! inside dialogue (catchphrases especially) are often over-escaped. The
//! parser strips the fence and then tries a fixed list of repair strategies,
//! returning the first one that yields a JSON object.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use regex::{Captures, Regex};
use serde_json::Value;
use thiserror::Error;

use super::fields::Field;

/// Field values recovered from a response.
pub type ParsedBio = BTreeMap<Field, String>;

// ============================================================================
// Error Types
// ============================================================================

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("Could not parse AI response: {last_error}")]
    UnparseableResponse { raw: String, last_error: String },
}

/// Failure of a single strategy. Swallowed unless every strategy fails.
#[derive(Error, Debug)]
pub enum StrategyError {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("expected a JSON object, found {0}")]
    NotAnObject(&'static str),

    #[error("strategy not applicable: {0}")]
    NotApplicable(&'static str),
}

// ============================================================================
// Strategies
// ============================================================================

pub type StrategyFn = fn(&str) -> Result<ParsedBio, StrategyError>;

/// A named repair-then-parse step.
#[derive(Clone, Copy)]
pub struct Strategy {
    pub name: &'static str,
    pub run: StrategyFn,
}

/// Strategies in the order they are tried.
pub const STRATEGIES: &[Strategy] = &[
    Strategy { name: "as_is", run: as_is },
    Strategy { name: "unicode_quotes", run: unicode_quotes },
    Strategy { name: "inner_single_quotes", run: inner_single_quotes },
    Strategy { name: "catchphrase_repair", run: catchphrase_repair },
];

/// Parse the cleaned text unchanged.
pub fn as_is(text: &str) -> Result<ParsedBio, StrategyError> {
    parse_record(text)
}

/// Turn every `\"` into a literal `“` before parsing.
pub fn unicode_quotes(text: &str) -> Result<ParsedBio, StrategyError> {
    parse_record(&text.replace("\\\"", "\u{201C}"))
}

/// Rewrite inner double quotes and escaped apostrophes to single quotes in
/// values containing a backslash.
pub fn inner_single_quotes(text: &str) -> Result<ParsedBio, StrategyError> {
    parse_record(&rewrite_inner_quotes(text))
}

/// Re-read the catchphrase value to the end of its line and strip its quoting.
pub fn catchphrase_repair(text: &str) -> Result<ParsedBio, StrategyError> {
    let repaired = repair_catchphrase(text)
        .ok_or(StrategyError::NotApplicable("no catchphrase line to repair"))?;
    parse_record(&repaired)
}

// ============================================================================
// Entry Point
// ============================================================================

/// Parse a raw AI response into field values.
pub fn parse_response(raw: &str) -> Result<ParsedBio, ParseError> {
    let cleaned = strip_code_fence(raw);
    let mut last_error: Option<StrategyError> = None;

    for strategy in STRATEGIES {
        match (strategy.run)(&cleaned) {
            Ok(parsed) => {
                log::debug!(
                    "Parsed AI response with strategy '{}' ({} fields)",
                    strategy.name,
                    parsed.len()
                );
                return Ok(parsed);
            }
            Err(e) => {
                log::debug!("Parser strategy '{}' failed: {}", strategy.name, e);
                let keep_previous = matches!(e, StrategyError::NotApplicable(_)) && last_error.is_some();
                if !keep_previous {
                    last_error = Some(e);
                }
            }
        }
    }

    let last_error = last_error
        .map(|e| e.to_string())
        .unwrap_or_else(|| "no strategies configured".to_string());
    log::warn!("All parser strategies failed: {}", last_error);

    Err(ParseError::UnparseableResponse {
        raw: raw.to_string(),
        last_error,
    })
}

/// Remove a surrounding code fence (with or without language tag) and whitespace.
pub fn strip_code_fence(raw: &str) -> String {
    let trimmed = raw.trim();
    let opened = fence_open().replace(trimmed, "");
    let closed = fence_close().replace(&opened, "");
    closed.trim().to_string()
}

// ============================================================================
// Helpers
// ============================================================================

fn fence_open() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^```[A-Za-z0-9_+-]*[ \t]*\r?\n?").expect("valid regex"))
}

fn fence_close() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\r?\n?[ \t]*```$").expect("valid regex"))
}

/// `"key":` followed by optional whitespace.
fn key_start() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#""[A-Za-z_][A-Za-z0-9_ -]*"\s*:\s*"#).expect("valid regex"))
}

/// A double quote or apostrophe with any run of backslashes in front of it.
fn escaped_quote() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"\\*["']"#).expect("valid regex"))
}

fn catchphrase_line() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?im)^([ \t]*"catch_?phrase"\s*:\s*")(.*)"[ \t]*(,?)[ \t]*\r?$"#)
            .expect("valid regex")
    })
}

fn rewrite_inner_quotes(text: &str) -> String {
    let keys: Vec<(usize, usize)> = key_start()
        .find_iter(text)
        .map(|m| (m.start(), m.end()))
        .collect();

    let mut out = String::with_capacity(text.len());
    let mut copied = 0;

    for (i, &(_, value_start)) in keys.iter().enumerate() {
        if !text[value_start..].starts_with('"') {
            continue;
        }
        let content_start = value_start + 1;
        let region_end = match keys.get(i + 1) {
            Some(&(next, _)) => next,
            None => text
                .rfind('}')
                .filter(|&p| p >= content_start)
                .unwrap_or(text.len()),
        };
        // A key with no value runs straight into the next key.
        let Some(region) = text.get(content_start..region_end) else {
            continue;
        };
        let Some(close) = region.rfind('"') else {
            continue;
        };
        let content = &region[..close];
        if !content.contains('\\') {
            continue;
        }

        out.push_str(&text[copied..content_start]);
        out.push_str(&escaped_quote().replace_all(content, "'"));
        copied = content_start + close;
    }

    out.push_str(&text[copied..]);
    out
}

fn repair_catchphrase(text: &str) -> Option<String> {
    let re = catchphrase_line();
    if !re.is_match(text) {
        return None;
    }
    let repaired = re.replace(text, |caps: &Captures| {
        let inner = caps[2].replace('\\', "").replace('"', "'");
        format!("{}{}\"{}", &caps[1], inner, &caps[3])
    });
    Some(repaired.into_owned())
}

fn parse_record(text: &str) -> Result<ParsedBio, StrategyError> {
    let value: Value = serde_json::from_str(text)?;
    let map = match value {
        Value::Object(map) => map,
        other => return Err(StrategyError::NotAnObject(json_type(&other))),
    };

    let map = unwrap_envelope(map);
    let mut parsed = ParsedBio::new();
    for (key, value) in map {
        let Some(field) = Field::from_loose_key(&key) else {
            log::debug!("Ignoring unknown key in AI response: {}", key);
            continue;
        };
        if let Some(text) = value_text(&value) {
            parsed.insert(field, text);
        }
    }
    Ok(parsed)
}

/// `{"character": {...}}` style wrappers: descend when the top level has no
/// known keys and a single object member.
fn unwrap_envelope(map: serde_json::Map<String, Value>) -> serde_json::Map<String, Value> {
    let has_fields = map.keys().any(|k| Field::from_loose_key(k).is_some());
    if !has_fields && map.len() == 1 {
        if let Some(Value::Object(inner)) = map.values().next() {
            return inner.clone();
        }
    }
    map
}

fn value_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Array(items) => Some(
            items
                .iter()
                .filter_map(value_text)
                .collect::<Vec<_>>()
                .join("\n"),
        ),
        other => Some(other.to_string()),
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
