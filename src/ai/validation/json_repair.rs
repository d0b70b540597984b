//! JSON extraction for model output
//!
//! Models asked for "a raw JSON array" still wrap it in markdown fences now
//! and then. These helpers peel the fence off and parse what is left.

use serde_json::Value;

use crate::types::{LlmError, Result};

/// Remove a leading ```` ``` ```` / ```` ```json ```` fence and a trailing ```` ``` ````.
pub fn strip_code_fences(raw: &str) -> &str {
    let mut s = raw.trim().trim_start_matches('\u{feff}');

    if let Some(rest) = s.strip_prefix("```") {
        s = match rest.get(..4) {
            Some(tag) if tag.eq_ignore_ascii_case("json") => &rest[4..],
            _ => rest,
        };
    }

    if let Some(rest) = s.trim_end().strip_suffix("```") {
        s = rest;
    }

    s.trim()
}

/// Parse a JSON array of strings out of a model reply.
///
/// Anything that is not an array of strings is reported as a malformed
/// response so retry policies that opt in can ask again.
pub fn parse_string_array(raw: &str) -> Result<Vec<String>> {
    let cleaned = strip_code_fences(raw);
    let value: Value = serde_json::from_str(cleaned)
        .map_err(|e| LlmError::malformed(format!("Response is not valid JSON: {}", e)))?;

    let Value::Array(items) = value else {
        return Err(LlmError::malformed("Response did not return an array").into());
    };

    items
        .into_iter()
        .map(|item| match item {
            Value::String(s) => Ok(s),
            other => Err(LlmError::malformed(format!("Expected a string, found {}", other)).into()),
        })
        .collect()
}
