//! Turning raw model text into JSON

use crate::LlmError;
use serde_json::Value;

/// Parse a model response into a JSON object
///
/// Models sometimes wrap JSON in markdown code fences even in structured
/// output mode; those are stripped first.
pub fn parse_structured(text: &str) -> Result<Value, LlmError> {
    let json_str = strip_code_fence(text);

    if json_str.is_empty() {
        return Err(LlmError::InvalidResponse("Empty response".to_string()));
    }

    let value: Value = serde_json::from_str(json_str)
        .map_err(|e| LlmError::InvalidResponse(format!("JSON parse error: {}", e)))?;

    if !value.is_object() {
        return Err(LlmError::InvalidResponse(
            "Expected a JSON object".to_string(),
        ));
    }

    Ok(value)
}

/// Remove a surrounding ```json ... ``` fence, if present
fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();

    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };

    // Drop the info string (`json`) on the opening line
    let body = match rest.find('\n') {
        Some(idx) => &rest[idx + 1..],
        None => "",
    };

    body.trim_end()
        .strip_suffix("```")
        .unwrap_or(body)
        .trim()
}
