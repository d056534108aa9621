//! JSON extraction from raw model output
//!
//! Providers wrap JSON in markdown fences or surrounding prose often enough
//! that a direct `serde_json::from_str` is not a fair test of the payload.
//! Extraction strips fences, locates the first balanced object or array,
//! and repairs trailing commas. Anything beyond that is a validation
//! failure, not something to paper over.

use regex::Regex;
use std::sync::LazyLock;

use super::ValidationError;

/// Extract a JSON value from raw provider output.
pub fn extract_json(raw: &str) -> Result<serde_json::Value, ValidationError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::Empty);
    }

    let input = strip_code_fences(trimmed);

    if let Ok(value) = serde_json::from_str::<serde_json::Value>(&input) {
        return Ok(value);
    }

    if let Some(extracted) = balanced_json(&input) {
        if let Ok(value) = serde_json::from_str::<serde_json::Value>(&extracted) {
            return Ok(value);
        }

        let repaired = strip_trailing_commas(&extracted);
        if let Ok(value) = serde_json::from_str::<serde_json::Value>(&repaired) {
            return Ok(value);
        }
    }

    let repaired = strip_trailing_commas(&input);
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(&repaired) {
        return Ok(value);
    }

    Err(ValidationError::Malformed(
        "no parseable JSON object in response".to_string(),
    ))
}

/// Extract content from markdown code fences
fn strip_code_fences(input: &str) -> String {
    static CODE_FENCE_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"```(?:json|JSON)?\s*\n?([\s\S]*?)\n?```").unwrap());

    if let Some(caps) = CODE_FENCE_RE.captures(input)
        && let Some(content) = caps.get(1)
    {
        return content.as_str().to_string();
    }

    input.to_string()
}

/// Find the first balanced JSON object/array in surrounding text
fn balanced_json(input: &str) -> Option<String> {
    let start_obj = input.find('{');
    let start_arr = input.find('[');

    let (start, end_char) = match (start_obj, start_arr) {
        (Some(o), Some(a)) if o < a => (o, '}'),
        (Some(_), Some(a)) => (a, ']'),
        (Some(o), None) => (o, '}'),
        (None, Some(a)) => (a, ']'),
        (None, None) => return None,
    };

    let substring = &input[start..];
    let mut depth = 0;
    let mut in_string = false;
    let mut escape_next = false;

    for (i, c) in substring.char_indices() {
        if escape_next {
            escape_next = false;
            continue;
        }

        match c {
            '\\' if in_string => escape_next = true,
            '"' => in_string = !in_string,
            '{' | '[' if !in_string => depth += 1,
            '}' | ']' if !in_string => {
                depth -= 1;
                if depth == 0 && c == end_char {
                    return Some(substring[..=i].to_string());
                }
            }
            _ => {}
        }
    }

    None
}

/// Remove trailing commas before } or ]
fn strip_trailing_commas(input: &str) -> String {
    static TRAILING_COMMA_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r",(\s*[}\]])").unwrap());
    TRAILING_COMMA_RE.replace_all(input, "$1").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direct_json() {
        let value = extract_json(r#"{"key": "value"}"#).unwrap();
        assert_eq!(value["key"], "value");
    }

    #[test]
    fn test_code_fence() {
        let input = "Here is the analysis:\n```json\n{\"key\": \"value\"}\n```";
        let value = extract_json(input).unwrap();
        assert_eq!(value["key"], "value");
    }

    #[test]
    fn test_json_embedded_in_prose() {
        let input = r#"Based on the presentation, {"candidates": [{"diagnosis": "x"}]} is my answer."#;
        let value = extract_json(input).unwrap();
        assert!(value["candidates"].is_array());
    }

    #[test]
    fn test_trailing_comma_repair() {
        let value = extract_json(r#"{"key": "value",}"#).unwrap();
        assert_eq!(value["key"], "value");
    }

    #[test]
    fn test_empty_input() {
        assert!(matches!(extract_json("   "), Err(ValidationError::Empty)));
    }

    #[test]
    fn test_prose_without_json_is_malformed() {
        let result = extract_json("The patient likely has bronchitis.");
        assert!(matches!(result, Err(ValidationError::Malformed(_))));
    }

    #[test]
    fn test_braces_inside_strings_do_not_confuse_extraction() {
        let input = r#"note: {"text": "a { brace } inside", "n": 1} trailing"#;
        let value = extract_json(input).unwrap();
        assert_eq!(value["n"], 1);
    }
}
