//! Utilities for extracting structured data from completion responses.
//!
//! Completion responses often wrap JSON in markdown code blocks or surround
//! it with explanatory text. Extraction finds the JSON; decoding then checks
//! it strictly against the expected schema.

use serde::de::DeserializeOwned;

/// Why a structured response could not be used.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display)]
pub enum DecodeFailure {
    /// No JSON object was found in the text
    #[display("no JSON object found in response ({} chars)", _0)]
    NotFound(usize),
    /// JSON was found but did not match the schema
    #[display("response did not match schema: {}", _0)]
    Schema(String),
}

/// Extract the first JSON object from a response.
///
/// Tries a fenced ```` ```json ```` block first, then any fenced block whose
/// body starts with `{`, then the first balanced `{ ... }` in the text.
///
/// # Examples
///
/// ```
/// use fabula_narrative::extract_json_object;
///
/// let response = "Here you go:\n```json\n{\"tone\": \"grim\"}\n```\nEnjoy!";
/// assert_eq!(extract_json_object(response).unwrap(), "{\"tone\": \"grim\"}");
///
/// let inline = "Sure! {\"a\": {\"b\": \"}\"}} trailing";
/// assert_eq!(extract_json_object(inline).unwrap(), "{\"a\": {\"b\": \"}\"}}");
/// ```
pub fn extract_json_object(response: &str) -> Option<String> {
    let fenced = extract_from_code_block(response, "json")
        .or_else(|| extract_from_code_block(response, ""))
        .filter(|block| block.starts_with('{'));
    match fenced {
        Some(block) => extract_balanced(&block, '{', '}').or(Some(block)),
        None => extract_balanced(response, '{', '}'),
    }
}

/// Extract and strictly decode a JSON object from a response.
///
/// # Errors
///
/// Returns [`DecodeFailure::NotFound`] when the text holds no object and
/// [`DecodeFailure::Schema`] when the object does not match `T`.
pub fn decode_json<T: DeserializeOwned>(response: &str) -> Result<T, DecodeFailure> {
    let json = extract_json_object(response)
        .ok_or_else(|| DecodeFailure::NotFound(response.chars().count()))?;
    serde_json::from_str(&json).map_err(|e| {
        tracing::debug!(error = %e, json_len = json.len(), "Structured response failed schema check");
        DecodeFailure::Schema(e.to_string())
    })
}

/// Extract content from markdown code blocks.
///
/// With an empty `language`, matches a fence with any (or no) language tag.
fn extract_from_code_block(response: &str, language: &str) -> Option<String> {
    let pattern = format!("```{}", language);
    let start = response.find(&pattern)?;
    let content_start = start + pattern.len();
    // Skip the rest of the fence line (language tag or trailing spaces).
    let skip_to = response[content_start..]
        .find('\n')
        .map(|n| content_start + n + 1)
        .unwrap_or(content_start);

    match response[skip_to..].find("```") {
        Some(end) => Some(response[skip_to..skip_to + end].trim().to_string()),
        // No closing fence: likely a truncated response.
        None => Some(response[skip_to..].trim().to_string()),
    }
}

/// Extract content between balanced delimiters.
///
/// Finds the first `open` and returns everything up to its matching `close`,
/// ignoring delimiters inside JSON strings.
fn extract_balanced(response: &str, open: char, close: char) -> Option<String> {
    let start = response.find(open)?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escape_next = false;

    for (i, ch) in response[start..].char_indices() {
        if escape_next {
            escape_next = false;
            continue;
        }

        match ch {
            '\\' if in_string => escape_next = true,
            '"' => in_string = !in_string,
            c if c == open && !in_string => depth += 1,
            c if c == close && !in_string => {
                depth -= 1;
                if depth == 0 {
                    return Some(response[start..start + i + c.len_utf8()].to_string());
                }
            }
            _ => {}
        }
    }

    None
}
