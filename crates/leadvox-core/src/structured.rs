use anyhow::{anyhow, Context, Result};
use serde::de::DeserializeOwned;

/// Returns the body of the first fenced block in `text`, preferring a
/// `json`-labelled fence over a bare one. Unfenced text is returned trimmed.
pub fn strip_code_fence(text: &str) -> &str {
    let body = if let Some((_, after)) = text.split_once("```json") {
        after.split("```").next().unwrap_or(after)
    } else if let Some((_, after)) = text.split_once("```") {
        after.split("```").next().unwrap_or(after)
    } else {
        text
    };
    body.trim()
}

/// Parses a structured record out of free-form model output.
///
/// Fenced blocks are unwrapped first. When the remaining text is not valid
/// JSON on its own, the outermost `{ ... }` span is tried before giving up,
/// which covers models that add a sentence before or after the object.
pub fn parse_structured<T: DeserializeOwned>(text: &str) -> Result<T> {
    let body = strip_code_fence(text);
    if body.is_empty() {
        return Err(anyhow!("model returned no structured content"));
    }

    match serde_json::from_str::<T>(body) {
        Ok(value) => Ok(value),
        Err(first_err) => {
            let span = object_span(body).ok_or_else(|| {
                anyhow!("model output is not a JSON object: {first_err}")
            })?;
            serde_json::from_str::<T>(span).context("model output is not a JSON object")
        }
    }
}

fn object_span(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}
