//! Lenient extraction of JSON from model output.
//!
//! Models wrap JSON in code fences or surround it with prose often enough
//! that a strict parse would waste a corrective round trip. This tries, in
//! order: the whole text, the first fenced block, and the span from the
//! first opening bracket to the last matching closing bracket.

use serde::de::DeserializeOwned;

use crate::error::NomadicError;

pub(crate) fn extract_json<T: DeserializeOwned>(text: &str) -> Result<T, NomadicError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(NomadicError::MalformedResponse("empty response".to_string()));
    }

    let mut last_err = match serde_json::from_str::<T>(trimmed) {
        Ok(value) => return Ok(value),
        Err(e) => e.to_string(),
    };

    for candidate in [fenced_block(trimmed), bracketed_span(trimmed)].into_iter().flatten() {
        match serde_json::from_str::<T>(candidate) {
            Ok(value) => return Ok(value),
            Err(e) => last_err = e.to_string(),
        }
    }

    Err(NomadicError::MalformedResponse(last_err))
}

/// Contents of the first ```-fenced block, without the language tag.
fn fenced_block(text: &str) -> Option<&str> {
    let start = text.find("```")?;
    let after = &text[start + 3..];
    // Skip the info string (e.g. "json") up to the end of the fence line.
    let body_start = after.find('\n').map(|i| i + 1).unwrap_or(0);
    let body = &after[body_start..];
    let end = body.find("```")?;
    Some(body[..end].trim())
}

/// From the first `{` or `[` to the last matching closer.
fn bracketed_span(text: &str) -> Option<&str> {
    let start = text.find(['{', '['])?;
    let closer = if text[start..].starts_with('{') { '}' } else { ']' };
    let end = text.rfind(closer)?;
    (end > start).then(|| &text[start..=end])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::EntryMetadata;

    #[test]
    fn plain_json() {
        let v: Vec<String> = extract_json(r#"["a", "b"]"#).unwrap();
        assert_eq!(v, vec!["a", "b"]);
    }

    #[test]
    fn fenced_json_with_language_tag() {
        let text = "Here you go:\n```json\n{\"mood\": \"calm\", \"places\": [\"Kyoto\"]}\n```\nEnjoy!";
        let m: EntryMetadata = extract_json(text).unwrap();
        assert_eq!(m.mood.as_deref(), Some("calm"));
        assert_eq!(m.places, vec!["Kyoto"]);
    }

    #[test]
    fn prose_around_json() {
        let text = "Sure! [\"What surprised you?\", \"Who did you meet?\"] Hope that helps.";
        let v: Vec<String> = extract_json(text).unwrap();
        assert_eq!(v.len(), 2);
    }

    #[test]
    fn garbage_is_malformed() {
        let err = extract_json::<Vec<String>>("I'd rather not.").unwrap_err();
        assert!(matches!(err, NomadicError::MalformedResponse(_)));
        assert!(matches!(
            extract_json::<Vec<String>>("   "),
            Err(NomadicError::MalformedResponse(_))
        ));
    }

    #[test]
    fn wrong_shape_is_malformed() {
        assert!(extract_json::<Vec<String>>(r#"{"questions": []}"#).is_err());
    }
}
