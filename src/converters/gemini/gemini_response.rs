use serde_json::Value;
use std::fmt;

/// Where the walk down `candidates[0].content.parts[0].text` stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyGap {
    NotAnObject,
    NoCandidates,
    NoContent,
    NoParts,
    NoText,
    EmptyText,
}

impl fmt::Display for ReplyGap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let what = match self {
            ReplyGap::NotAnObject => "response is not a JSON object",
            ReplyGap::NoCandidates => "response has no candidates",
            ReplyGap::NoContent => "first candidate has no content",
            ReplyGap::NoParts => "candidate content has no parts",
            ReplyGap::NoText => "first part has no text",
            ReplyGap::EmptyText => "first part text is empty",
        };
        f.write_str(what)
    }
}

pub fn extract_reply_text(body: &Value) -> Result<&str, ReplyGap> {
    let body = body.as_object().ok_or(ReplyGap::NotAnObject)?;
    let candidate = body
        .get("candidates")
        .and_then(Value::as_array)
        .and_then(|c| c.first())
        .ok_or(ReplyGap::NoCandidates)?;
    let content = candidate
        .get("content")
        .filter(|c| c.is_object())
        .ok_or(ReplyGap::NoContent)?;
    let part = content
        .get("parts")
        .and_then(Value::as_array)
        .and_then(|p| p.first())
        .ok_or(ReplyGap::NoParts)?;
    let text = part.get("text").and_then(Value::as_str).ok_or(ReplyGap::NoText)?;
    if text.is_empty() {
        return Err(ReplyGap::EmptyText);
    }
    Ok(text)
}
