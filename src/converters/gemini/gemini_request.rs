use crate::conversation::{ChatTurn, Sender};
use serde::{Deserialize, Serialize};

use crate::converters::gemini::gemini_content::{GeminiContent, GeminiRole};

/// Body of a `generateContent` call as the chat view builds it. The relay
/// itself forwards whatever JSON it receives and never deserializes into this.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeminiRequest {
    pub contents: Vec<GeminiContent>,
}

impl From<Sender> for GeminiRole {
    fn from(sender: Sender) -> Self {
        match sender {
            Sender::User => GeminiRole::User,
            Sender::Bot => GeminiRole::Model,
        }
    }
}

impl From<&ChatTurn> for GeminiContent {
    fn from(turn: &ChatTurn) -> Self {
        GeminiContent::text(turn.sender.into(), turn.content.clone())
    }
}

impl GeminiRequest {
    /// Maps the whole transcript, preserving order.
    pub fn from_turns<'a>(turns: impl IntoIterator<Item = &'a ChatTurn>) -> Self {
        Self {
            contents: turns.into_iter().map(GeminiContent::from).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_role_mapping_preserves_order() {
        let turns = vec![
            ChatTurn { content: "a".to_string(), sender: Sender::User },
            ChatTurn { content: "b".to_string(), sender: Sender::Bot },
        ];
        let request = GeminiRequest::from_turns(&turns);

        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({
                "contents": [
                    { "role": "user", "parts": [{ "text": "a" }] },
                    { "role": "model", "parts": [{ "text": "b" }] }
                ]
            })
        );
    }

    #[test]
    fn test_empty_transcript_has_empty_contents_array() {
        let request = GeminiRequest::from_turns(&[]);
        assert_eq!(serde_json::to_value(&request).unwrap(), json!({ "contents": [] }));
    }
}
