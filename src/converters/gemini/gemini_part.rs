use serde::{Deserialize, Serialize};

/// Text-only part; the chat never sends inline data or function calls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeminiPart {
    pub text: String,
}
