use serde::{Deserialize, Serialize};

/// Error envelope returned by the Gemini API on non-2xx responses.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GeminiErrorResponse {
    #[serde(default)]
    pub error: Option<GeminiErrorDetail>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GeminiErrorDetail {
    #[serde(default)]
    pub code: Option<u16>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

impl GeminiErrorResponse {
    /// `error.message` from a raw upstream body, if the body carries one.
    pub fn message_from_body(body: &[u8]) -> Option<String> {
        serde_json::from_slice::<GeminiErrorResponse>(body)
            .ok()
            .and_then(|e| e.error)
            .and_then(|d| d.message)
            .filter(|m| !m.trim().is_empty())
    }
}
