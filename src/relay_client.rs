use crate::conversation::{RelayTransport, TransportError};
use crate::converters::gemini::GeminiRequest;
use crate::models::ErrorResponse;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

/// Posts transcripts to a running relay over HTTP.
#[derive(Debug, Clone)]
pub struct HttpRelayTransport {
    http_client: Arc<reqwest::Client>,
    relay_url: String,
}

impl HttpRelayTransport {
    pub fn new(http_client: Arc<reqwest::Client>, relay_url: impl Into<String>) -> Self {
        Self { http_client, relay_url: relay_url.into() }
    }

    pub fn relay_url(&self) -> &str {
        &self.relay_url
    }
}

impl RelayTransport for HttpRelayTransport {
    async fn send(&self, request: &GeminiRequest) -> Result<Value, TransportError> {
        debug!("Posting {} turns to {}", request.contents.len(), self.relay_url);
        let response = self.http_client.post(&self.relay_url).json(request).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.bytes().await.unwrap_or_default();
            let message = serde_json::from_slice::<ErrorResponse>(&body).ok().map(|e| e.error);
            return Err(TransportError::Relay { status: status.as_u16(), message });
        }

        // A 2xx body that is not JSON still counts as an answer without reply text
        let body = response.bytes().await?;
        Ok(serde_json::from_slice::<Value>(&body).unwrap_or_else(|e| {
            debug!("Relay returned a non-JSON success body: {}", e);
            Value::Null
        }))
    }
}
