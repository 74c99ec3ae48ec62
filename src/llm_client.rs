use crate::config::Config;
use crate::converters::gemini::GeminiErrorResponse;
use crate::error::RelayError;
use crate::request_id::RequestId;
use bytes::Bytes;
use reqwest::header::HeaderValue;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Debug)]
pub struct LlmClient {
    http_client: Arc<reqwest::Client>,
}

impl LlmClient {
    pub fn new(http_client: Arc<reqwest::Client>) -> Self {
        Self { http_client }
    }

    /// `generateContent` endpoint without the credential.
    pub fn build_target_url(config: &Config) -> String {
        let api_base = &config.api_base;
        let path = format!("models/{}:generateContent", config.model);
        if api_base.ends_with('/') { format!("{}{}", api_base, path) } else { format!("{}/{}", api_base, path) }
    }

    /// Sends the payload unchanged and returns the raw upstream body on 2xx.
    pub async fn generate_content(
        &self,
        payload: &Value,
        api_key: &str,
        config: &Config,
        request_id: Option<&RequestId>,
    ) -> Result<Bytes, RelayError> {
        let target_url = Self::build_target_url(config);

        let mut target_request = self
            .http_client
            .post(&target_url)
            .query(&[("key", api_key)])
            .header("Content-Type", "application/json")
            .timeout(config.timeout());

        if let Some(id) = request_id {
            if let Ok(val) = HeaderValue::from_str(&id.0) {
                target_request = target_request.header("x-request-id", val);
            }
        }

        info!("Forwarding request to: {}", target_url);
        debug!("request body: {}", payload);

        let response = target_request
            .json(payload)
            .send()
            .await
            .map_err(|e| RelayError::transport(e, config.timeout_secs))?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| RelayError::transport(e, config.timeout_secs))?;

        if !status.is_success() {
            let message = GeminiErrorResponse::message_from_body(&body)
                .unwrap_or_else(|| format!("Request failed with status code {}", status.as_u16()));
            debug!("upstream error body: {}", String::from_utf8_lossy(&body));
            return Err(RelayError::Upstream { status, message });
        }

        debug!("upstream responded {} with {} bytes", status, body.len());
        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use mockito::Matcher;
    use serde_json::json;

    fn client() -> LlmClient {
        LlmClient::new(Arc::new(reqwest::Client::new()))
    }

    fn config_for(url: String) -> Config {
        Config { api_base: url, timeout_secs: 5, ..Config::default() }
    }

    #[test]
    fn test_build_target_url_handles_trailing_slash() {
        let mut config = Config::default();
        assert_eq!(
            LlmClient::build_target_url(&config),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.0-flash:generateContent"
        );
        config.api_base = "http://localhost:9000/v1beta/".to_string();
        config.model = "gemini-1.5-flash".to_string();
        assert_eq!(
            LlmClient::build_target_url(&config),
            "http://localhost:9000/v1beta/models/gemini-1.5-flash:generateContent"
        );
    }

    #[tokio::test]
    async fn test_generate_content_sends_key_as_query_and_body_verbatim() {
        let payload = json!({
            "contents": [{ "role": "user", "parts": [{ "text": "hi" }] }],
            "generationConfig": { "temperature": 0.2 }
        });
        let mut server = mockito::Server::new_async().await;
        let m = server
            .mock("POST", Matcher::Regex(r"^/models/gemini-2\.0-flash:generateContent".to_string()))
            .match_query(Matcher::UrlEncoded("key".into(), "secret".into()))
            .match_header("x-request-id", "req-1")
            .match_body(Matcher::Json(payload.clone()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"candidates":[]}"#)
            .create_async()
            .await;

        let body = client()
            .generate_content(&payload, "secret", &config_for(server.url()), Some(&RequestId("req-1".to_string())))
            .await
            .unwrap();

        assert_eq!(&body[..], br#"{"candidates":[]}"#);
        m.assert_async().await;
    }

    #[tokio::test]
    async fn test_upstream_error_message_is_extracted() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("POST", Matcher::Regex("generateContent".to_string()))
            .match_query(Matcher::Any)
            .with_status(403)
            .with_body(r#"{"error":{"code":403,"message":"Permission denied","status":"PERMISSION_DENIED"}}"#)
            .create_async()
            .await;

        let err = client()
            .generate_content(&json!({ "contents": [] }), "k", &config_for(server.url()), None)
            .await
            .unwrap_err();

        match err {
            RelayError::Upstream { status, message } => {
                assert_eq!(status, StatusCode::FORBIDDEN);
                assert_eq!(message, "Permission denied");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_upstream_error_without_message_uses_status_text() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("POST", Matcher::Regex("generateContent".to_string()))
            .match_query(Matcher::Any)
            .with_status(503)
            .with_body("upstream unavailable")
            .create_async()
            .await;

        let err = client()
            .generate_content(&json!({ "contents": [] }), "k", &config_for(server.url()), None)
            .await
            .unwrap_err();

        assert_eq!(err.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(err.to_string(), "Request failed with status code 503");
    }

    #[tokio::test]
    async fn test_connection_refused_is_transport_error_without_key() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = client()
            .generate_content(&json!({ "contents": [] }), "top-secret", &config_for(format!("http://{}", addr)), None)
            .await
            .unwrap_err();

        assert!(matches!(err, RelayError::Transport { .. }));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let message = err.to_string();
        assert!(!message.is_empty());
        assert!(!message.contains("top-secret"));
        assert!(!format!("{:?}", err).contains("top-secret"));
    }
}
