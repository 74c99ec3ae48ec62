use crate::config::Config;
use crate::error::RelayError;
use crate::llm_client::LlmClient;
use crate::request_id::{self, RequestId};
use axum::{
    Router,
    extract::{Extension, State},
    http::{HeaderMap, HeaderValue, Method, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{any, get},
};
use bytes::Bytes;
use serde_json::Value;
use std::any::Any;
use std::sync::Arc;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::trace::TraceLayer;
use tracing::{debug, info};

#[derive(Debug, Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub llm_client: Arc<LlmClient>,
}

pub fn app(state: AppState) -> Router {
    let development = state.config.is_development();
    Router::new()
        .route(&state.config.route, any(relay))
        .route("/health", get(|| async { "OK" }))
        .layer(axum::middleware::from_fn(request_id::inject_request_id))
        .layer(CatchPanicLayer::custom(move |panic: Box<dyn Any + Send + 'static>| {
            panic_response(panic, development)
        }))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[axum_macros::debug_handler]
pub async fn relay(
    State(state): State<AppState>,
    method: Method,
    headers: HeaderMap,
    request_id: Option<Extension<RequestId>>,
    body: Bytes,
) -> Response {
    if method == Method::OPTIONS {
        debug!("Answering CORS preflight");
        return preflight_response();
    }

    // Set by the middleware; only absent when the handler is mounted without it
    let request_id = match request_id {
        Some(Extension(id)) => id,
        None => RequestId::from_headers(&headers),
    };

    match forward(&state, &method, &request_id, &body).await {
        Ok(upstream_body) => {
            info!("Relayed {} bytes from upstream", upstream_body.len());
            (
                StatusCode::OK,
                [
                    (header::CONTENT_TYPE, HeaderValue::from_static("application/json")),
                    (header::ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*")),
                ],
                upstream_body,
            )
                .into_response()
        }
        Err(e) => e.into_relay_response(state.config.is_development()),
    }
}

async fn forward(
    state: &AppState,
    method: &Method,
    request_id: &RequestId,
    body: &[u8],
) -> Result<Bytes, RelayError> {
    if method != Method::POST {
        return Err(RelayError::MethodNotAllowed);
    }

    let api_key = state.config.resolve_api_key().ok_or(RelayError::MissingApiKey)?;
    let payload = parse_payload(body)?;

    state
        .llm_client
        .generate_content(&payload, &api_key, &state.config, Some(request_id))
        .await
}

/// Accepts any JSON object whose `contents` is an array; everything else in it
/// is forwarded untouched.
pub fn parse_payload(body: &[u8]) -> Result<Value, RelayError> {
    let payload: Value = serde_json::from_slice(body)
        .map_err(|e| RelayError::InvalidPayload { reason: e.to_string() })?;
    match payload.get("contents") {
        Some(Value::Array(_)) => Ok(payload),
        Some(_) => Err(RelayError::InvalidPayload { reason: "`contents` is not an array".to_string() }),
        None => Err(RelayError::InvalidPayload { reason: "missing `contents`".to_string() }),
    }
}

fn preflight_response() -> Response {
    (
        StatusCode::NO_CONTENT,
        [
            (header::ACCESS_CONTROL_ALLOW_ORIGIN, "*"),
            (header::ACCESS_CONTROL_ALLOW_HEADERS, "Content-Type"),
            (header::ACCESS_CONTROL_ALLOW_METHODS, "POST, OPTIONS"),
        ],
    )
        .into_response()
}

fn panic_response(panic: Box<dyn Any + Send + 'static>, development: bool) -> Response {
    let message = panic
        .downcast_ref::<String>()
        .cloned()
        .or_else(|| panic.downcast_ref::<&str>().map(|s| s.to_string()))
        .unwrap_or_else(|| "unknown panic".to_string());
    RelayError::Internal(anyhow::anyhow!("handler panicked: {}", message)).into_relay_response(development)
}
