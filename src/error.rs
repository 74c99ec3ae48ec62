//! Relay error type.
//!
//! Every failure of a relay invocation ends up as a [`RelayError`], which is
//! rendered to a JSON `{ "error": ..., "details": ... }` body. `details` is
//! only filled in development mode.

use crate::models::ErrorResponse;
use axum::Json;
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use std::error::Error as StdError;
use thiserror::Error;
use tracing::{error, warn};

pub const GENERIC_UPSTREAM_FAILURE: &str = "Request to Gemini API failed";

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("Method Not Allowed")]
    MethodNotAllowed,

    #[error("Gemini API key not configured")]
    MissingApiKey,

    /// Body is not JSON or has no array-valued `contents`.
    #[error("Invalid request format")]
    InvalidPayload { reason: String },

    /// The provider answered with a non-2xx status.
    #[error("{message}")]
    Upstream { status: StatusCode, message: String },

    /// The provider could not be reached or did not answer in time.
    #[error("{message}")]
    Transport {
        message: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Internal server error")]
    Internal(#[from] anyhow::Error),
}

impl RelayError {
    pub fn status(&self) -> StatusCode {
        match self {
            RelayError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            RelayError::InvalidPayload { .. } => StatusCode::BAD_REQUEST,
            RelayError::Upstream { status, .. } => *status,
            RelayError::MissingApiKey | RelayError::Transport { .. } | RelayError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    pub fn transport(source: reqwest::Error, timeout_secs: u64) -> Self {
        let source = source.without_url();
        let message = if source.is_timeout() {
            format!("Request to Gemini API timed out after {}s", timeout_secs)
        } else {
            let chain = error_chain(&source);
            if chain.trim().is_empty() { GENERIC_UPSTREAM_FAILURE.to_string() } else { chain }
        };
        RelayError::Transport { message, source }
    }

    /// Renders the error; `development` adds the debug chain as `details`.
    pub fn into_relay_response(self, development: bool) -> Response {
        let status = self.status();
        match &self {
            RelayError::MethodNotAllowed | RelayError::InvalidPayload { .. } => {
                warn!(status = %status, "Rejected relay request: {:?}", self)
            }
            RelayError::Upstream { .. } | RelayError::Transport { .. } => {
                warn!(status = %status, "Upstream failure: {}", self)
            }
            RelayError::MissingApiKey | RelayError::Internal(_) => {
                error!(status = %status, "Relay error: {:?}", self)
            }
        }

        let mut body = ErrorResponse::new(self.to_string());
        if development && !matches!(self, RelayError::MethodNotAllowed) {
            body.details = Some(format!("{:?}", self));
        }

        let mut response = (status, Json(body)).into_response();
        if !matches!(self, RelayError::MethodNotAllowed) {
            response
                .headers_mut()
                .insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
        }
        response
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        self.into_relay_response(false)
    }
}

fn error_chain(err: &dyn StdError) -> String {
    let mut parts = vec![err.to_string()];
    let mut current = err.source();
    while let Some(source) = current {
        let text = source.to_string();
        if !parts.iter().any(|p| p.contains(&text)) {
            parts.push(text);
        }
        current = source.source();
    }
    parts.join(": ")
}
