//! Error taxonomy of the relay.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

/// Failure modes of one relay call.
///
/// Every variant maps to a single terminal JSON response; the relay never
/// retries on behalf of the caller.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("API key is required")]
    AuthMissing,

    #[error("{0}")]
    InvalidInput(String),

    #[error("Invalid API key")]
    AuthInvalid,

    #[error("Rate limit exceeded. Please try again later.")]
    RateLimited,

    #[error("Upstream service is currently unavailable")]
    UpstreamUnavailable,

    #[error("{0}")]
    Unknown(String),
}

impl RelayError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::AuthMissing | Self::InvalidInput(_) => StatusCode::BAD_REQUEST,
            Self::AuthInvalid => StatusCode::UNAUTHORIZED,
            Self::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            Self::UpstreamUnavailable | Self::Unknown(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        (self.status(), Json(json!({ "error": self.to_string() }))).into_response()
    }
}
