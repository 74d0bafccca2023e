//! Gateway endpoints. Shared error body lives here.

pub mod doc;
mod health;
mod invoke;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use amber_core::InvokeError;

/// JSON body of every gateway error answered before streaming starts.
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    pub details: String,
    /// Source chain of the underlying failure, if any.
    pub cause: Option<String>,
    #[serde(rename = "type")]
    pub kind: String,
}

impl ErrorResponse {
    pub fn from_error(error: impl Into<String>, err: &InvokeError) -> Self {
        Self {
            error: error.into(),
            details: err.to_string(),
            cause: err.cause_chain(),
            kind: err.kind().to_string(),
        }
    }

    pub fn into_response_for(self, err: &InvokeError) -> Response {
        let status =
            StatusCode::from_u16(err.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self)).into_response()
    }
}

pub use health::health;
pub use invoke::invoke_agent;
