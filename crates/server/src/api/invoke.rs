//! `POST /api/invoke-agent`: validate, relay, stream back verbatim.

use std::sync::Arc;

use axum::body::Body;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::header::{CACHE_CONTROL, CONNECTION, CONTENT_TYPE};
use axum::http::{HeaderName, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use tracing::{error, info, warn};

use amber_core::{InvocationRequest, InvokeError};

use super::ErrorResponse;
use crate::state::AppState;

const X_ACCEL_BUFFERING: HeaderName = HeaderName::from_static("x-accel-buffering");

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct InvokeAgentRequest {
    /// Research question forwarded to the agent.
    pub query: Option<String>,
}

fn validate(
    payload: Result<Json<InvokeAgentRequest>, JsonRejection>,
) -> Result<InvocationRequest, InvokeError> {
    let Json(body) = payload.map_err(|rejection| InvokeError::Validation(rejection.body_text()))?;
    InvocationRequest::new(body.query.unwrap_or_default())
}

#[utoipa::path(
    post,
    path = "/api/invoke-agent",
    tag = "Invocation",
    request_body = InvokeAgentRequest,
    responses(
        (status = 200, description = "Agent event stream, relayed verbatim", content_type = "text/event-stream"),
        (status = 400, description = "Query missing or empty", body = ErrorResponse),
        (status = 500, description = "Signing, transport or backend failure", body = ErrorResponse)
    )
)]
pub async fn invoke_agent(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<InvokeAgentRequest>, JsonRejection>,
) -> Response {
    let request = match validate(payload) {
        Ok(request) => request,
        Err(e) => {
            warn!(error = %e, "rejecting invocation");
            return ErrorResponse::from_error("Query is required", &e).into_response_for(&e);
        }
    };

    info!(query_len = request.query.len(), "invocation accepted");

    match state.relay.relay(&request).await {
        Ok(stream) => (
            StatusCode::OK,
            [
                (CONTENT_TYPE, "text/event-stream"),
                (CACHE_CONTROL, "no-cache"),
                (CONNECTION, "keep-alive"),
                (X_ACCEL_BUFFERING, "no"),
            ],
            Body::from_stream(stream),
        )
            .into_response(),
        Err(e) => {
            error!(error = %e, kind = e.kind(), "agent invocation failed");
            ErrorResponse::from_error("Failed to invoke agent", &e).into_response_for(&e)
        }
    }
}
