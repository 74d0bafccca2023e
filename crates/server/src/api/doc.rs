//! OpenAPI document, served via Scalar UI at `/docs`.

use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "amber gateway API",
        version = "0.1.0",
        description = "Invocation gateway relaying research queries to a local agent or an AgentCore runtime.",
    ),
    tags(
        (name = "Health", description = "Gateway liveness and redacted configuration"),
        (name = "Invocation", description = "Streamed agent invocations"),
    ),
    paths(
        crate::api::health::health,
        crate::api::invoke::invoke_agent,
    ),
    components(schemas(
        crate::api::ErrorResponse,
        crate::api::health::HealthResponse,
        crate::api::invoke::InvokeAgentRequest,
    ))
)]
pub struct ApiDoc;
