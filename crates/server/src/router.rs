//! HTTP router construction.

use std::sync::Arc;

use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderValue, Method};
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tracing::warn;
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable};

use crate::api;
use crate::state::AppState;

pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = cors_layer(&state.config.server.cors_origin);
    Router::new()
        .route("/health", get(api::health))
        .route("/api/invoke-agent", post(api::invoke_agent))
        .layer(cors)
        .with_state(state)
        .merge(Scalar::with_url("/docs", api::doc::ApiDoc::openapi()))
}

/// `*` allows any origin; anything else is taken as the single allowed origin.
fn cors_layer(origin: &str) -> CorsLayer {
    if origin.trim() == "*" {
        return CorsLayer::permissive();
    }
    match HeaderValue::from_str(origin.trim()) {
        Ok(origin) => CorsLayer::new()
            .allow_origin(origin)
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers([CONTENT_TYPE]),
        Err(e) => {
            warn!(
                origin = %origin,
                error = %e,
                "invalid CORS_ORIGIN, cross-origin requests disabled"
            );
            CorsLayer::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use amber_core::config::{AwsConfig, BackendConfig, ServerConfig};
    use amber_core::Config;
    use amber_relay::{BackendDescriptor, Relay};
    use axum::body::{Body, Bytes};
    use axum::extract::State;
    use axum::http::{Request, StatusCode};
    use axum::response::{IntoResponse, Response};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    const AGENT_OUTPUT: &str = "{\"status\":\"starting\"}\ndata: {\"status\":\"thinking\",\"content\":\"hm\"}\n{\"status\":\"completed\",\"formatted_response\":\"done\"}\n";

    #[derive(Clone)]
    struct FakeAgent {
        hits: Arc<AtomicUsize>,
        status: StatusCode,
    }

    async fn fake_agent(State(agent): State<FakeAgent>, body: Bytes) -> Response {
        agent.hits.fetch_add(1, Ordering::SeqCst);
        assert!(serde_json::from_slice::<serde_json::Value>(&body).is_ok());
        if agent.status.is_success() {
            let chunks = AGENT_OUTPUT
                .as_bytes()
                .chunks(7)
                .map(|c| Ok::<_, std::io::Error>(Bytes::copy_from_slice(c)))
                .collect::<Vec<_>>();
            Response::new(Body::from_stream(futures::stream::iter(chunks)))
        } else {
            (agent.status, "runtime unavailable").into_response()
        }
    }

    /// Spawn a fake agent and return its base URL with a hit counter.
    async fn spawn_agent(status: StatusCode) -> (String, Arc<AtomicUsize>) {
        let hits = Arc::new(AtomicUsize::new(0));
        let app = Router::new().fallback(fake_agent).with_state(FakeAgent {
            hits: hits.clone(),
            status,
        });
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://{}", addr), hits)
    }

    fn app(backend: BackendConfig, aws: AwsConfig, cors_origin: &str) -> Router {
        let config = Config {
            profile: String::new(),
            server: ServerConfig {
                host: "127.0.0.1".into(),
                port: 0,
                cors_origin: cors_origin.into(),
            },
            backend,
            aws,
        };
        let descriptor = BackendDescriptor::select(&config.backend, &config.aws).unwrap();
        build_router(Arc::new(AppState {
            config,
            relay: Relay::new(Arc::new(descriptor)),
        }))
    }

    fn local_app(base: &str) -> Router {
        app(
            BackendConfig::local(format!("{}/invocations", base)),
            AwsConfig::default(),
            "*",
        )
    }

    fn invoke(body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/api/invoke-agent")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn json_body(response: Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn missing_or_blank_query_is_400_without_backend_call() {
        let (base, hits) = spawn_agent(StatusCode::OK).await;

        for body in [
            "{}",
            r#"{"query":""}"#,
            r#"{"query":"   "}"#,
            r#"{"query":null}"#,
            "not json",
        ] {
            let response = local_app(&base).oneshot(invoke(body)).await.unwrap();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST, "body {:?}", body);
            let json = json_body(response).await;
            assert_eq!(json["error"], "Query is required");
            assert_eq!(json["type"], "ValidationError");
        }
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn relays_backend_stream_verbatim() {
        let (base, hits) = spawn_agent(StatusCode::OK).await;

        let response = local_app(&base)
            .oneshot(invoke(r#"{"query":"what is new in tokio"}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let headers = response.headers();
        assert_eq!(headers["content-type"], "text/event-stream");
        assert_eq!(headers["cache-control"], "no-cache");
        assert_eq!(headers["connection"], "keep-alive");

        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(bytes, AGENT_OUTPUT.as_bytes());
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn missing_credentials_is_auth_config_error() {
        let (base, hits) = spawn_agent(StatusCode::OK).await;
        let aws = AwsConfig {
            endpoint_url: Some(base),
            ..AwsConfig::default()
        };
        let router = app(
            BackendConfig::remote("arn:aws:bedrock-agentcore:us-east-1:123456789012:runtime/r"),
            aws,
            "*",
        );

        let response = router.oneshot(invoke(r#"{"query":"q"}"#)).await.unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let json = json_body(response).await;
        assert_eq!(json["error"], "Failed to invoke agent");
        assert_eq!(json["type"], "AuthConfigError");
        assert!(json["cause"].is_null());
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn backend_failure_is_500_with_body() {
        let (base, hits) = spawn_agent(StatusCode::SERVICE_UNAVAILABLE).await;

        let response = local_app(&base)
            .oneshot(invoke(r#"{"query":"q"}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let json = json_body(response).await;
        assert_eq!(json["type"], "BackendError");
        assert!(json["details"].as_str().unwrap().contains("runtime unavailable"));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn unreachable_backend_is_transport_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let response = local_app(&format!("http://{}", addr))
            .oneshot(invoke(r#"{"query":"q"}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let json = json_body(response).await;
        assert_eq!(json["type"], "TransportError");
        assert!(json["cause"].is_string());
    }

    #[tokio::test]
    async fn health_reports_backend_mode() {
        let response = local_app("http://127.0.0.1:9")
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = json_body(response).await;
        assert_eq!(json["status"], "ok");
        assert_eq!(json["backend"], "local");
        assert_eq!(json["config"]["backend"]["mode"], "local");
    }

    #[tokio::test]
    async fn configured_cors_origin_is_echoed() {
        let router = app(
            BackendConfig::local("http://127.0.0.1:9/invocations"),
            AwsConfig::default(),
            "http://localhost:5173",
        );
        let response = router
            .oneshot(
                Request::get("/health")
                    .header("origin", "http://localhost:5173")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(
            response.headers()["access-control-allow-origin"],
            "http://localhost:5173"
        );
    }
}
