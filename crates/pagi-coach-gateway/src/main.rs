//! PAGI Coach Gateway: assistant endpoint, telemetry diagnostics and live rollout control.
//! Bare metal at 127.0.0.1:8010 by default (`PAGI_COACH_BIND`).

use axum::{
    body::{Body, Bytes},
    extract::{ConnectInfo, Query, State},
    http::{Method, Request, StatusCode},
    middleware::Next,
    response::Response,
    routing::{get, post},
    Json, Router,
};
use pagi_coach_core::{
    build_router, AssistantConfig, AssistantRequest, AssistantResponse, RingBufferTelemetry, RolloutConfig,
    RolloutRouter, TelemetryLogEntry, TelemetrySink, TELEMETRY_CAPACITY,
};
use serde::Deserialize;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::{Any, CorsLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Clone)]
struct AppState {
    assistant: Arc<RolloutRouter>,
}

#[derive(Deserialize)]
struct TelemetryQuery {
    #[serde(default)]
    limit: Option<usize>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AssistantConfig::from_env()?;
    let telemetry = Arc::new(RingBufferTelemetry::default());
    let assistant = Arc::new(build_router(&config, telemetry)?);

    tracing::info!(
        target: "pagi::coach",
        bind = %config.bind,
        modern_enabled = config.modern_enabled,
        allowlist = config.modern_allowlist.len(),
        data_path = %config.data_path.display(),
        "PAGI Coach gateway starting (core {})",
        pagi_coach_core::version()
    );

    let app = build_app(AppState { assistant });
    let listener = tokio::net::TcpListener::bind(config.bind.as_str()).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;
    Ok(())
}

fn build_app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/api/v1/assistant", post(assistant_handler))
        .route("/api/v1/telemetry", get(telemetry_list).post(telemetry_record))
        .route("/api/v1/rollout", get(rollout_get).put(rollout_put))
        .with_state(Arc::new(state))
        .layer(axum::middleware::from_fn(log_coach_traffic))
        .layer(cors)
}

async fn log_coach_traffic(request: Request<Body>, next: Next) -> Response {
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.to_string())
        .unwrap_or_else(|| "local".to_string());
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let start = Instant::now();
    let response = next.run(request).await;
    tracing::info!(
        target: "pagi::coach::http",
        %peer,
        %method,
        %path,
        status = response.status().as_u16(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "request served"
    );
    response
}

async fn health() -> &'static str {
    "OK"
}

/// POST /api/v1/assistant. Always 200 with a well-formed body; an unreadable body is treated as an empty message.
async fn assistant_handler(State(state): State<Arc<AppState>>, body: Bytes) -> Json<AssistantResponse> {
    let request = match serde_json::from_slice::<AssistantRequest>(&body) {
        Ok(r) => r,
        Err(e) => {
            tracing::warn!(target: "pagi::coach::http", error = %e, "unreadable assistant request");
            AssistantRequest::default()
        }
    };
    Json(state.assistant.handle(&request).await)
}

/// GET /api/v1/telemetry?limit=N: most recent entries, newest last.
async fn telemetry_list(
    State(state): State<Arc<AppState>>,
    Query(q): Query<TelemetryQuery>,
) -> Json<Vec<TelemetryLogEntry>> {
    let limit = q.limit.unwrap_or(TELEMETRY_CAPACITY).min(TELEMETRY_CAPACITY);
    Json(state.assistant.telemetry().recent(limit))
}

/// POST /api/v1/telemetry: client-side entries share the same buffer.
async fn telemetry_record(
    State(state): State<Arc<AppState>>,
    Json(entry): Json<TelemetryLogEntry>,
) -> Result<StatusCode, (StatusCode, String)> {
    if entry.user_id.trim().is_empty() {
        return Err((StatusCode::BAD_REQUEST, "userId is required".to_string()));
    }
    state.assistant.telemetry().record(entry);
    Ok(StatusCode::ACCEPTED)
}

async fn rollout_get(State(state): State<Arc<AppState>>) -> Json<RolloutConfig> {
    Json(state.assistant.config())
}

/// PUT /api/v1/rollout: applies from the next request on.
async fn rollout_put(
    State(state): State<Arc<AppState>>,
    Json(config): Json<RolloutConfig>,
) -> Json<RolloutConfig> {
    let config = RolloutConfig::new(config.modern_enabled, config.allowlist);
    state.assistant.set_config(config);
    Json(state.assistant.config())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pagi_coach_core::contract::EMPTY_INPUT_PROMPT;
    use pagi_coach_core::{
        GenerationInvoker, KnowledgeBase, LegacyPipeline, ModernPipeline, SledCoachStore, StaticUserContext,
        ToolRegistry, GENERATION_FALLBACK,
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    fn test_app() -> Router {
        let store = Arc::new(SledCoachStore::temporary().unwrap());
        let tools = ToolRegistry::new(store.clone(), store, Arc::new(StaticUserContext::empty()));
        let modern = ModernPipeline::new(KnowledgeBase::builtin(), tools, GenerationInvoker::unconfigured());
        let router = RolloutRouter::new(
            RolloutConfig::default(),
            Arc::new(modern),
            Arc::new(LegacyPipeline::default()),
            Arc::new(RingBufferTelemetry::default()),
        );
        build_app(AppState {
            assistant: Arc::new(router),
        })
    }

    async fn call(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let req = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(body.map(|b| Body::from(b.to_string())).unwrap_or_else(Body::empty))
            .unwrap();
        let res = app.clone().oneshot(req).await.unwrap();
        let status = res.status();
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, json)
    }

    #[tokio::test]
    async fn health_is_ok() {
        let app = test_app();
        let req = Request::builder().uri("/health").body(Body::empty()).unwrap();
        let res = app.oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn assistant_navigates_via_legacy_by_default() {
        let app = test_app();
        let (status, body) = call(
            &app,
            "POST",
            "/api/v1/assistant",
            Some(json!({ "userId": "u1", "message": "go to shopping list", "context": {} })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["navigateTo"], "/shopping-list");
        assert_eq!(body["captions"], body["text"]);
    }

    #[tokio::test]
    async fn unreadable_body_still_gets_a_response() {
        let app = test_app();
        let req = Request::builder()
            .method("POST")
            .uri("/api/v1/assistant")
            .body(Body::from("{not json"))
            .unwrap();
        let res = app.oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["text"], EMPTY_INPUT_PROMPT);
    }

    #[tokio::test]
    async fn rollout_update_switches_pipeline_and_shows_in_telemetry() {
        let app = test_app();
        let (_, before) = call(&app, "GET", "/api/v1/rollout", None).await;
        assert_eq!(before["modernEnabled"], false);

        let (status, after) = call(
            &app,
            "PUT",
            "/api/v1/rollout",
            Some(json!({ "modernEnabled": true, "allowlist": ["u1"] })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(after["allowlist"], json!(["u1"]));

        let (_, reply) = call(
            &app,
            "POST",
            "/api/v1/assistant",
            Some(json!({ "userId": "u1", "message": "what is a good snack?" })),
        )
        .await;
        assert_eq!(reply["text"], GENERATION_FALLBACK);

        call(
            &app,
            "POST",
            "/api/v1/assistant",
            Some(json!({ "userId": "u2", "message": "hello" })),
        )
        .await;

        let (status, entries) = call(&app, "GET", "/api/v1/telemetry?limit=5", None).await;
        assert_eq!(status, StatusCode::OK);
        let entries = entries.as_array().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0]["path"], "modern");
        assert_eq!(entries[0]["intent"], "QNA_HEALTH");
        assert_eq!(entries[1]["path"], "legacy");
        assert_eq!(entries[1]["userId"], "u2");
    }

    #[tokio::test]
    async fn telemetry_accepts_client_entries() {
        let app = test_app();
        let (status, _) = call(
            &app,
            "POST",
            "/api/v1/telemetry",
            Some(json!({ "userId": "u9", "intent": "NAVIGATE", "toolsUsed": ["navigate"], "hasNavigateTo": true })),
        )
        .await;
        assert_eq!(status, StatusCode::ACCEPTED);

        let (status, _) = call(
            &app,
            "POST",
            "/api/v1/telemetry",
            Some(json!({ "userId": " ", "intent": "DO" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (_, entries) = call(&app, "GET", "/api/v1/telemetry?limit=1", None).await;
        assert_eq!(entries[0]["userId"], "u9");
        assert_eq!(entries[0]["toolsUsed"], json!(["navigate"]));
    }
}
