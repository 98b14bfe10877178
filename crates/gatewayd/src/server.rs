//! HTTP server for the gateway.
//!
//! Routes:
//! - POST /v1/skills - provision a skill (multipart upload)
//! - POST /v1/nlu    - pass-through to the NLU service
//! - GET  /healthz   - downstream reachability

use std::sync::Arc;

use axum::{
    body::{Body, Bytes},
    extract::{DefaultBodyLimit, State},
    http::{Request, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::{
    request_id::{MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::clients::{FunctionRegistryClient, NluClient};
use crate::handlers;
use crate::saga::SkillSaga;

pub const SKILLS_PATH: &str = "/v1/skills";
pub const NLU_PATH: &str = "/v1/nlu";
pub const HEALTH_PATH: &str = "/healthz";

const REQUEST_ID_HEADER: &str = "x-request-id";

/// Shared state for HTTP handlers. Read-only across requests.
pub struct AppState {
    pub saga: SkillSaga,
    pub nlu: Arc<dyn NluClient>,
    pub registry: Arc<dyn FunctionRegistryClient>,
    pub max_upload_bytes: usize,
}

impl AppState {
    pub fn new(
        nlu: Arc<dyn NluClient>,
        registry: Arc<dyn FunctionRegistryClient>,
        runtime: &str,
        max_upload_bytes: usize,
    ) -> Self {
        Self {
            saga: SkillSaga::new(Arc::clone(&nlu), Arc::clone(&registry), runtime),
            nlu,
            registry,
            max_upload_bytes,
        }
    }
}

/// Create the HTTP router with all endpoints.
pub fn create_router(state: Arc<AppState>) -> Router {
    let body_limit = state.max_upload_bytes;

    Router::new()
        .route(SKILLS_PATH, post(handlers::skills::create_skill))
        .route(NLU_PATH, post(forward_nlu).fallback(method_not_allowed))
        .route(HEALTH_PATH, get(health_check))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
            let request_id = request
                .headers()
                .get(REQUEST_ID_HEADER)
                .and_then(|v| v.to_str().ok())
                .unwrap_or("-");
            tracing::info_span!(
                "request",
                method = %request.method(),
                uri = %request.uri(),
                request_id
            )
        }))
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuidV7))
        .with_state(state)
}

/// Serve until `shutdown` is cancelled, then drain in-flight requests.
pub async fn serve(
    listener: TcpListener,
    state: Arc<AppState>,
    shutdown: CancellationToken,
) -> std::io::Result<()> {
    if let Ok(addr) = listener.local_addr() {
        info!("gateway listening on http://{}", addr);
    }

    axum::serve(listener, create_router(state))
        .with_graceful_shutdown(shutdown.cancelled_owned())
        .await
}

/// Time-ordered request ids for requests that arrive without one.
#[derive(Debug, Clone, Copy, Default)]
struct MakeRequestUuidV7;

impl MakeRequestId for MakeRequestUuidV7 {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        Uuid::now_v7().to_string().parse().ok().map(RequestId::new)
    }
}

// --- Response types ---

/// Status payload, used for both success and error bodies.
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiStatus {
    pub status: u16,
    pub message: String,
}

/// Build a `{status, message}` response.
pub fn api_status(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(ApiStatus {
            status: status.as_u16(),
            message: message.into(),
        }),
    )
        .into_response()
}

/// Response for GET /healthz.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}

pub const HEALTH_UP: &str = "UP";
pub const HEALTH_OUT_OF_SERVICE: &str = "OUT_OF_SERVICE";

/// Response for POST /v1/nlu.
#[derive(Debug, Serialize, Deserialize)]
pub struct NluProxyResponse {
    pub response: String,
}

// --- Handlers ---

/// GET /healthz - probe both downstream services.
async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let (nlu, registry) = tokio::join!(state.nlu.probe(), state.registry.probe());

    if nlu && registry {
        (
            StatusCode::OK,
            Json(HealthResponse {
                status: HEALTH_UP.to_string(),
            }),
        )
    } else {
        warn!(nlu, registry, "downstream service unreachable");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(HealthResponse {
                status: HEALTH_OUT_OF_SERVICE.to_string(),
            }),
        )
    }
}

/// POST /v1/nlu - forward the raw body and wrap the NLU answer.
async fn forward_nlu(State(state): State<Arc<AppState>>, body: Bytes) -> Response {
    match state.nlu.forward_query(body.to_vec()).await {
        Ok(answer) => Json(NluProxyResponse {
            response: answer.body,
        })
        .into_response(),
        Err(e) => {
            error!("nlu query failed: {}", e);
            api_status(StatusCode::BAD_GATEWAY, e.to_string())
        }
    }
}

async fn method_not_allowed() -> impl IntoResponse {
    (StatusCode::METHOD_NOT_ALLOWED, "Only POST method is allowed.")
}
