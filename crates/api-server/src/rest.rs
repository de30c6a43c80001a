//! Shared handler state and operational endpoints.

use std::sync::Arc;
use std::time::Instant;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;
use utoipa::ToSchema;

use wreckshop_journey::JourneyEngine;

/// Shared application state for REST handlers.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<JourneyEngine>,
    pub service_name: String,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(engine: Arc<JourneyEngine>, service_name: impl Into<String>) -> Self {
        Self {
            engine,
            service_name: service_name.into(),
            start_time: Instant::now(),
        }
    }
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub ok: bool,
    pub service: String,
    pub uptime_secs: u64,
}

#[derive(Serialize, ToSchema)]
pub struct PingResponse {
    pub ok: bool,
}

/// GET /health — liveness plus uptime, in the `{ok}` envelope.
#[utoipa::path(
    get,
    path = "/health",
    tag = "Operations",
    responses(
        (status = 200, description = "Service is up", body = HealthResponse),
    )
)]
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        ok: true,
        service: state.service_name.clone(),
        uptime_secs: state.start_time.elapsed().as_secs(),
    })
}

/// GET {prefix}/ping
#[utoipa::path(
    get,
    path = "/api/ping",
    tag = "Operations",
    responses(
        (status = 200, description = "Pong", body = PingResponse),
    )
)]
pub async fn ping() -> Json<PingResponse> {
    Json(PingResponse { ok: true })
}

/// GET /ready — Readiness probe. Ready once the journey store answers.
#[utoipa::path(
    get,
    path = "/ready",
    tag = "Operations",
    responses(
        (status = 200, description = "Ready to serve"),
        (status = 503, description = "Journey store unavailable"),
    )
)]
pub async fn readiness(State(state): State<AppState>) -> StatusCode {
    match state.engine.check_store() {
        Ok(_) => StatusCode::OK,
        Err(_) => StatusCode::SERVICE_UNAVAILABLE,
    }
}

/// GET /live — Liveness probe.
#[utoipa::path(
    get,
    path = "/live",
    tag = "Operations",
    responses(
        (status = 200, description = "Process is alive"),
    )
)]
pub async fn liveness() -> StatusCode {
    StatusCode::OK
}
