//! Journey REST endpoints. Every response uses the `{ok, data, error}` envelope.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;
use serde_json::Value;
use tracing::info;
use utoipa::IntoParams;
use uuid::Uuid;

use wreckshop_journey::{AuditEntry, Journey, JourneyError, JourneyFunnel, JourneyInput};

use crate::actor::CallerActor;
use crate::envelope::{ApiEnvelope, ApiError, ApiResult, ErrorEnvelope};
use crate::rest::AppState;

/// Query string of `GET /journeys`.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListParams {
    /// Case-insensitive substring of the journey name.
    pub q: Option<String>,
    /// `draft`, `active` or `paused`.
    pub status: Option<String>,
}

/// No journey can have an id that is not a UUID.
fn journey_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| ApiError::Journey(JourneyError::NotFound(raw.to_string())))
}

/// POST /journeys — Create a journey, `draft` unless the body says otherwise.
#[utoipa::path(
    post,
    path = "/api/journeys",
    tag = "Journeys",
    request_body = JourneyInput,
    params(("x-actor-id" = Option<String>, Header, description = "Calling profile id")),
    responses(
        (status = 200, description = "Created journey in `data`", body = Journey),
        (status = 400, description = "Validation failed", body = ErrorEnvelope),
    )
)]
pub async fn create_journey(
    State(state): State<AppState>,
    CallerActor(actor): CallerActor,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Journey> {
    let Json(raw) = body?;
    let journey = state.engine.create(JourneyInput::from_json(raw), &actor)?;
    metrics::counter!("journeys.created").increment(1);
    Ok(Json(ApiEnvelope::data(journey)))
}

/// GET /journeys — List journeys, most recently updated first.
#[utoipa::path(
    get,
    path = "/api/journeys",
    tag = "Journeys",
    params(ListParams),
    responses(
        (status = 200, description = "Matching journeys in `data`", body = [Journey]),
    )
)]
pub async fn list_journeys(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> ApiResult<Vec<Journey>> {
    let journeys = state
        .engine
        .list(params.q.as_deref(), params.status.as_deref())?;
    Ok(Json(ApiEnvelope::data(journeys)))
}

/// GET /journeys/:id
#[utoipa::path(
    get,
    path = "/api/journeys/{id}",
    tag = "Journeys",
    params(("id" = String, Path, description = "Journey id")),
    responses(
        (status = 200, description = "Journey in `data`", body = Journey),
        (status = 404, description = "Unknown journey", body = ErrorEnvelope),
    )
)]
pub async fn get_journey(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Journey> {
    let journey = state.engine.get(journey_id(&id)?)?;
    Ok(Json(ApiEnvelope::data(journey)))
}

/// PATCH /journeys/:id — Partial update, drafts only.
#[utoipa::path(
    patch,
    path = "/api/journeys/{id}",
    tag = "Journeys",
    request_body = JourneyInput,
    params(
        ("id" = String, Path, description = "Journey id"),
        ("x-actor-id" = Option<String>, Header, description = "Calling profile id"),
    ),
    responses(
        (status = 200, description = "Updated journey in `data`", body = Journey),
        (status = 400, description = "Validation failed", body = ErrorEnvelope),
        (status = 404, description = "Unknown journey", body = ErrorEnvelope),
        (status = 409, description = "Journey is not a draft, or changed concurrently", body = ErrorEnvelope),
    )
)]
pub async fn update_journey(
    State(state): State<AppState>,
    Path(id): Path<String>,
    CallerActor(actor): CallerActor,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Journey> {
    let id = journey_id(&id)?;
    let input = match body {
        Ok(Json(raw)) => JourneyInput::from_json(raw),
        Err(rejection) => {
            // Unknown and non-draft journeys are reported ahead of a bad body.
            state.engine.editable(id)?;
            return Err(rejection.into());
        }
    };
    let journey = state.engine.update(id, input, &actor)?;
    metrics::counter!("journeys.updated").increment(1);
    Ok(Json(ApiEnvelope::data(journey)))
}

/// POST /journeys/:id/publish — draft → active.
#[utoipa::path(
    post,
    path = "/api/journeys/{id}/publish",
    tag = "Journeys",
    params(("id" = String, Path, description = "Journey id")),
    responses(
        (status = 200, description = "Published journey in `data`", body = Journey),
        (status = 400, description = "Missing trigger step or target segment", body = ErrorEnvelope),
        (status = 404, description = "Unknown journey", body = ErrorEnvelope),
        (status = 409, description = "Journey is not a draft", body = ErrorEnvelope),
    )
)]
pub async fn publish_journey(
    State(state): State<AppState>,
    Path(id): Path<String>,
    CallerActor(actor): CallerActor,
) -> ApiResult<Journey> {
    let journey = state.engine.publish(journey_id(&id)?, &actor)?;
    metrics::counter!("journeys.published").increment(1);
    Ok(Json(ApiEnvelope::data(journey)))
}

/// POST /journeys/:id/pause — active → paused.
#[utoipa::path(
    post,
    path = "/api/journeys/{id}/pause",
    tag = "Journeys",
    params(("id" = String, Path, description = "Journey id")),
    responses(
        (status = 200, description = "Paused journey in `data`", body = Journey),
        (status = 404, description = "Unknown journey", body = ErrorEnvelope),
        (status = 409, description = "Journey is not active", body = ErrorEnvelope),
    )
)]
pub async fn pause_journey(
    State(state): State<AppState>,
    Path(id): Path<String>,
    CallerActor(actor): CallerActor,
) -> ApiResult<Journey> {
    let journey = state.engine.pause(journey_id(&id)?, &actor)?;
    metrics::counter!("journeys.paused").increment(1);
    Ok(Json(ApiEnvelope::data(journey)))
}

/// POST /journeys/:id/resume — paused → active.
#[utoipa::path(
    post,
    path = "/api/journeys/{id}/resume",
    tag = "Journeys",
    params(("id" = String, Path, description = "Journey id")),
    responses(
        (status = 200, description = "Resumed journey in `data`", body = Journey),
        (status = 404, description = "Unknown journey", body = ErrorEnvelope),
        (status = 409, description = "Journey is not paused", body = ErrorEnvelope),
    )
)]
pub async fn resume_journey(
    State(state): State<AppState>,
    Path(id): Path<String>,
    CallerActor(actor): CallerActor,
) -> ApiResult<Journey> {
    let journey = state.engine.resume(journey_id(&id)?, &actor)?;
    metrics::counter!("journeys.resumed").increment(1);
    Ok(Json(ApiEnvelope::data(journey)))
}

/// POST /journeys/:id/duplicate — New draft copy, from any status.
#[utoipa::path(
    post,
    path = "/api/journeys/{id}/duplicate",
    tag = "Journeys",
    params(("id" = String, Path, description = "Journey id")),
    responses(
        (status = 200, description = "The new draft in `data`", body = Journey),
        (status = 404, description = "Unknown journey", body = ErrorEnvelope),
    )
)]
pub async fn duplicate_journey(
    State(state): State<AppState>,
    Path(id): Path<String>,
    CallerActor(actor): CallerActor,
) -> ApiResult<Journey> {
    let copy = state.engine.duplicate(journey_id(&id)?, &actor)?;
    metrics::counter!("journeys.duplicated").increment(1);
    Ok(Json(ApiEnvelope::data(copy)))
}

/// DELETE /journeys/:id — Remove a journey in any status.
#[utoipa::path(
    delete,
    path = "/api/journeys/{id}",
    tag = "Journeys",
    params(("id" = String, Path, description = "Journey id")),
    responses(
        (status = 200, description = "Deleted; body is `{ok: true}`"),
        (status = 404, description = "Unknown journey", body = ErrorEnvelope),
    )
)]
pub async fn delete_journey(
    State(state): State<AppState>,
    Path(id): Path<String>,
    CallerActor(actor): CallerActor,
) -> ApiResult<()> {
    let removed = state.engine.remove(journey_id(&id)?, &actor)?;
    info!(journey_id = %removed.id, "Journey removed via API");
    metrics::counter!("journeys.deleted").increment(1);
    Ok(Json(ApiEnvelope::ok()))
}

/// GET /journeys/:id/audit — Mutation history, oldest first.
#[utoipa::path(
    get,
    path = "/api/journeys/{id}/audit",
    tag = "Journeys",
    params(("id" = String, Path, description = "Journey id")),
    responses(
        (status = 200, description = "Audit entries in `data`; empty for unknown ids", body = [AuditEntry]),
    )
)]
pub async fn journey_audit(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Vec<AuditEntry>> {
    let entries = match Uuid::parse_str(&id) {
        Ok(id) => state.engine.audit_trail(id),
        Err(_) => Vec::new(),
    };
    Ok(Json(ApiEnvelope::data(entries)))
}

/// GET /journeys/:id/funnel — Per-step funnel from stored metrics.
#[utoipa::path(
    get,
    path = "/api/journeys/{id}/funnel",
    tag = "Journeys",
    params(("id" = String, Path, description = "Journey id")),
    responses(
        (status = 200, description = "Funnel in `data`", body = JourneyFunnel),
        (status = 404, description = "Unknown journey", body = ErrorEnvelope),
    )
)]
pub async fn journey_funnel(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<JourneyFunnel> {
    let funnel = state.engine.funnel(journey_id(&id)?)?;
    Ok(Json(ApiEnvelope::data(funnel)))
}
