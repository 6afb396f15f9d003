//! REST endpoints for dashboards and the onboarding wizard.
//!
//! Thin JSON layer over [`HostEngine`]; all rules live in the engine.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use rust_decimal::Decimal;
use serde::Deserialize;
use tower_http::cors::CorsLayer;
use uuid::Uuid;

use crate::engine::HostEngine;
use crate::error::EngineError;
use crate::negotiation::offer::BookingOffer;
use crate::negotiation::state::DeclineDisposition;

/// Shared state for API routes.
#[derive(Clone)]
pub struct ApiState {
    pub engine: Arc<HostEngine>,
}

/// Build the Axum router for the engine's HTTP surface.
pub fn engine_routes(engine: Arc<HostEngine>) -> Router {
    let state = ApiState { engine };

    Router::new()
        .route("/health", get(health))
        .route("/api/hosts/{host_id}/steps", get(get_steps))
        .route("/api/hosts/{host_id}/progress", get(get_progress))
        .route("/api/hosts/{host_id}/checklist", get(get_checklist))
        .route("/api/hosts/{host_id}/steps/{step}/open", post(open_step))
        .route("/api/hosts/{host_id}/refresh", post(refresh_host))
        .route("/api/hosts/{host_id}/offers", post(assign_offer))
        .route("/api/requests/{id}/negotiation", get(get_negotiation))
        .route("/api/requests/{id}/counter-offer", post(submit_counter))
        .route("/api/requests/{id}/counter-resolution", post(resolve_counter))
        .route("/api/requests/{id}/decline", post(decline))
        .route("/api/requests/{id}/onboarding/start", post(start_onboarding))
        .route("/api/requests/{id}/onboarding/photos", post(add_photos))
        .route(
            "/api/requests/{id}/onboarding/photos/remove",
            post(remove_photo),
        )
        .route(
            "/api/requests/{id}/onboarding/photos/complete",
            post(complete_photos),
        )
        .route("/api/requests/{id}/onboarding/rate", post(confirm_rate))
        .route(
            "/api/requests/{id}/onboarding/payout/refresh",
            post(refresh_payout),
        )
        .route("/api/requests/{id}/onboarding/finalize", post(finalize))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// ── Health ──────────────────────────────────────────────────────────────

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "fleetside"
    }))
}

// ── Host queries ────────────────────────────────────────────────────────

/// GET /api/hosts/{host_id}/steps
async fn get_steps(State(state): State<ApiState>, Path(host_id): Path<String>) -> Response {
    match state.engine.step_statuses(&host_id).await {
        Ok(steps) => Json(steps).into_response(),
        Err(e) => error_response(e),
    }
}

/// GET /api/hosts/{host_id}/progress
async fn get_progress(State(state): State<ApiState>, Path(host_id): Path<String>) -> Response {
    match state.engine.progress(&host_id).await {
        Ok(progress) => Json(progress).into_response(),
        Err(e) => error_response(e),
    }
}

/// GET /api/hosts/{host_id}/checklist
async fn get_checklist(State(state): State<ApiState>, Path(host_id): Path<String>) -> Response {
    match state.engine.listing_checklist(&host_id).await {
        Ok(checklist) => Json(checklist).into_response(),
        Err(e) => error_response(e),
    }
}

/// POST /api/hosts/{host_id}/steps/{step}/open — gate for entering a step's
/// flow; locked steps answer 409 with the blocking dependency named.
async fn open_step(
    State(state): State<ApiState>,
    Path((host_id, step)): Path<(String, String)>,
) -> Response {
    let step = match step.parse::<crate::steps::rules::StepId>() {
        Ok(step) => step,
        Err(e) => {
            return (
                StatusCode::NOT_FOUND,
                Json(serde_json::json!({ "error": e })),
            )
                .into_response();
        }
    };
    match state.engine.open_step(&host_id, step).await {
        Ok(view) => Json(view).into_response(),
        Err(e) => error_response(e),
    }
}

/// POST /api/hosts/{host_id}/refresh — pull fresh data from all sources.
async fn refresh_host(State(state): State<ApiState>, Path(host_id): Path<String>) -> Response {
    match state.engine.refresh(&host_id).await {
        Ok(snapshot) => Json(serde_json::json!({
            "fetched_at": snapshot.fetched_at,
            "freshness": snapshot.freshness,
        }))
        .into_response(),
        Err(e) => error_response(e),
    }
}

/// POST /api/hosts/{host_id}/offers — assign a booking offer to a host.
async fn assign_offer(
    State(state): State<ApiState>,
    Path(host_id): Path<String>,
    Json(offer): Json<BookingOffer>,
) -> Response {
    let request_id = offer.request_id;
    state.engine.assign_offer(&host_id, offer).await;
    (
        StatusCode::CREATED,
        Json(serde_json::json!({ "request_id": request_id })),
    )
        .into_response()
}

// ── Negotiation ─────────────────────────────────────────────────────────

/// GET /api/requests/{id}/negotiation
async fn get_negotiation(State(state): State<ApiState>, Path(id): Path<Uuid>) -> Response {
    match state.engine.negotiation_view(id).await {
        Ok(view) => Json(view).into_response(),
        Err(e) => error_response(e),
    }
}

#[derive(Debug, Deserialize)]
struct CounterBody {
    amount: Decimal,
    #[serde(default)]
    note: Option<String>,
}

/// POST /api/requests/{id}/counter-offer
async fn submit_counter(
    State(state): State<ApiState>,
    Path(id): Path<Uuid>,
    Json(body): Json<CounterBody>,
) -> Response {
    match state
        .engine
        .submit_counter_offer(id, body.amount, body.note)
        .await
    {
        Ok(()) => accepted(),
        Err(e) => error_response(e),
    }
}

#[derive(Debug, Deserialize)]
struct ResolutionBody {
    approved: bool,
}

/// POST /api/requests/{id}/counter-resolution — reviewer decision.
async fn resolve_counter(
    State(state): State<ApiState>,
    Path(id): Path<Uuid>,
    Json(body): Json<ResolutionBody>,
) -> Response {
    match state.engine.resolve_counter_offer(id, body.approved).await {
        Ok(()) => accepted(),
        Err(e) => error_response(e),
    }
}

#[derive(Debug, Deserialize)]
struct DeclineBody {
    /// Explicitly required; there is no default disposition.
    disposition: DeclineDisposition,
    #[serde(default)]
    reason: Option<String>,
}

/// POST /api/requests/{id}/decline
async fn decline(
    State(state): State<ApiState>,
    Path(id): Path<Uuid>,
    Json(body): Json<DeclineBody>,
) -> Response {
    match state.engine.decline(id, body.disposition, body.reason).await {
        Ok(()) => accepted(),
        Err(e) => error_response(e),
    }
}

// ── Onboarding wizard ───────────────────────────────────────────────────

/// POST /api/requests/{id}/onboarding/start
async fn start_onboarding(State(state): State<ApiState>, Path(id): Path<Uuid>) -> Response {
    match state.engine.start_onboarding(id).await {
        Ok(()) => accepted(),
        Err(e) => error_response(e),
    }
}

#[derive(Debug, Deserialize)]
struct PhotosBody {
    references: Vec<String>,
}

/// POST /api/requests/{id}/onboarding/photos
async fn add_photos(
    State(state): State<ApiState>,
    Path(id): Path<Uuid>,
    Json(body): Json<PhotosBody>,
) -> Response {
    match state.engine.add_photos(id, body.references).await {
        Ok(count) => Json(serde_json::json!({ "photo_count": count })).into_response(),
        Err(e) => error_response(e),
    }
}

#[derive(Debug, Deserialize)]
struct RemovePhotoBody {
    reference: String,
}

/// POST /api/requests/{id}/onboarding/photos/remove
async fn remove_photo(
    State(state): State<ApiState>,
    Path(id): Path<Uuid>,
    Json(body): Json<RemovePhotoBody>,
) -> Response {
    match state.engine.remove_photo(id, &body.reference).await {
        Ok(count) => Json(serde_json::json!({ "photo_count": count })).into_response(),
        Err(e) => error_response(e),
    }
}

/// POST /api/requests/{id}/onboarding/photos/complete
async fn complete_photos(State(state): State<ApiState>, Path(id): Path<Uuid>) -> Response {
    match state.engine.complete_photos(id).await {
        Ok(progress) => Json(progress).into_response(),
        Err(e) => error_response(e),
    }
}

#[derive(Debug, Deserialize)]
struct RateBody {
    /// Omit to accept the prefilled rate (approved counter-offer, else the
    /// original offer).
    #[serde(default)]
    rate: Option<Decimal>,
}

/// POST /api/requests/{id}/onboarding/rate
async fn confirm_rate(
    State(state): State<ApiState>,
    Path(id): Path<Uuid>,
    Json(body): Json<RateBody>,
) -> Response {
    match state.engine.confirm_rate(id, body.rate).await {
        Ok(rate) => Json(serde_json::json!({ "confirmed_rate": rate })).into_response(),
        Err(e) => error_response(e),
    }
}

/// POST /api/requests/{id}/onboarding/payout/refresh
async fn refresh_payout(State(state): State<ApiState>, Path(id): Path<Uuid>) -> Response {
    match state.engine.refresh_payout(id).await {
        Ok(connected) => Json(serde_json::json!({ "connected": connected })).into_response(),
        Err(e) => error_response(e),
    }
}

/// POST /api/requests/{id}/onboarding/finalize
async fn finalize(State(state): State<ApiState>, Path(id): Path<Uuid>) -> Response {
    match state.engine.finalize_onboarding(id).await {
        Ok(()) => accepted(),
        Err(e) => error_response(e),
    }
}

// ── Shared responses ────────────────────────────────────────────────────

fn accepted() -> Response {
    Json(serde_json::json!({ "accepted": true })).into_response()
}

fn status_for(err: &EngineError) -> StatusCode {
    match err {
        EngineError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        EngineError::Locked(_) | EngineError::Conflict(_) => StatusCode::CONFLICT,
        EngineError::Expired(_) => StatusCode::GONE,
        EngineError::Upstream(_) => StatusCode::BAD_GATEWAY,
    }
}

fn error_response(err: EngineError) -> Response {
    (
        status_for(&err),
        Json(serde_json::json!({ "error": err.to_string() })),
    )
        .into_response()
}
