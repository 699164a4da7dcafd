//! HTTP endpoint handlers

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::HeaderMap,
    response::Json,
};
use tracing::info;

use super::{
    auth::require_admin,
    responses::{
        AdjustRequest, ApiResponse, DurationRequest, ExamResponse, ExamsResponse, HealthResponse,
    },
};
use crate::{
    error::{ApiError, Result},
    state::{millis_from_f64, AppState, TimerSnapshot},
};

fn requested_duration(body: Option<Json<DurationRequest>>) -> Option<i64> {
    body.and_then(|Json(req)| req.duration_ms).and_then(millis_from_f64)
}

/// Handle GET /health - Health check endpoint
pub async fn health_handler(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse::ok(state.get_uptime()))
}

/// Handle GET /exams - List the exam catalog
pub async fn exams_handler(State(state): State<Arc<AppState>>) -> Json<ExamsResponse> {
    Json(ExamsResponse {
        exams: state.catalog.all().to_vec(),
    })
}

/// Handle GET /exams/:exam_id - Look up one exam
pub async fn exam_handler(
    State(state): State<Arc<AppState>>,
    Path(exam_id): Path<String>,
) -> Result<Json<ExamResponse>> {
    let exam = state
        .catalog
        .get(&exam_id)
        .cloned()
        .ok_or(ApiError::ExamNotFound(exam_id))?;
    Ok(Json(ExamResponse { exam }))
}

/// Handle GET /exams/:exam_id/timer - Current snapshot, open to any caller
pub async fn timer_state_handler(
    State(state): State<Arc<AppState>>,
    Path(exam_id): Path<String>,
) -> Json<TimerSnapshot> {
    state.initialize_from_catalog(&exam_id);
    Json(state.engine.snapshot(&exam_id))
}

/// Handle POST /exams/:exam_id/timer/start - Start or resume the countdown
pub async fn timer_start_handler(
    State(state): State<Arc<AppState>>,
    Path(exam_id): Path<String>,
    headers: HeaderMap,
    body: Option<Json<DurationRequest>>,
) -> Result<Json<ApiResponse>> {
    require_admin(&state, &headers)?;

    state.initialize_from_catalog(&exam_id);
    state.engine.start(&exam_id, requested_duration(body));

    info!("Start endpoint called for exam {}", exam_id);
    Ok(Json(ApiResponse::ok("Timer started", state.engine.snapshot(&exam_id))))
}

/// Handle POST /exams/:exam_id/timer/pause - Freeze the countdown
pub async fn timer_pause_handler(
    State(state): State<Arc<AppState>>,
    Path(exam_id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<ApiResponse>> {
    require_admin(&state, &headers)?;

    state.engine.pause(&exam_id);

    info!("Pause endpoint called for exam {}", exam_id);
    Ok(Json(ApiResponse::ok("Timer paused", state.engine.snapshot(&exam_id))))
}

/// Handle POST /exams/:exam_id/timer/reset - Restore the full duration
pub async fn timer_reset_handler(
    State(state): State<Arc<AppState>>,
    Path(exam_id): Path<String>,
    headers: HeaderMap,
    body: Option<Json<DurationRequest>>,
) -> Result<Json<ApiResponse>> {
    require_admin(&state, &headers)?;

    state.initialize_from_catalog(&exam_id);
    state.engine.reset(&exam_id, requested_duration(body));

    info!("Reset endpoint called for exam {}", exam_id);
    Ok(Json(ApiResponse::ok("Timer reset", state.engine.snapshot(&exam_id))))
}

/// Handle POST /exams/:exam_id/timer/adjust - Add or remove time
pub async fn timer_adjust_handler(
    State(state): State<Arc<AppState>>,
    Path(exam_id): Path<String>,
    headers: HeaderMap,
    body: Option<Json<AdjustRequest>>,
) -> Result<Json<ApiResponse>> {
    require_admin(&state, &headers)?;

    let Some(Json(req)) = body else {
        return Err(ApiError::invalid("deltaMs is required"));
    };
    let delta_ms = req.delta_ms.ok_or_else(|| ApiError::invalid("deltaMs is required"))?;

    // an empty viewer id means a global adjustment
    let viewer_id = req.user_id.as_deref().filter(|id| !id.is_empty());
    state.engine.adjust(&exam_id, delta_ms, viewer_id);

    info!(
        "Adjust endpoint called for exam {} ({}ms, viewer: {:?})",
        exam_id, delta_ms, req.user_id
    );
    Ok(Json(ApiResponse::ok("Timer adjusted", state.engine.snapshot(&exam_id))))
}
