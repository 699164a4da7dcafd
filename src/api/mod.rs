//! HTTP API module
//!
//! This module contains all HTTP endpoint handlers, the WebSocket push
//! channel, and the request/response structures.

pub mod auth;
pub mod handlers;
pub mod responses;
pub mod ws;

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::state::AppState;
use handlers::*;
use ws::websocket_handler;

/// Create the HTTP router with all endpoints
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/exams", get(exams_handler))
        .route("/exams/:exam_id", get(exam_handler))
        .route("/exams/:exam_id/timer", get(timer_state_handler))
        .route("/exams/:exam_id/timer/start", post(timer_start_handler))
        .route("/exams/:exam_id/timer/pause", post(timer_pause_handler))
        .route("/exams/:exam_id/timer/reset", post(timer_reset_handler))
        .route("/exams/:exam_id/timer/adjust", post(timer_adjust_handler))
        .route("/ws", get(websocket_handler))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
