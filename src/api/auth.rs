//! Privileged caller check for timer-mutating endpoints

use axum::http::{header::AUTHORIZATION, HeaderMap};
use tracing::warn;

use crate::{error::ApiError, state::AppState};

/// Require `Authorization: Bearer <admin token>`
pub fn require_admin(state: &AppState, headers: &HeaderMap) -> Result<(), ApiError> {
    let header = headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or(ApiError::Unauthorized)?;

    let token = match header.split_once(' ') {
        Some(("Bearer", token)) if !token.is_empty() => token,
        _ => return Err(ApiError::Unauthorized),
    };

    if !state.is_admin_token(token) {
        warn!("Rejected timer control request with a non-admin token");
        return Err(ApiError::Forbidden);
    }
    Ok(())
}
