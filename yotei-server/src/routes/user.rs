//! User profile and hide-keyword endpoints.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde::Deserialize;

use yotei_core::{UserProfile, YoteiError};

use crate::routes::{ApiError, CurrentSession};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/user", get(get_profile))
        .route("/user/keywords", post(add_keyword))
        .route("/user/keywords/{keyword}", delete(remove_keyword))
}

/// GET /user - the session user's profile.
async fn get_profile(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
) -> Result<Json<UserProfile>, ApiError> {
    let profile = state
        .store
        .read_user(&session.uid)
        .await?
        .ok_or_else(|| YoteiError::StoreUnavailable("profile missing".to_string()))?;
    Ok(Json(profile))
}

#[derive(Deserialize)]
struct KeywordRequest {
    keyword: String,
}

/// POST /user/keywords - add a hide keyword.
async fn add_keyword(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
    Json(request): Json<KeywordRequest>,
) -> Result<StatusCode, ApiError> {
    state
        .store
        .add_hide_keyword(&session.uid, &request.keyword)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /user/keywords/:keyword - remove a hide keyword.
async fn remove_keyword(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
    Path(keyword): Path<String>,
) -> Result<StatusCode, ApiError> {
    state
        .store
        .remove_hide_keyword(&session.uid, &keyword)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
