//! Session endpoints.
//!
//! `POST /session` registers a signed-in user's OAuth grant and hands back
//! a signed session token; `DELETE /session` drops it. This is where the
//! identity provider's callback data crosses into the server.

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{delete, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use yotei_core::UserProfile;
use yotei_google::TokenBundle;

use crate::routes::{ApiError, bearer_token};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/session", post(create_session))
        .route("/session", delete(delete_session))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionRequest {
    pub uid: String,
    pub email: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default, rename = "photoURL")]
    pub photo_url: Option<String>,
    pub access_token: String,
    pub refresh_token: String,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateSessionResponse {
    session_token: String,
}

/// POST /session - register an OAuth grant, returning a signed token.
async fn create_session(
    State(state): State<AppState>,
    Json(request): Json<CreateSessionRequest>,
) -> Result<(StatusCode, Json<CreateSessionResponse>), ApiError> {
    // Keep the profile (and its hide keywords) across sign-ins.
    let mut profile = state
        .store
        .read_user(&request.uid)
        .await?
        .unwrap_or_else(|| UserProfile::new(&request.uid, &request.email));
    profile.email = request.email.clone();
    if let Some(display_name) = &request.display_name {
        profile.display_name = display_name.clone();
    }
    if let Some(photo_url) = &request.photo_url {
        profile.photo_url = photo_url.clone();
    }
    profile.last_sign_in_time = Utc::now();
    state.store.write_user(&profile).await?;

    let bundle = TokenBundle {
        access_token: request.access_token,
        refresh_token: request.refresh_token,
        expires_at: request.expires_at,
    };
    let session_token = state
        .sessions
        .create(&request.uid, &request.email, bundle)
        .await;

    Ok((
        StatusCode::CREATED,
        Json(CreateSessionResponse { session_token }),
    ))
}

/// DELETE /session - log the session out.
async fn delete_session(State(state): State<AppState>, headers: HeaderMap) -> StatusCode {
    if let Some(token) = bearer_token(&headers) {
        state.sessions.revoke(token).await;
    }
    StatusCode::NO_CONTENT
}
