pub mod calendar;
pub mod session;
pub mod user;

use std::sync::Arc;

use axum::Json;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use tracing::error;

use yotei_core::YoteiError;

use crate::session::UserSession;
use crate::state::AppState;

/// Standard API error response.
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Maps the engine error taxonomy onto HTTP responses. Authentication
/// problems (including a failed refresh exchange) become 401; upstream and
/// store failures stay generic 500s with details in the log.
pub struct ApiError(YoteiError);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self.0 {
            YoteiError::Unauthorized | YoteiError::RefreshFailed(_) => {
                (StatusCode::UNAUTHORIZED, "Unauthorized".to_string())
            }
            YoteiError::InvalidCalendar(id) => {
                (StatusCode::NOT_FOUND, format!("Calendar not found: {id}"))
            }
            YoteiError::InvalidEvent(reason) => {
                (StatusCode::UNPROCESSABLE_ENTITY, reason.clone())
            }
            err => {
                error!(%err, "request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Failed to fetch calendar data".to_string(),
                )
            }
        };
        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

impl From<YoteiError> for ApiError {
    fn from(err: YoteiError) -> Self {
        ApiError(err)
    }
}

/// Extractor for the authenticated session behind the `Authorization`
/// bearer token.
pub struct CurrentSession(pub Arc<UserSession>);

impl FromRequestParts<AppState> for CurrentSession {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers).ok_or(ApiError(YoteiError::Unauthorized))?;
        let session = state
            .sessions
            .resolve(token)
            .await
            .ok_or(ApiError(YoteiError::Unauthorized))?;
        Ok(CurrentSession(session))
    }
}

pub(crate) fn bearer_token(headers: &axum::http::HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}
