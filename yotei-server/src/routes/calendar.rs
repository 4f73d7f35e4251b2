//! Calendar endpoints.
//!
//! Each handler resolves the session's access credential, calls the
//! upstream client and persists the result, so the cache (and every live
//! subscriber) sees what the response body sees.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;

use yotei_core::{CalendarInfo, CalendarInfoPatch, Event, NewEvent};

use crate::routes::{ApiError, CurrentSession};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/calendar", get(list_primary))
        .route(
            "/calendar/{calendar_id}",
            get(list_events)
                .post(create_event)
                .patch(update_calendar_info),
        )
}

#[derive(Serialize)]
struct PrimaryResponse {
    email: String,
    calendars: Option<CalendarInfo>,
    events: Vec<Event>,
}

/// GET /calendar - the session account's primary calendar and its events.
async fn list_primary(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
) -> Result<Json<PrimaryResponse>, ApiError> {
    let data = state
        .sync
        .refresh_primary(&session.uid, &session.email, &session.tokens)
        .await?;

    Ok(Json(PrimaryResponse {
        email: data.email,
        calendars: data.primary,
        events: data.events,
    }))
}

#[derive(Serialize)]
struct EventsResponse {
    email: String,
    events: Vec<Event>,
}

/// GET /calendar/:calendar_id - events of a specific calendar.
async fn list_events(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
    Path(calendar_id): Path<String>,
) -> Result<Json<EventsResponse>, ApiError> {
    let data = state
        .sync
        .refresh_account(&session.uid, &session.email, &calendar_id, &session.tokens)
        .await?;

    Ok(Json(EventsResponse {
        email: data.email,
        events: data.events,
    }))
}

/// POST /calendar/:calendar_id - create an event upstream and append it to
/// the cached account. The calendar id doubles as the account email.
async fn create_event(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
    Path(calendar_id): Path<String>,
    Json(event): Json<NewEvent>,
) -> Result<(StatusCode, Json<Event>), ApiError> {
    let created = state
        .sync
        .create_event(
            &session.uid,
            &calendar_id,
            &calendar_id,
            &session.tokens,
            &event,
        )
        .await?;

    Ok((StatusCode::CREATED, Json(created)))
}

/// PATCH /calendar/:calendar_id - merge a colour / display-name edit into
/// the cached metadata.
async fn update_calendar_info(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
    Path(calendar_id): Path<String>,
    Json(patch): Json<CalendarInfoPatch>,
) -> Result<StatusCode, ApiError> {
    state
        .store
        .merge_calendar_info(&session.uid, &calendar_id, &patch)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
