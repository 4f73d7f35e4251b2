//! HTTP facade for yotei.
//!
//! Wires the token manager, the upstream calendar client and the document
//! store together behind a small axum surface: session registration, the
//! two calendar listing endpoints, event creation, calendar metadata edits
//! and the hide-keyword primitives.

pub mod config;
pub mod routes;
pub mod session;
pub mod state;

use axum::Router;
use tower_http::cors::{Any, CorsLayer};

use crate::state::AppState;

/// Assemble the full router.
pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .merge(routes::session::router())
        .merge(routes::calendar::router())
        .merge(routes::user::router())
        .with_state(state)
        .layer(cors)
}
