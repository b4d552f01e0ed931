//! HTTP handlers, one module per console screen group.
//!
//! Admin handlers never check the role themselves: the `admin_gate` route
//! layer runs first, and those that need the acting admin take `AdminUser`.

pub mod auth;
pub mod blogs;
pub mod dashboard;
pub mod events;
pub mod jobs;
pub mod messages;
pub mod trainings;
pub mod users;

use axum::{
    extract::State,
    http::{StatusCode, Uri},
    response::{Redirect, Response},
};

use crate::{AppState, auth::LOGIN_PATH, views::ErrorPage};

/// root
///
/// The console has no landing page of its own.
#[utoipa::path(
    get,
    path = "/",
    responses((status = 303, description = "Redirect to the login page"))
)]
pub async fn root() -> Redirect {
    Redirect::to(LOGIN_PATH)
}

#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "Service is up", body = String))
)]
pub async fn health() -> &'static str {
    "ok"
}

/// Fallback for unknown routes.
pub async fn not_found(State(state): State<AppState>, uri: Uri) -> Response {
    tracing::debug!(%uri, "no route matched");
    ErrorPage::render(
        &state.config,
        StatusCode::NOT_FOUND,
        "Page not found",
        format!("no route for {uri}"),
    )
}
