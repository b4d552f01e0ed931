use axum::{
    Json,
    extract::State,
    response::{IntoResponse, Response},
};

use crate::{
    AppState,
    auth::{AdminUser, Session},
    views::{DashboardPage, ErrorPage},
};

/// dashboard
///
/// Landing page of the console. Unlike the lists there is nowhere to
/// redirect to on failure, so a store error renders the error page.
#[utoipa::path(
    get,
    path = "/admin/dashboard",
    responses(
        (status = 200, description = "Dashboard counters", body = DashboardPage),
        (status = 303, description = "Not signed in as admin, redirect to the login page"),
        (status = 500, description = "Counters could not be loaded", body = ErrorPage)
    )
)]
pub async fn dashboard(
    State(state): State<AppState>,
    AdminUser(user): AdminUser,
    session: Session,
) -> Response {
    match state.repo.get_stats().await {
        Ok(stats) => Json(DashboardPage {
            title: "Dashboard".to_string(),
            user,
            flash: session.take_flash().await,
            stats,
        })
        .into_response(),
        Err(e) => {
            tracing::error!(error = %e, "dashboard stats query failed");
            ErrorPage::render(
                &state.config,
                e.status(),
                "An error occurred while loading the dashboard",
                &e,
            )
        }
    }
}
