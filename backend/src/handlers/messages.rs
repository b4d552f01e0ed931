use axum::{
    extract::{Query, State},
    response::Response,
};

use crate::{
    AppState,
    auth::{AdminUser, Session},
    lifecycle::{self, ResourceKind},
    models::{ContactMessage, SearchQuery},
};

/// Read-only inbox of the public contact form.
#[utoipa::path(
    get,
    path = "/admin/messages",
    params(SearchQuery),
    responses(
        (status = 200, description = "Contact message list page", body = [ContactMessage]),
        (status = 303, description = "Query failed, redirect to the dashboard")
    )
)]
pub async fn list_messages(
    State(state): State<AppState>,
    AdminUser(user): AdminUser,
    session: Session,
    Query(query): Query<SearchQuery>,
) -> Response {
    let search = query.term();
    let result = state.repo.list_messages(search.as_deref()).await;
    lifecycle::render_list(&session, user, ResourceKind::ContactMessage, search, result).await
}
