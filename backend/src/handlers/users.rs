use axum::{
    Form,
    extract::{Query, State, rejection::FormRejection},
    response::Response,
};

use crate::{
    AppState, accounts,
    auth::{AdminUser, Session},
    error::AppError,
    lifecycle::{self, ResourceKind},
    models::{CreateUserForm, SearchQuery, UserSummary},
};

const KIND: ResourceKind = ResourceKind::User;

/// list_users
///
/// Accounts newest first, with how many events, trainings and jobs each one
/// signed up for.
#[utoipa::path(
    get,
    path = "/admin/users",
    params(SearchQuery),
    responses(
        (status = 200, description = "User list page", body = [UserSummary]),
        (status = 303, description = "Query failed, redirect to the dashboard")
    )
)]
pub async fn list_users(
    State(state): State<AppState>,
    AdminUser(user): AdminUser,
    session: Session,
    Query(query): Query<SearchQuery>,
) -> Response {
    let search = query.term();
    let result = state.repo.list_users(search.as_deref()).await;
    lifecycle::render_list(&session, user, KIND, search, result).await
}

#[utoipa::path(
    get,
    path = "/admin/users/new",
    responses((status = 200, description = "Empty user form"))
)]
pub async fn new_user_form(AdminUser(user): AdminUser, session: Session) -> Response {
    lifecycle::render_new_form(&session, user, KIND).await
}

#[utoipa::path(
    post,
    path = "/admin/users",
    request_body(content = CreateUserForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 303, description = "Redirect to the list on success, to the new form on failure")
    )
)]
pub async fn create_user(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    session: Session,
    form: Result<Form<CreateUserForm>, FormRejection>,
) -> Response {
    tracing::debug!(admin_id = %admin.id, "admin creating user");
    let result = match form {
        Ok(Form(form)) => accounts::create_user_by_admin(state.repo.as_ref(), form).await,
        Err(rejection) => Err(AppError::from(rejection)),
    };
    lifecycle::finish_create(&session, KIND, result).await
}
