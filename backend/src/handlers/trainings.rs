use axum::{
    Form,
    extract::{Path, Query, State, rejection::FormRejection},
    response::Response,
};
use uuid::Uuid;

use crate::{
    AppState,
    auth::{AdminUser, Session},
    error::AppError,
    lifecycle::{self, ResourceKind},
    models::{SearchQuery, Training, TrainingForm, TrainingSummary},
};

const KIND: ResourceKind = ResourceKind::Training;

#[utoipa::path(
    get,
    path = "/admin/trainings",
    params(SearchQuery),
    responses(
        (status = 200, description = "Training list page", body = [TrainingSummary]),
        (status = 303, description = "Query failed, redirect to the dashboard")
    )
)]
pub async fn list_trainings(
    State(state): State<AppState>,
    AdminUser(user): AdminUser,
    session: Session,
    Query(query): Query<SearchQuery>,
) -> Response {
    let search = query.term();
    let result = state.repo.list_trainings(search.as_deref()).await;
    lifecycle::render_list(&session, user, KIND, search, result).await
}

#[utoipa::path(
    get,
    path = "/admin/trainings/new",
    responses((status = 200, description = "Empty training form"))
)]
pub async fn new_training_form(AdminUser(user): AdminUser, session: Session) -> Response {
    lifecycle::render_new_form(&session, user, KIND).await
}

#[utoipa::path(
    post,
    path = "/admin/trainings",
    request_body(content = TrainingForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 303, description = "Redirect to the list on success, to the new form on failure")
    )
)]
pub async fn create_training(
    State(state): State<AppState>,
    session: Session,
    form: Result<Form<TrainingForm>, FormRejection>,
) -> Response {
    let result = match form.map_err(AppError::from).and_then(|Form(form)| form.validate()) {
        Ok(input) => state.repo.create_training(input).await,
        Err(e) => Err(e),
    };
    lifecycle::finish_create(&session, KIND, result).await
}

#[utoipa::path(
    get,
    path = "/admin/trainings/{id}/edit",
    params(("id" = Uuid, Path, description = "Training id")),
    responses(
        (status = 200, description = "Pre-filled training form", body = Training),
        (status = 303, description = "Training not found, redirect to the list")
    )
)]
pub async fn edit_training_form(
    State(state): State<AppState>,
    AdminUser(user): AdminUser,
    session: Session,
    Path(id): Path<Uuid>,
) -> Response {
    let result = state.repo.get_training(id).await;
    lifecycle::render_edit(&session, user, KIND, id, result).await
}

#[utoipa::path(
    post,
    path = "/admin/trainings/{id}",
    params(("id" = Uuid, Path, description = "Training id")),
    request_body(content = TrainingForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 303, description = "Redirect to the list on success, to the edit form on failure")
    )
)]
pub async fn update_training(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
    form: Result<Form<TrainingForm>, FormRejection>,
) -> Response {
    let result = match form.map_err(AppError::from).and_then(|Form(form)| form.validate()) {
        Ok(input) => state.repo.update_training(id, input).await,
        Err(e) => Err(e),
    };
    lifecycle::finish_update(&session, KIND, id, result).await
}

#[utoipa::path(
    post,
    path = "/admin/trainings/{id}/delete",
    params(("id" = Uuid, Path, description = "Training id")),
    responses((status = 303, description = "Redirect to the list"))
)]
pub async fn delete_training(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
) -> Response {
    let result = state.repo.delete_resource(KIND, id).await;
    lifecycle::finish_delete(&session, KIND, id, result).await
}
