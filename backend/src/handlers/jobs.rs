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
    models::{Job, JobForm, JobSummary, SearchQuery},
};

const KIND: ResourceKind = ResourceKind::Job;

/// list_jobs
///
/// Postings ordered by deadline, latest first, with their application count.
#[utoipa::path(
    get,
    path = "/admin/jobs",
    params(SearchQuery),
    responses(
        (status = 200, description = "Job list page", body = [JobSummary]),
        (status = 303, description = "Query failed, redirect to the dashboard")
    )
)]
pub async fn list_jobs(
    State(state): State<AppState>,
    AdminUser(user): AdminUser,
    session: Session,
    Query(query): Query<SearchQuery>,
) -> Response {
    let search = query.term();
    let result = state.repo.list_jobs(search.as_deref()).await;
    lifecycle::render_list(&session, user, KIND, search, result).await
}

#[utoipa::path(
    get,
    path = "/admin/jobs/new",
    responses((status = 200, description = "Empty job form"))
)]
pub async fn new_job_form(AdminUser(user): AdminUser, session: Session) -> Response {
    lifecycle::render_new_form(&session, user, KIND).await
}

/// create_job
///
/// New postings always start active; the checkbox only exists on the edit form.
#[utoipa::path(
    post,
    path = "/admin/jobs",
    request_body(content = JobForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 303, description = "Redirect to the list on success, to the new form on failure")
    )
)]
pub async fn create_job(
    State(state): State<AppState>,
    session: Session,
    form: Result<Form<JobForm>, FormRejection>,
) -> Response {
    let result = match form.map_err(AppError::from).and_then(|Form(form)| form.validate()) {
        Ok(mut input) => {
            input.is_active = true;
            state.repo.create_job(input).await
        }
        Err(e) => Err(e),
    };
    lifecycle::finish_create(&session, KIND, result).await
}

#[utoipa::path(
    get,
    path = "/admin/jobs/{id}/edit",
    params(("id" = Uuid, Path, description = "Job id")),
    responses(
        (status = 200, description = "Pre-filled job form", body = Job),
        (status = 303, description = "Job not found, redirect to the list")
    )
)]
pub async fn edit_job_form(
    State(state): State<AppState>,
    AdminUser(user): AdminUser,
    session: Session,
    Path(id): Path<Uuid>,
) -> Response {
    let result = state.repo.get_job(id).await;
    lifecycle::render_edit(&session, user, KIND, id, result).await
}

#[utoipa::path(
    post,
    path = "/admin/jobs/{id}",
    params(("id" = Uuid, Path, description = "Job id")),
    request_body(content = JobForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 303, description = "Redirect to the list on success, to the edit form on failure")
    )
)]
pub async fn update_job(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
    form: Result<Form<JobForm>, FormRejection>,
) -> Response {
    let result = match form.map_err(AppError::from).and_then(|Form(form)| form.validate()) {
        Ok(input) => state.repo.update_job(id, input).await,
        Err(e) => Err(e),
    };
    lifecycle::finish_update(&session, KIND, id, result).await
}

#[utoipa::path(
    post,
    path = "/admin/jobs/{id}/delete",
    params(("id" = Uuid, Path, description = "Job id")),
    responses((status = 303, description = "Redirect to the list"))
)]
pub async fn delete_job(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
) -> Response {
    let result = state.repo.delete_resource(KIND, id).await;
    lifecycle::finish_delete(&session, KIND, id, result).await
}
