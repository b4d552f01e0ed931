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
    models::{Event, EventForm, EventSummary, SearchQuery},
};

const KIND: ResourceKind = ResourceKind::Event;

/// list_events
///
/// Events newest first, each with its registration count.
#[utoipa::path(
    get,
    path = "/admin/events",
    params(SearchQuery),
    responses(
        (status = 200, description = "Event list page", body = [EventSummary]),
        (status = 303, description = "Query failed, redirect to the dashboard")
    )
)]
pub async fn list_events(
    State(state): State<AppState>,
    AdminUser(user): AdminUser,
    session: Session,
    Query(query): Query<SearchQuery>,
) -> Response {
    let search = query.term();
    let result = state.repo.list_events(search.as_deref()).await;
    lifecycle::render_list(&session, user, KIND, search, result).await
}

#[utoipa::path(
    get,
    path = "/admin/events/new",
    responses((status = 200, description = "Empty event form"))
)]
pub async fn new_event_form(AdminUser(user): AdminUser, session: Session) -> Response {
    lifecycle::render_new_form(&session, user, KIND).await
}

#[utoipa::path(
    post,
    path = "/admin/events",
    request_body(content = EventForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 303, description = "Redirect to the list on success, to the new form on failure")
    )
)]
pub async fn create_event(
    State(state): State<AppState>,
    session: Session,
    form: Result<Form<EventForm>, FormRejection>,
) -> Response {
    let result = match form.map_err(AppError::from).and_then(|Form(form)| form.validate()) {
        Ok(input) => state.repo.create_event(input).await,
        Err(e) => Err(e),
    };
    lifecycle::finish_create(&session, KIND, result).await
}

#[utoipa::path(
    get,
    path = "/admin/events/{id}/edit",
    params(("id" = Uuid, Path, description = "Event id")),
    responses(
        (status = 200, description = "Pre-filled event form", body = Event),
        (status = 303, description = "Event not found, redirect to the list")
    )
)]
pub async fn edit_event_form(
    State(state): State<AppState>,
    AdminUser(user): AdminUser,
    session: Session,
    Path(id): Path<Uuid>,
) -> Response {
    let result = state.repo.get_event(id).await;
    lifecycle::render_edit(&session, user, KIND, id, result).await
}

/// update_event
///
/// Full overwrite of the row. A failure sends the admin back to this event's
/// edit form.
#[utoipa::path(
    post,
    path = "/admin/events/{id}",
    params(("id" = Uuid, Path, description = "Event id")),
    request_body(content = EventForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 303, description = "Redirect to the list on success, to the edit form on failure")
    )
)]
pub async fn update_event(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
    form: Result<Form<EventForm>, FormRejection>,
) -> Response {
    let result = match form.map_err(AppError::from).and_then(|Form(form)| form.validate()) {
        Ok(input) => state.repo.update_event(id, input).await,
        Err(e) => Err(e),
    };
    lifecycle::finish_update(&session, KIND, id, result).await
}

/// delete_event
///
/// Registrations go first, then the event, in one transaction.
#[utoipa::path(
    post,
    path = "/admin/events/{id}/delete",
    params(("id" = Uuid, Path, description = "Event id")),
    responses((status = 303, description = "Redirect to the list"))
)]
pub async fn delete_event(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
) -> Response {
    let result = state.repo.delete_resource(KIND, id).await;
    lifecycle::finish_delete(&session, KIND, id, result).await
}
