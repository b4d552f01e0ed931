//! Resource lifecycle engine.
//!
//! Every managed collection goes through the same five operations (list,
//! fetch-for-edit, create, update, delete). The repository does the storage
//! work; this module owns what happens around it: which page is rendered,
//! which flash message is queued and where the client is redirected.

use axum::{
    Json,
    response::{IntoResponse, Redirect, Response},
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    auth::{DASHBOARD_PATH, Session},
    error::AppError,
    session::SessionUser,
    views::{FormPage, ListPage},
};

/// ResourceKind
///
/// Descriptor of a managed entity type. Users and contact messages support a
/// subset of the lifecycle (no edit, no delete).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Event,
    Training,
    Job,
    BlogPost,
    User,
    ContactMessage,
}

impl ResourceKind {
    /// Kinds with dependent rows and the full lifecycle.
    pub const DELETABLE: [ResourceKind; 4] = [
        ResourceKind::Event,
        ResourceKind::Training,
        ResourceKind::Job,
        ResourceKind::BlogPost,
    ];

    /// URL segment under `/admin`.
    pub fn slug(self) -> &'static str {
        match self {
            ResourceKind::Event => "events",
            ResourceKind::Training => "trainings",
            ResourceKind::Job => "jobs",
            ResourceKind::BlogPost => "blogs",
            ResourceKind::User => "users",
            ResourceKind::ContactMessage => "messages",
        }
    }

    pub fn table(self) -> &'static str {
        match self {
            ResourceKind::Event => "events",
            ResourceKind::Training => "trainings",
            ResourceKind::Job => "jobs",
            ResourceKind::BlogPost => "blog_posts",
            ResourceKind::User => "users",
            ResourceKind::ContactMessage => "contact_messages",
        }
    }

    /// `(table, foreign key column)` of the rows that must go before the parent.
    pub fn dependents(self) -> Option<(&'static str, &'static str)> {
        match self {
            ResourceKind::Event => Some(("event_registrations", "event_id")),
            ResourceKind::Training => Some(("training_participants", "training_id")),
            ResourceKind::Job => Some(("job_applications", "job_id")),
            ResourceKind::BlogPost => Some(("blog_comments", "post_id")),
            ResourceKind::User | ResourceKind::ContactMessage => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ResourceKind::Event => "Event",
            ResourceKind::Training => "Training",
            ResourceKind::Job => "Job posting",
            ResourceKind::BlogPost => "Blog post",
            ResourceKind::User => "User",
            ResourceKind::ContactMessage => "Message",
        }
    }

    fn plural(self) -> &'static str {
        match self {
            ResourceKind::Event => "events",
            ResourceKind::Training => "trainings",
            ResourceKind::Job => "job postings",
            ResourceKind::BlogPost => "blog posts",
            ResourceKind::User => "users",
            ResourceKind::ContactMessage => "messages",
        }
    }

    pub fn list_title(self) -> String {
        match self {
            ResourceKind::ContactMessage => "Messages".to_string(),
            _ => format!("{} Management", self.label()),
        }
    }

    pub fn list_path(self) -> String {
        format!("/admin/{}", self.slug())
    }

    pub fn new_path(self) -> String {
        format!("/admin/{}/new", self.slug())
    }

    pub fn edit_path(self, id: Uuid) -> String {
        format!("/admin/{}/{}/edit", self.slug(), id)
    }
}

/// render_list
///
/// List/Search outcome. Success renders the page (draining flash once);
/// failure is logged, flashed and sent back to the dashboard.
pub async fn render_list<T: Serialize>(
    session: &Session,
    user: SessionUser,
    kind: ResourceKind,
    search: Option<String>,
    result: Result<Vec<T>, AppError>,
) -> Response {
    match result {
        Ok(items) => {
            let page = ListPage {
                title: kind.list_title(),
                user,
                flash: session.take_flash().await,
                search: search.unwrap_or_default(),
                items,
            };
            Json(page).into_response()
        }
        Err(e) => {
            tracing::error!(kind = kind.slug(), error = %e, "list query failed");
            session
                .error(format!("An error occurred while loading {}", kind.plural()))
                .await;
            Redirect::to(DASHBOARD_PATH).into_response()
        }
    }
}

/// Empty creation form.
pub async fn render_new_form(session: &Session, user: SessionUser, kind: ResourceKind) -> Response {
    let page: FormPage<()> = FormPage {
        title: format!("New {}", kind.label()),
        user,
        flash: session.take_flash().await,
        resource: None,
    };
    Json(page).into_response()
}

/// render_edit
///
/// Fetch-for-edit outcome. A missing row and a failed lookup both flash and
/// return to the list.
pub async fn render_edit<T: Serialize>(
    session: &Session,
    user: SessionUser,
    kind: ResourceKind,
    id: Uuid,
    result: Result<Option<T>, AppError>,
) -> Response {
    match result {
        Ok(Some(resource)) => {
            let page = FormPage {
                title: format!("Edit {}", kind.label()),
                user,
                flash: session.take_flash().await,
                resource: Some(resource),
            };
            Json(page).into_response()
        }
        Ok(None) => {
            tracing::info!(kind = kind.slug(), %id, "edit requested for missing row");
            session.error(not_found(kind).public_message()).await;
            Redirect::to(&kind.list_path()).into_response()
        }
        Err(e) => {
            tracing::error!(kind = kind.slug(), %id, error = %e, "edit lookup failed");
            session
                .error(format!(
                    "An error occurred while loading the {} edit page",
                    kind.label().to_lowercase()
                ))
                .await;
            Redirect::to(&kind.list_path()).into_response()
        }
    }
}

/// finish_create
///
/// Success goes to the list; failure goes back to the creation form so the
/// user can retry.
pub async fn finish_create<T>(
    session: &Session,
    kind: ResourceKind,
    result: Result<T, AppError>,
) -> Response {
    match result {
        Ok(_) => {
            tracing::info!(kind = kind.slug(), "resource created");
            session
                .success(format!("{} created successfully", kind.label()))
                .await;
            Redirect::to(&kind.list_path()).into_response()
        }
        Err(e) => {
            log_failure(kind, "create", None, &e);
            session.error(failure_message(kind, "creating", &e)).await;
            Redirect::to(&kind.new_path()).into_response()
        }
    }
}

/// finish_update
///
/// Unconditional overwrite, last writer wins. Failure returns to the same edit
/// form so in-flight edits are not lost; a row that vanished meanwhile goes
/// back to the list.
pub async fn finish_update<T>(
    session: &Session,
    kind: ResourceKind,
    id: Uuid,
    result: Result<Option<T>, AppError>,
) -> Response {
    match result {
        Ok(Some(_)) => {
            tracing::info!(kind = kind.slug(), %id, "resource updated");
            session
                .success(format!("{} updated successfully", kind.label()))
                .await;
            Redirect::to(&kind.list_path()).into_response()
        }
        Ok(None) => {
            tracing::info!(kind = kind.slug(), %id, "update targeted missing row");
            session.error(not_found(kind).public_message()).await;
            Redirect::to(&kind.list_path()).into_response()
        }
        Err(e) => {
            log_failure(kind, "update", Some(id), &e);
            session.error(failure_message(kind, "updating", &e)).await;
            Redirect::to(&kind.edit_path(id)).into_response()
        }
    }
}

/// finish_delete
///
/// Every outcome returns to the list; there is nothing left to re-edit.
pub async fn finish_delete<T>(
    session: &Session,
    kind: ResourceKind,
    id: Uuid,
    result: Result<Option<T>, AppError>,
) -> Response {
    match result {
        Ok(Some(_)) => {
            tracing::info!(kind = kind.slug(), %id, "resource deleted with dependents");
            session
                .success(format!("{} deleted successfully", kind.label()))
                .await;
        }
        Ok(None) => {
            tracing::info!(kind = kind.slug(), %id, "delete targeted missing row");
            session.error(not_found(kind).public_message()).await;
        }
        Err(e) => {
            log_failure(kind, "delete", Some(id), &e);
            session.error(failure_message(kind, "deleting", &e)).await;
        }
    }
    Redirect::to(&kind.list_path()).into_response()
}

fn not_found(kind: ResourceKind) -> AppError {
    AppError::NotFound(format!("{} not found", kind.label()))
}

fn log_failure(kind: ResourceKind, op: &str, id: Option<Uuid>, e: &AppError) {
    match e {
        AppError::Validation(_) | AppError::Conflict(_) | AppError::NotFound(_) => {
            tracing::info!(kind = kind.slug(), op, ?id, error = %e, "operation rejected")
        }
        _ => tracing::error!(kind = kind.slug(), op, ?id, error = %e, "operation failed"),
    }
}

/// Input problems are worth showing as-is; everything else gets the generic line.
fn failure_message(kind: ResourceKind, verb: &str, e: &AppError) -> String {
    match e {
        AppError::Validation(_) | AppError::Conflict(_) | AppError::NotFound(_) => {
            e.public_message()
        }
        _ => format!(
            "An error occurred while {verb} the {}",
            kind.label().to_lowercase()
        ),
    }
}
