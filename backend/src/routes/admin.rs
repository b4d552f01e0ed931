use crate::{AppState, auth::admin_gate, handlers};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
};

use handlers::{blogs, dashboard, events, jobs, messages, trainings, users};

/// Admin Router Module
///
/// The management console, mounted under `/admin`. The whole router is
/// wrapped in `admin_gate` as a route layer: a request without an admin
/// session is redirected to the login page before any handler runs, for
/// every resource kind alike. Unmatched paths fall through to the 404
/// fallback instead of the login redirect.
///
/// `max_upload_bytes` caps the multipart blog forms.
pub fn admin_routes(max_upload_bytes: usize) -> Router<AppState> {
    let blog_routes = Router::new()
        .route(
            "/blogs",
            get(blogs::list_blog_posts).post(blogs::create_blog_post),
        )
        .route("/blogs/new", get(blogs::new_blog_post_form))
        .route("/blogs/{id}/edit", get(blogs::edit_blog_post_form))
        .route("/blogs/{id}", post(blogs::update_blog_post))
        .route("/blogs/{id}/delete", post(blogs::delete_blog_post))
        .layer(DefaultBodyLimit::max(max_upload_bytes));

    Router::new()
        // GET /admin/dashboard
        .route("/dashboard", get(dashboard::dashboard))
        // --- Events ---
        .route(
            "/events",
            get(events::list_events).post(events::create_event),
        )
        .route("/events/new", get(events::new_event_form))
        .route("/events/{id}/edit", get(events::edit_event_form))
        .route("/events/{id}", post(events::update_event))
        // Removes registrations first, then the event.
        .route("/events/{id}/delete", post(events::delete_event))
        // --- Trainings ---
        .route(
            "/trainings",
            get(trainings::list_trainings).post(trainings::create_training),
        )
        .route("/trainings/new", get(trainings::new_training_form))
        .route("/trainings/{id}/edit", get(trainings::edit_training_form))
        .route("/trainings/{id}", post(trainings::update_training))
        .route("/trainings/{id}/delete", post(trainings::delete_training))
        // --- Jobs ---
        .route("/jobs", get(jobs::list_jobs).post(jobs::create_job))
        .route("/jobs/new", get(jobs::new_job_form))
        .route("/jobs/{id}/edit", get(jobs::edit_job_form))
        .route("/jobs/{id}", post(jobs::update_job))
        .route("/jobs/{id}/delete", post(jobs::delete_job))
        // --- Blog ---
        .merge(blog_routes)
        // --- Users (no edit, no delete) ---
        .route("/users", get(users::list_users).post(users::create_user))
        .route("/users/new", get(users::new_user_form))
        // --- Contact messages (read-only) ---
        .route("/messages", get(messages::list_messages))
        .route_layer(middleware::from_fn(admin_gate))
}
