use crate::{AppState, handlers};
use axum::{Router, routing::get};

/// Public Router Module
///
/// Endpoints reachable without an admin session. Registration is here on
/// purpose: the workflow itself decides whether the admin role may be assigned.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /
        // No landing page; sends the client to the login form.
        .route("/", get(handlers::root))
        // GET /health
        // Liveness probe for load balancers.
        .route("/health", get(handlers::health))
        // GET/POST /register
        .route(
            "/register",
            get(handlers::auth::register_page).post(handlers::auth::register),
        )
        // GET/POST /admin/login
        // The login form is the redirect target of every gate denial, so it
        // must stay outside the admin router.
        .route(
            "/admin/login",
            get(handlers::auth::login_page).post(handlers::auth::login),
        )
        // GET /admin/logout
        .route("/admin/logout", get(handlers::auth::logout))
}
