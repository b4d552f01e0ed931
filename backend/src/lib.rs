use axum::{
    Router,
    extract::FromRef,
    http::{HeaderName, Request},
    middleware,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

// Ambient services.
pub mod config;
pub mod error;
pub mod models;
pub mod views;

// Session-backed authorization: token store, flash queue, gate.
pub mod auth;
pub mod flash;
pub mod session;

// Workflows and persistence.
pub mod accounts;
pub mod lifecycle;
pub mod password;
pub mod repository;
pub mod storage;

pub mod handlers;
pub mod routes;
use routes::{admin, public};

// --- Public Re-exports ---

pub use config::AppConfig;
pub use repository::{MemoryRepository, PostgresRepository, RepositoryState};
pub use session::{MemorySessionStore, PostgresSessionStore, SessionManager};
pub use storage::{LocalDiskStorage, MockStorageService, S3StorageClient, StorageState};

/// ApiDoc
///
/// OpenAPI description of the console's routes and view models, served at
/// `/api-docs/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::root, handlers::health,
        handlers::auth::login_page, handlers::auth::login, handlers::auth::logout,
        handlers::auth::register_page, handlers::auth::register,
        handlers::dashboard::dashboard,
        handlers::events::list_events, handlers::events::new_event_form,
        handlers::events::create_event, handlers::events::edit_event_form,
        handlers::events::update_event, handlers::events::delete_event,
        handlers::trainings::list_trainings, handlers::trainings::new_training_form,
        handlers::trainings::create_training, handlers::trainings::edit_training_form,
        handlers::trainings::update_training, handlers::trainings::delete_training,
        handlers::jobs::list_jobs, handlers::jobs::new_job_form, handlers::jobs::create_job,
        handlers::jobs::edit_job_form, handlers::jobs::update_job, handlers::jobs::delete_job,
        handlers::blogs::list_blog_posts, handlers::blogs::new_blog_post_form,
        handlers::blogs::create_blog_post, handlers::blogs::edit_blog_post_form,
        handlers::blogs::update_blog_post, handlers::blogs::delete_blog_post,
        handlers::users::list_users, handlers::users::new_user_form, handlers::users::create_user,
        handlers::messages::list_messages,
    ),
    components(
        schemas(
            models::Role, models::UserSummary, models::Event, models::EventSummary,
            models::EventForm, models::Training, models::TrainingSummary, models::TrainingForm,
            models::Job, models::JobSummary, models::JobForm, models::BlogPost,
            models::BlogPostSummary, models::BlogForm, models::ContactMessage,
            models::DashboardStats, models::LoginForm, models::RegisterForm,
            models::CreateUserForm, session::SessionUser, flash::FlashMessages,
            views::LoginPage, views::RegisterPage, views::DashboardPage, views::ErrorPage,
            lifecycle::ResourceKind,
        )
    ),
    tags(
        (name = "back-office", description = "Admin back office")
    )
)]
pub struct ApiDoc;

/// AppState
///
/// Single cloneable container of the services every handler may need.
/// Each part is also extractable on its own through `FromRef`.
#[derive(Clone)]
pub struct AppState {
    /// Persistence of users, resources and their dependents.
    pub repo: RepositoryState,
    /// Where uploaded blog images go.
    pub storage: StorageState,
    /// Token issuing and resolution, plus the flash queues.
    pub sessions: SessionManager,
    pub config: AppConfig,
}

// --- Axum FromRef Extractor Implementations ---

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for StorageState {
    fn from_ref(app_state: &AppState) -> StorageState {
        app_state.storage.clone()
    }
}

impl FromRef<AppState> for SessionManager {
    fn from_ref(app_state: &AppState) -> SessionManager {
        app_state.sessions.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// create_router
///
/// Assembles the routing tree. Layer order, outermost first: CORS, request id,
/// tracing, session resolution. The session layer therefore runs inside the
/// request span, and the admin gate (a route layer on the admin router) runs
/// after the session is known.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    let x_request_id = HeaderName::from_static("x-request-id");

    let base_router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(public::public_routes())
        .nest("/admin", admin::admin_routes(state.config.max_upload_bytes))
        .fallback(handlers::not_found)
        .layer(middleware::from_fn_with_state(
            state.sessions.clone(),
            auth::session_layer,
        ))
        .with_state(state);

    base_router
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(
                    x_request_id.clone(),
                    MakeRequestUuid,
                ))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        .layer(cors)
}

/// trace_span_logger
///
/// Request span carrying method, uri and the `x-request-id` set above, so
/// every log line of one request can be correlated.
fn trace_span_logger(request: &Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
