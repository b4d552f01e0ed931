use back_office::{
    AppState,
    config::{AppConfig, Env},
    create_router,
    repository::{PostgresRepository, RepositoryState},
    session::{PostgresSessionStore, SessionManager},
    storage,
};
use sqlx::postgres::PgPoolOptions;
use std::{sync::Arc, time::Duration};
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// main
///
/// Boots configuration, logging, database, session store, upload storage and
/// the HTTP server, in that order. Any failure before the server is up aborts
/// the process.
#[tokio::main]
async fn main() {
    // 1. Configuration (fail-fast on missing secrets)
    dotenv::dotenv().ok();
    let config = AppConfig::load();

    // 2. Logging: pretty locally, JSON for log aggregation in production.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "back_office=debug,tower_http=info,axum=trace".into());

    match config.env {
        Env::Local => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
        Env::Production => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
    }

    tracing::info!("Application starting in {:?} mode", config.env);

    // 3. Database
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.db_url)
        .await
        .expect("FATAL: Failed to connect to Postgres. Check DATABASE_URL.");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("FATAL: Database migrations failed");

    let repo = Arc::new(PostgresRepository::new(pool.clone())) as RepositoryState;

    // 4. Sessions: the store provisions its own tables.
    let session_store = PostgresSessionStore::new(pool);
    session_store
        .provision()
        .await
        .expect("FATAL: Could not provision the session tables");
    let sessions = SessionManager::new(Arc::new(session_store), &config);
    sessions.spawn_sweeper(Duration::from_secs(config.session_sweep_secs));

    // 5. Upload storage
    let storage = storage::from_config(&config).await;
    if let Err(e) = storage.ensure_ready().await {
        panic!("FATAL: Upload storage is not usable: {e}");
    }

    // 6. State and server
    let bind_addr = config.bind_addr.clone();
    let app_state = AppState {
        repo,
        storage,
        sessions,
        config,
    };
    let app = create_router(app_state);

    let listener = TcpListener::bind(&bind_addr)
        .await
        .expect("FATAL: Could not bind the HTTP listener");

    tracing::info!("Listening on {bind_addr}");
    tracing::info!("API Documentation (Swagger UI) available at: http://{bind_addr}/swagger-ui");

    axum::serve(listener, app)
        .await
        .expect("HTTP server terminated unexpectedly");
}
