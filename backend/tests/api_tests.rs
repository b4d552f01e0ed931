use back_office::{
    AppConfig, AppState, MemoryRepository, MemorySessionStore, MockStorageService,
    SessionManager, create_router,
    models::{NewUser, Role},
    password::hash_password,
    repository::{Repository, RepositoryState},
    storage::StorageState,
};
use reqwest::{StatusCode, header, redirect::Policy};
use serde_json::Value;
use std::sync::Arc;
use tokio::net::TcpListener;

pub struct TestApp {
    pub address: String,
    pub repo: Arc<MemoryRepository>,
}

async fn spawn_app() -> TestApp {
    let config = AppConfig::default();
    let repo = Arc::new(MemoryRepository::new());
    let state = AppState {
        repo: repo.clone() as RepositoryState,
        storage: Arc::new(MockStorageService::new()) as StorageState,
        sessions: SessionManager::new(Arc::new(MemorySessionStore::new()), &config),
        config,
    };
    let router = create_router(state);

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    TestApp { address, repo }
}

fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .redirect(Policy::none())
        .build()
        .unwrap()
}

/// `name=value` part of the session cookie the response sets.
fn session_cookie(response: &reqwest::Response) -> String {
    response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .expect("response should set the session cookie")
        .to_string()
}

#[tokio::test]
async fn test_health_check() {
    let app = spawn_app().await;
    let response = client()
        .get(format!("{}/health", app.address))
        .send()
        .await
        .expect("Failed to execute request.");

    assert!(response.status().is_success());
    assert!(response.headers().contains_key("x-request-id"));
    assert_eq!(response.text().await.unwrap(), "ok");
}

#[tokio::test]
async fn test_openapi_document_is_served() {
    let app = spawn_app().await;
    let doc: Value = client()
        .get(format!("{}/api-docs/openapi.json", app.address))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert!(doc["paths"]["/admin/events"].is_object());
    assert!(doc["paths"]["/admin/login"].is_object());
}

#[tokio::test]
async fn test_full_admin_round_trip() {
    let app = spawn_app().await;
    app.repo
        .create_user(NewUser {
            name: "Root".to_string(),
            surname: "Admin".to_string(),
            email: "root@example.com".to_string(),
            password_hash: hash_password("hunter22".to_string()).await.unwrap(),
            role: Role::Admin,
            phone: None,
            address: None,
        })
        .await
        .unwrap();
    let http = client();

    // Gate first.
    let response = http
        .get(format!("{}/admin/events", app.address))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers()[header::LOCATION], "/admin/login");

    // Sign in.
    let response = http
        .post(format!("{}/admin/login", app.address))
        .form(&[("email", "Root@Example.com"), ("password", "hunter22")])
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers()[header::LOCATION], "/admin/dashboard");
    let cookie = session_cookie(&response);

    // Create an event.
    let response = http
        .post(format!("{}/admin/events", app.address))
        .header(header::COOKIE, &cookie)
        .form(&[
            ("title", "Launch"),
            ("description", "Release party"),
            ("event_date", "2030-09-01T19:00"),
            ("location", "Rooftop"),
            ("capacity", "40"),
        ])
        .send()
        .await
        .unwrap();
    assert_eq!(response.headers()[header::LOCATION], "/admin/events");

    let page: Value = http
        .get(format!("{}/admin/events?search=launch", app.address))
        .header(header::COOKIE, &cookie)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(page["flash"]["success"][0], "Event created successfully");
    assert_eq!(page["items"][0]["title"], "Launch");
    assert_eq!(page["items"][0]["event_date"], "2030-09-01T19:00:00");

    // Sign out; the same cookie no longer works.
    let response = http
        .get(format!("{}/admin/logout", app.address))
        .header(header::COOKIE, &cookie)
        .send()
        .await
        .unwrap();
    assert_eq!(response.headers()[header::LOCATION], "/admin/login");

    let response = http
        .get(format!("{}/admin/dashboard", app.address))
        .header(header::COOKIE, &cookie)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers()[header::LOCATION], "/admin/login");
}
