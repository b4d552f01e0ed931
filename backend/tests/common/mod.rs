#![allow(dead_code)]

use axum::{
    Router,
    body::Body,
    http::{Request, Response, StatusCode, header},
};
use back_office::{
    AppConfig, AppState, MemoryRepository, MemorySessionStore, MockStorageService,
    SessionManager, create_router,
    models::{NewUser, Role, UserRecord},
    password::hash_password,
    repository::RepositoryState,
    storage::StorageState,
};
use serde_json::Value;
use std::sync::Arc;
use tower::util::ServiceExt;

pub const ADMIN_EMAIL: &str = "admin@example.com";
pub const ADMIN_PASSWORD: &str = "admin-secret";

/// In-memory application plus handles on every backend, so tests can seed
/// data and inspect side effects directly.
pub struct TestApp {
    pub router: Router,
    pub repo: Arc<MemoryRepository>,
    pub sessions: Arc<MemorySessionStore>,
    pub storage: MockStorageService,
    pub config: AppConfig,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_storage(MockStorageService::new())
    }

    pub fn with_storage(storage: MockStorageService) -> Self {
        let config = AppConfig::default();
        let repo = Arc::new(MemoryRepository::new());
        let sessions = Arc::new(MemorySessionStore::new());
        let state = AppState {
            repo: repo.clone() as RepositoryState,
            storage: Arc::new(storage.clone()) as StorageState,
            sessions: SessionManager::new(sessions.clone(), &config),
            config: config.clone(),
        };
        Self {
            router: create_router(state),
            repo,
            sessions,
            storage,
            config,
        }
    }

    pub fn client(&self) -> TestClient {
        TestClient {
            router: self.router.clone(),
            cookie: None,
            cookie_name: self.config.session_cookie.clone(),
        }
    }

    pub async fn seed_user(&self, email: &str, password: &str, role: Role) -> UserRecord {
        use back_office::repository::Repository;
        self.repo
            .create_user(NewUser {
                name: "Test".to_string(),
                surname: "User".to_string(),
                email: email.to_string(),
                password_hash: hash_password(password.to_string()).await.unwrap(),
                role,
                phone: None,
                address: None,
            })
            .await
            .unwrap()
    }

    /// A client already signed in as a freshly seeded admin.
    pub async fn admin_client(&self) -> TestClient {
        self.seed_user(ADMIN_EMAIL, ADMIN_PASSWORD, Role::Admin).await;
        let mut client = self.client();
        let res = client
            .post_form(
                "/admin/login",
                &format!("email={ADMIN_EMAIL}&password={ADMIN_PASSWORD}"),
            )
            .await;
        assert_eq!(res.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&res), "/admin/dashboard");
        client
    }
}

/// Drives the router with `oneshot`, carrying the session cookie between
/// requests like a browser would.
pub struct TestClient {
    router: Router,
    pub cookie: Option<String>,
    cookie_name: String,
}

impl TestClient {
    pub async fn send(&mut self, mut request: Request<Body>) -> Response<Body> {
        if let Some(token) = &self.cookie {
            request.headers_mut().insert(
                header::COOKIE,
                format!("{}={}", self.cookie_name, token).parse().unwrap(),
            );
        }
        let response = self.router.clone().oneshot(request).await.unwrap();
        self.absorb_cookie(&response);
        response
    }

    fn absorb_cookie(&mut self, response: &Response<Body>) {
        for value in response.headers().get_all(header::SET_COOKIE) {
            let raw = value.to_str().unwrap();
            let Some((name, rest)) = raw.split(';').next().and_then(|p| p.split_once('=')) else {
                continue;
            };
            if name != self.cookie_name {
                continue;
            }
            if rest.is_empty() || raw.contains("Max-Age=0") {
                self.cookie = None;
            } else {
                self.cookie = Some(rest.to_string());
            }
        }
    }

    pub async fn get(&mut self, uri: &str) -> Response<Body> {
        self.send(Request::get(uri).body(Body::empty()).unwrap())
            .await
    }

    pub async fn post_form(&mut self, uri: &str, body: &str) -> Response<Body> {
        self.send(
            Request::post(uri)
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
    }

    pub async fn post_multipart(
        &mut self,
        uri: &str,
        fields: &[(&str, &str)],
        file: Option<(&str, &str, &[u8])>,
    ) -> Response<Body> {
        let (content_type, body) = multipart_body(fields, file);
        self.send(
            Request::post(uri)
                .header(header::CONTENT_TYPE, content_type)
                .body(Body::from(body))
                .unwrap(),
        )
        .await
    }

    /// Renders `uri` and returns its JSON, asserting a 200.
    pub async fn page(&mut self, uri: &str) -> Value {
        let res = self.get(uri).await;
        assert_eq!(res.status(), StatusCode::OK, "GET {uri}");
        json_body(res).await
    }
}

pub fn location(response: &Response<Body>) -> String {
    response
        .headers()
        .get(header::LOCATION)
        .map(|v| v.to_str().unwrap().to_string())
        .unwrap_or_default()
}

pub async fn json_body(response: Response<Body>) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// `(name, value)` text parts plus an optional `(file name, content type, bytes)`
/// file part named `image`.
pub fn multipart_body(fields: &[(&str, &str)], file: Option<(&str, &str, &[u8])>) -> (String, Vec<u8>) {
    let boundary = "----back-office-test-boundary";
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
        body.extend_from_slice(
            format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes(),
        );
        body.extend_from_slice(value.as_bytes());
        body.extend_from_slice(b"\r\n");
    }
    if let Some((file_name, content_type, bytes)) = file {
        body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
        body.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"image\"; filename=\"{file_name}\"\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(format!("Content-Type: {content_type}\r\n\r\n").as_bytes());
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{boundary}--\r\n").as_bytes());
    (format!("multipart/form-data; boundary={boundary}"), body)
}
