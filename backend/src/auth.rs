use axum::{
    extract::{FromRequestParts, Request, State},
    http::{HeaderMap, HeaderValue, StatusCode, header, request::Parts},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::{
    error::AppError,
    flash::{FlashCategory, FlashMessages},
    session::{SessionManager, SessionUser},
};

pub const LOGIN_PATH: &str = "/admin/login";
pub const DASHBOARD_PATH: &str = "/admin/dashboard";

// --- Auth Gate ---

/// Decision
///
/// Outcome of the gate. A denial only carries where to send the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    DenyRedirect(&'static str),
}

/// authorize
///
/// The single authorization predicate of the console: a session snapshot must
/// exist and carry the admin role. Applied identically to every protected
/// operation of every resource kind. Pure: it neither mutates the session nor
/// touches the flash queue.
pub fn authorize(snapshot: Option<&SessionUser>) -> Decision {
    match snapshot {
        Some(user) if user.is_admin() => Decision::Allow,
        _ => Decision::DenyRedirect(LOGIN_PATH),
    }
}

// --- Per-request session context ---

#[derive(Debug, Clone, Default, PartialEq)]
enum CookieUpdate {
    #[default]
    Unchanged,
    Set(String),
    Clear,
}

#[derive(Debug, Default)]
struct SessionState {
    token: Option<String>,
    user: Option<SessionUser>,
    cookie: CookieUpdate,
}

/// Session
///
/// Explicit per-request session context. Resolved once by [`session_layer`],
/// handed to handlers as an extractor, and consulted again on the way out to
/// emit the cookie if the token changed. Nothing here is process-wide: the
/// state lives as long as the request.
#[derive(Clone)]
pub struct Session {
    manager: SessionManager,
    state: Arc<Mutex<SessionState>>,
}

impl Session {
    pub fn new(manager: SessionManager, token: Option<String>, user: Option<SessionUser>) -> Self {
        Self {
            manager,
            state: Arc::new(Mutex::new(SessionState {
                token,
                user,
                cookie: CookieUpdate::Unchanged,
            })),
        }
    }

    /// Resolves the cookie token. A stale or unknown token is treated as no
    /// session and the cookie is cleared.
    pub async fn load(manager: &SessionManager, headers: &HeaderMap) -> Self {
        let Some(token) = manager.token_from_headers(headers) else {
            return Self::new(manager.clone(), None, None);
        };

        match manager.resolve_session(&token).await {
            Ok(Some(record)) => Self::new(manager.clone(), Some(token), record.user),
            Ok(None) => {
                let session = Self::new(manager.clone(), None, None);
                session.state.lock().await.cookie = CookieUpdate::Clear;
                session
            }
            Err(e) => {
                tracing::error!(error = %e, "session lookup failed, continuing without session");
                Self::new(manager.clone(), None, None)
            }
        }
    }

    pub async fn user(&self) -> Option<SessionUser> {
        self.state.lock().await.user.clone()
    }

    pub async fn token(&self) -> Option<String> {
        self.state.lock().await.token.clone()
    }

    pub async fn is_admin(&self) -> bool {
        self.state.lock().await.user.as_ref().is_some_and(SessionUser::is_admin)
    }

    /// Issues a fresh token for `user`. Any previous token is destroyed first so
    /// a pre-login token never becomes authenticated.
    pub async fn login(&self, user: SessionUser) -> Result<(), AppError> {
        let mut state = self.state.lock().await;
        if let Some(old) = state.token.take() {
            if let Err(e) = self.manager.destroy_session(&old).await {
                tracing::warn!(error = %e, "could not destroy pre-login session");
            }
        }

        let token = self.manager.create_session(user.clone()).await?;
        state.token = Some(token.clone());
        state.user = Some(user);
        state.cookie = CookieUpdate::Set(token);
        Ok(())
    }

    /// Destroys the session unconditionally.
    pub async fn logout(&self) {
        let mut state = self.state.lock().await;
        if let Some(token) = state.token.take() {
            if let Err(e) = self.manager.destroy_session(&token).await {
                tracing::warn!(error = %e, "session destroy failed on logout");
            }
        }
        state.user = None;
        state.cookie = CookieUpdate::Clear;
    }

    /// Queues a flash message, creating an anonymous session when there is none
    /// yet. Failures are logged and swallowed.
    pub async fn flash(&self, category: FlashCategory, message: impl Into<String>) {
        let message = message.into();
        let mut state = self.state.lock().await;

        let token = match state.token.clone() {
            Some(token) => token,
            None => match self.manager.create_anonymous().await {
                Ok(token) => {
                    state.token = Some(token.clone());
                    state.cookie = CookieUpdate::Set(token.clone());
                    token
                }
                Err(e) => {
                    tracing::warn!(error = %e, "could not open a session for flash message");
                    return;
                }
            },
        };

        if let Err(e) = self.manager.push_flash(&token, category, &message).await {
            tracing::warn!(error = %e, "flash push failed");
        }
    }

    pub async fn success(&self, message: impl Into<String>) {
        self.flash(FlashCategory::Success, message).await;
    }

    pub async fn error(&self, message: impl Into<String>) {
        self.flash(FlashCategory::Error, message).await;
    }

    /// Drains the queue. Called exactly once by every rendering handler.
    pub async fn take_flash(&self) -> FlashMessages {
        let Some(token) = self.token().await else {
            return FlashMessages::default();
        };
        self.manager.drain_flash(&token).await.unwrap_or_else(|e| {
            tracing::warn!(error = %e, "flash drain failed");
            FlashMessages::default()
        })
    }

    async fn write_cookie(&self, response: &mut Response) {
        let value = match &self.state.lock().await.cookie {
            CookieUpdate::Unchanged => return,
            CookieUpdate::Set(token) => self.manager.set_cookie_value(token),
            CookieUpdate::Clear => self.manager.clear_cookie_value(),
        };
        match HeaderValue::from_str(&value) {
            Ok(v) => {
                response.headers_mut().append(header::SET_COOKIE, v);
            }
            Err(e) => tracing::error!(error = %e, "invalid session cookie value"),
        }
    }
}

/// Session Extractor
///
/// Pulls the context installed by [`session_layer`]. Missing context is a
/// wiring bug, answered with a 500.
impl<S> FromRequestParts<S> for Session
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, &'static str);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Session>()
            .cloned()
            .ok_or((StatusCode::INTERNAL_SERVER_ERROR, "session layer missing"))
    }
}

/// session_layer
///
/// Outermost application middleware: resolves the session before routing and
/// writes the cookie after the handler ran.
pub async fn session_layer(
    State(manager): State<SessionManager>,
    mut request: Request,
    next: Next,
) -> Response {
    let session = Session::load(&manager, request.headers()).await;
    request.extensions_mut().insert(session.clone());

    let mut response = next.run(request).await;
    session.write_cookie(&mut response).await;
    response
}

// --- Admin extractor ---

/// AdminUser
///
/// The session snapshot of a request that passed [`authorize`]. Handlers that
/// need the acting admin take this as an argument; rejection is the login
/// redirect.
#[derive(Debug, Clone)]
pub struct AdminUser(pub SessionUser);

impl<S> FromRequestParts<S> for AdminUser
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user = match parts.extensions.get::<Session>() {
            Some(session) => session.user().await,
            None => None,
        };

        if let Decision::DenyRedirect(to) = authorize(user.as_ref()) {
            tracing::info!(
                uri = %parts.uri,
                role = user.as_ref().map(|u| u.role.as_str()).unwrap_or("anonymous"),
                "admin gate denied request"
            );
            return Err(Redirect::to(to).into_response());
        }

        user.map(AdminUser)
            .ok_or_else(|| Redirect::to(LOGIN_PATH).into_response())
    }
}

/// admin_gate
///
/// Route layer composed over every admin route. Extraction of `AdminUser`
/// performs the check; a denied request never reaches the handler.
pub async fn admin_gate(_admin: AdminUser, request: Request, next: Next) -> Response {
    next.run(request).await
}
