use axum::{
    Form, Json,
    extract::{State, rejection::FormRejection},
    response::{IntoResponse, Redirect, Response},
};

use crate::{
    AppState, accounts,
    auth::{DASHBOARD_PATH, LOGIN_PATH, Session},
    error::AppError,
    models::{LoginForm, RegisterForm},
    views::{LoginPage, RegisterPage},
};

const LOGIN_TITLE: &str = "Admin Login";
const REGISTER_TITLE: &str = "Register";

/// login_page
///
/// Renders the sign-in form and drains the flash queue, which is where the
/// registration success message ends up. An admin who is already signed in
/// goes straight to the dashboard.
#[utoipa::path(
    get,
    path = "/admin/login",
    responses(
        (status = 200, description = "Login form", body = LoginPage),
        (status = 303, description = "Already signed in, redirect to the dashboard")
    )
)]
pub async fn login_page(session: Session) -> Response {
    if session.is_admin().await {
        return Redirect::to(DASHBOARD_PATH).into_response();
    }
    Json(LoginPage {
        title: LOGIN_TITLE.to_string(),
        flash: session.take_flash().await,
        error: None,
    })
    .into_response()
}

/// login
///
/// Verifies the credentials and opens a fresh session. Every failure
/// re-renders the form with a message; no session is created.
#[utoipa::path(
    post,
    path = "/admin/login",
    request_body(content = LoginForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 303, description = "Signed in, redirect to the dashboard"),
        (status = 401, description = "Invalid email or password", body = LoginPage),
        (status = 422, description = "Unreadable form", body = LoginPage),
        (status = 403, description = "Account has no access to the console", body = LoginPage)
    )
)]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    form: Result<Form<LoginForm>, FormRejection>,
) -> Response {
    let form = match form {
        Ok(Form(form)) => form,
        Err(rejection) => return login_failed(&session, rejection.into()).await,
    };
    let user = match accounts::authenticate(state.repo.as_ref(), &form.email, &form.password).await
    {
        Ok(user) => user,
        Err(e) => return login_failed(&session, e).await,
    };

    match session.login(user).await {
        Ok(()) => Redirect::to(DASHBOARD_PATH).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "session could not be created after login");
            login_failed(&session, e).await
        }
    }
}

async fn login_failed(session: &Session, error: AppError) -> Response {
    let page = LoginPage {
        title: LOGIN_TITLE.to_string(),
        flash: session.take_flash().await,
        error: Some(error.public_message()),
    };
    (error.status(), Json(page)).into_response()
}

/// logout
///
/// Unconditional: with or without a session the client ends up on the login page.
#[utoipa::path(
    get,
    path = "/admin/logout",
    responses((status = 303, description = "Session destroyed, redirect to the login page"))
)]
pub async fn logout(session: Session) -> Redirect {
    if let Some(user) = session.user().await {
        tracing::info!(user_id = %user.id, "admin signed out");
    }
    session.logout().await;
    Redirect::to(LOGIN_PATH)
}

#[utoipa::path(
    get,
    path = "/register",
    responses((status = 200, description = "Registration form", body = RegisterPage))
)]
pub async fn register_page(session: Session) -> Json<RegisterPage> {
    Json(RegisterPage {
        title: REGISTER_TITLE.to_string(),
        flash: session.take_flash().await,
        error: None,
        is_admin: session.is_admin().await,
    })
}

/// register
///
/// Success hands a flash message to the login page. Failures re-render the
/// form; `is_admin` still reflects whoever submitted it.
#[utoipa::path(
    post,
    path = "/register",
    request_body(content = RegisterForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 303, description = "Registered, redirect to the login page"),
        (status = 403, description = "Admin role requested without an admin session", body = RegisterPage),
        (status = 409, description = "Email already in use", body = RegisterPage),
        (status = 422, description = "Missing fields, password mismatch or unreadable form", body = RegisterPage)
    )
)]
pub async fn register(
    State(state): State<AppState>,
    session: Session,
    form: Result<Form<RegisterForm>, FormRejection>,
) -> Response {
    let actor = session.user().await;
    let result = match form {
        Ok(Form(form)) => accounts::register(state.repo.as_ref(), actor.as_ref(), form).await,
        Err(rejection) => Err(rejection.into()),
    };

    match result {
        Ok(_) => {
            session
                .success("Registration successful! You can now sign in.")
                .await;
            Redirect::to(LOGIN_PATH).into_response()
        }
        Err(e) => {
            if matches!(e, AppError::Store(_)) {
                tracing::error!(error = %e, "registration failed");
            }
            let page = RegisterPage {
                title: REGISTER_TITLE.to_string(),
                flash: session.take_flash().await,
                error: Some(e.public_message()),
                is_admin: actor.as_ref().is_some_and(|u| u.is_admin()),
            };
            (e.status(), Json(page)).into_response()
        }
    }
}
