use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use utoipa::ToSchema;

use crate::{
    config::{AppConfig, Env},
    flash::FlashMessages,
    models::DashboardStats,
    session::SessionUser,
};

// Every page carries the flash queue drained for this render, so the templating
// layer never has to ask twice.

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct LoginPage {
    pub title: String,
    pub flash: FlashMessages,
    pub error: Option<String>,
}

/// RegisterPage
///
/// `is_admin` decides whether the role picker offers "admin"; it reflects the
/// session of whoever is looking at the form.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct RegisterPage {
    pub title: String,
    pub flash: FlashMessages,
    pub error: Option<String>,
    pub is_admin: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct DashboardPage {
    pub title: String,
    pub user: SessionUser,
    pub flash: FlashMessages,
    pub stats: DashboardStats,
}

/// ListPage
///
/// Shared shape of every management list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListPage<T> {
    pub title: String,
    pub user: SessionUser,
    pub flash: FlashMessages,
    pub search: String,
    pub items: Vec<T>,
}

/// FormPage
///
/// Create forms carry no `resource`; edit forms carry the row to pre-fill.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormPage<T> {
    pub title: String,
    pub user: SessionUser,
    pub flash: FlashMessages,
    pub resource: Option<T>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct ErrorPage {
    pub title: String,
    pub message: String,
    // Only populated in development mode.
    pub detail: Option<String>,
}

impl ErrorPage {
    pub fn render(
        config: &AppConfig,
        status: StatusCode,
        message: impl Into<String>,
        detail: impl std::fmt::Display,
    ) -> Response {
        let page = ErrorPage {
            title: "Error".to_string(),
            message: message.into(),
            detail: (config.env == Env::Local).then(|| detail.to_string()),
        };
        (status, Json(page)).into_response()
    }
}
