use axum::{extract::rejection::FormRejection, http::StatusCode};
use thiserror::Error;

/// AppError
///
/// The single failure type shared by the repository, the session store and the
/// workflows. Operation boundaries turn it into a flash message plus a redirect,
/// or into a re-rendered form; it is never rendered verbatim.
#[derive(Debug, Error)]
pub enum AppError {
    /// Missing or malformed input.
    #[error("validation: {0}")]
    Validation(String),

    /// Uniqueness violation (duplicate email).
    #[error("conflict: {0}")]
    Conflict(String),

    /// Role or privilege denial.
    #[error("forbidden: {0}")]
    Authorization(String),

    /// Unknown email or wrong password. Both cases share one message on purpose.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// Missing row by id.
    #[error("not found: {0}")]
    NotFound(String),

    /// Query or connection failure.
    #[error("store: {0}")]
    Store(String),

    /// File persistence failure.
    #[error("upload: {0}")]
    Upload(String),
}

impl AppError {
    /// Status used when a page is re-rendered because of this error.
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Authorization(_) => StatusCode::FORBIDDEN,
            AppError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Store(_) | AppError::Upload(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// User-facing text. Store and upload details stay in the logs.
    pub fn public_message(&self) -> String {
        match self {
            AppError::Validation(msg)
            | AppError::Conflict(msg)
            | AppError::Authorization(msg)
            | AppError::NotFound(msg) => msg.clone(),
            AppError::InvalidCredentials => "Invalid email or password".to_string(),
            AppError::Store(_) => "An unexpected error occurred. Please try again.".to_string(),
            AppError::Upload(_) => "The uploaded file could not be saved.".to_string(),
        }
    }
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db) = &e {
            if db.is_unique_violation() {
                return AppError::Conflict("This email address is already in use".to_string());
            }
        }
        AppError::Store(e.to_string())
    }
}

/// An unreadable form body (wrong content type, duplicated field, bad value)
/// is an input problem like any other. The deserializer's text stays in the log.
impl From<FormRejection> for AppError {
    fn from(e: FormRejection) -> Self {
        tracing::info!(error = %e, "unreadable form body");
        AppError::Validation("The form could not be read. Please try again.".to_string())
    }
}
