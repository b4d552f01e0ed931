use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use ts_rs::TS;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::error::AppError;

// --- Accounts ---

/// Role
///
/// The only privilege distinction in the console: admins manage everything,
/// members exist as registrants/applicants and cannot sign in here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum Role {
    Admin,
    Member,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Member => "member",
        }
    }

    pub fn parse(raw: &str) -> Result<Role, AppError> {
        match raw.trim() {
            "admin" => Ok(Role::Admin),
            "member" => Ok(Role::Member),
            "" => Err(AppError::Validation("Please fill in all fields".to_string())),
            other => Err(AppError::Validation(format!("Unknown role '{other}'"))),
        }
    }
}

/// UserRecord
///
/// Full `users` row, including the password hash. Never serialized.
#[derive(Debug, Clone, FromRow)]
pub struct UserRecord {
    pub id: Uuid,
    pub name: String,
    pub surname: String,
    pub email: String,
    // The column is called `password` but only ever holds the argon2 PHC string.
    #[sqlx(rename = "password")]
    pub password_hash: String,
    pub role: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// NewUser
///
/// Insert payload produced by the account workflows after validation and hashing.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub surname: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub phone: Option<String>,
    pub address: Option<String>,
}

/// UserSummary
///
/// A row of the user management list, with participation counters.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct UserSummary {
    pub id: Uuid,
    pub name: String,
    pub surname: String,
    pub email: String,
    pub role: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    pub event_count: i64,
    pub training_count: i64,
    pub job_count: i64,
}

// --- Events ---

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Event {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    #[ts(type = "string")]
    pub event_date: NaiveDateTime,
    pub location: String,
    pub capacity: i32,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

/// EventSummary
///
/// List row: the event plus the number of registrations pointing at it.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct EventSummary {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub event: Event,
    pub participant_count: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EventInput {
    pub title: String,
    pub description: String,
    pub event_date: NaiveDateTime,
    pub location: String,
    pub capacity: i32,
}

/// EventForm
///
/// Raw form body of the create and update event endpoints.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Default)]
#[serde(default)]
pub struct EventForm {
    pub title: String,
    pub description: String,
    #[schema(example = "2025-06-01T18:30")]
    pub event_date: String,
    pub location: String,
    pub capacity: String,
}

impl EventForm {
    pub fn validate(self) -> Result<EventInput, AppError> {
        Ok(EventInput {
            title: required("Title", &self.title)?,
            description: required("Description", &self.description)?,
            event_date: parse_datetime("Event date", &self.event_date)?,
            location: required("Location", &self.location)?,
            capacity: parse_capacity(&self.capacity)?,
        })
    }
}

// --- Trainings ---

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Training {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    #[ts(type = "string")]
    pub start_date: NaiveDate,
    #[ts(type = "string")]
    pub end_date: NaiveDate,
    pub location: String,
    pub capacity: i32,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct TrainingSummary {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub training: Training,
    pub participant_count: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrainingInput {
    pub title: String,
    pub description: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub location: String,
    pub capacity: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Default)]
#[serde(default)]
pub struct TrainingForm {
    pub title: String,
    pub description: String,
    #[schema(example = "2025-06-01")]
    pub start_date: String,
    #[schema(example = "2025-06-05")]
    pub end_date: String,
    pub location: String,
    pub capacity: String,
}

impl TrainingForm {
    pub fn validate(self) -> Result<TrainingInput, AppError> {
        let start_date = parse_date("Start date", &self.start_date)?;
        let end_date = parse_date("End date", &self.end_date)?;
        if end_date < start_date {
            return Err(AppError::Validation(
                "End date cannot be before start date".to_string(),
            ));
        }
        Ok(TrainingInput {
            title: required("Title", &self.title)?,
            description: required("Description", &self.description)?,
            start_date,
            end_date,
            location: required("Location", &self.location)?,
            capacity: parse_capacity(&self.capacity)?,
        })
    }
}

// --- Jobs ---

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Job {
    pub id: Uuid,
    pub title: String,
    pub company: String,
    pub location: String,
    pub description: String,
    pub requirements: String,
    #[ts(type = "string")]
    pub deadline: NaiveDate,
    pub is_active: bool,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct JobSummary {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub job: Job,
    pub application_count: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct JobInput {
    pub title: String,
    pub company: String,
    pub location: String,
    pub description: String,
    pub requirements: String,
    pub deadline: NaiveDate,
    pub is_active: bool,
}

/// JobForm
///
/// `is_active` arrives as a checkbox: absent means unchecked. New postings are
/// always created active, so the create handler ignores it.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Default)]
#[serde(default)]
pub struct JobForm {
    pub title: String,
    pub company: String,
    pub location: String,
    pub description: String,
    pub requirements: String,
    #[schema(example = "2025-07-31")]
    pub deadline: String,
    pub is_active: Option<String>,
}

impl JobForm {
    pub fn validate(self) -> Result<JobInput, AppError> {
        Ok(JobInput {
            title: required("Title", &self.title)?,
            company: required("Company", &self.company)?,
            location: required("Location", &self.location)?,
            description: required("Description", &self.description)?,
            requirements: self.requirements.trim().to_string(),
            deadline: parse_date("Deadline", &self.deadline)?,
            is_active: self.is_active.as_deref().is_some_and(is_checked),
        })
    }
}

// --- Blog ---

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct BlogPost {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    pub summary: Option<String>,
    // Public path of the uploaded cover image, e.g. `/uploads/blogs/<name>`.
    pub image_path: Option<String>,
    // Weak reference: the author may be gone.
    pub author_id: Option<Uuid>,
    pub is_published: bool,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct BlogPostSummary {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub post: BlogPost,
    pub author_name: Option<String>,
    pub author_surname: Option<String>,
    pub comment_count: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BlogPostInput {
    pub title: String,
    pub content: String,
    pub summary: Option<String>,
    pub is_published: bool,
}

/// BlogForm
///
/// Text parts of the multipart blog form. The image part is handled separately.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Default)]
#[serde(default)]
pub struct BlogForm {
    pub title: String,
    pub content: String,
    pub summary: String,
    pub is_published: Option<String>,
}

impl BlogForm {
    /// `publish_by_default` is set on create: posts written from the console go live.
    pub fn validate(self, publish_by_default: bool) -> Result<BlogPostInput, AppError> {
        Ok(BlogPostInput {
            title: required("Title", &self.title)?,
            content: required("Content", &self.content)?,
            summary: optional(&self.summary),
            is_published: match self.is_published.as_deref() {
                Some(raw) => is_checked(raw),
                None => publish_by_default,
            },
        })
    }
}

// --- Contact messages ---

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct ContactMessage {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub message: String,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

// --- Dashboard ---

/// DashboardStats
///
/// Counters shown on the admin landing page.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default, PartialEq)]
#[ts(export)]
pub struct DashboardStats {
    pub total_users: i64,
    pub total_events: i64,
    pub total_trainings: i64,
    pub total_jobs: i64,
    pub total_blog_posts: i64,
    pub total_messages: i64,
}

// --- Account forms ---

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Default)]
#[serde(default)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

/// RegisterForm
///
/// Self-registration body. `password2` is the confirmation field.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Default)]
#[serde(default)]
pub struct RegisterForm {
    pub name: String,
    pub surname: String,
    pub email: String,
    pub password: String,
    pub password2: String,
    pub role: String,
}

/// CreateUserForm
///
/// Admin-initiated account creation; no confirmation field, optional contact data.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Default)]
#[serde(default)]
pub struct CreateUserForm {
    pub name: String,
    pub surname: String,
    pub email: String,
    pub password: String,
    pub role: String,
    pub phone: String,
    pub address: String,
}

/// SearchQuery
///
/// `?search=` on every list endpoint.
#[derive(Debug, Clone, Deserialize, IntoParams, Default)]
#[into_params(parameter_in = Query)]
pub struct SearchQuery {
    /// Case-insensitive substring matched against the resource's text fields.
    pub search: Option<String>,
}

impl SearchQuery {
    /// A blank term means "no filter".
    pub fn term(&self) -> Option<String> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    }
}

// --- Input helpers ---

/// Emails are compared and stored trimmed and lower-cased.
pub fn normalize_email(raw: &str) -> String {
    raw.trim().to_lowercase()
}

fn required(label: &str, value: &str) -> Result<String, AppError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(AppError::Validation(format!("{label} is required")));
    }
    Ok(value.to_string())
}

pub(crate) fn optional(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

fn parse_capacity(raw: &str) -> Result<i32, AppError> {
    raw.trim()
        .parse::<i32>()
        .ok()
        .filter(|c| *c >= 0)
        .ok_or_else(|| AppError::Validation("Capacity must be a non-negative number".to_string()))
}

fn parse_date(label: &str, raw: &str) -> Result<NaiveDate, AppError> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|_| AppError::Validation(format!("{label} must be a date (YYYY-MM-DD)")))
}

// `datetime-local` inputs omit seconds; hand-typed values often use a space.
const DATETIME_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%d %H:%M:%S",
];

fn parse_datetime(label: &str, raw: &str) -> Result<NaiveDateTime, AppError> {
    let raw = raw.trim();
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .ok_or_else(|| {
            AppError::Validation(format!("{label} must be a date and time (YYYY-MM-DDTHH:MM)"))
        })
}

fn is_checked(raw: &str) -> bool {
    matches!(raw.trim(), "on" | "true" | "1" | "yes")
}
