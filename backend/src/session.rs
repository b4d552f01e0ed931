use async_trait::async_trait;
use axum::http::HeaderMap;
use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool, types::Json};
use std::{collections::HashMap, sync::Arc, time::Duration};
use tokio::sync::RwLock;
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    config::AppConfig,
    error::AppError,
    flash::FlashCategory,
    models::UserRecord,
};

/// SessionUser
///
/// Snapshot of the signed-in user, copied from the `users` row at login.
/// It is a read-only cache: a role change on the row is only observed after
/// the user signs in again.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct SessionUser {
    pub id: Uuid,
    pub name: String,
    pub surname: String,
    pub email: String,
    pub role: String,
}

impl SessionUser {
    pub fn is_admin(&self) -> bool {
        self.role == "admin"
    }
}

impl From<&UserRecord> for SessionUser {
    fn from(user: &UserRecord) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            surname: user.surname.clone(),
            email: user.email.clone(),
            role: user.role.clone(),
        }
    }
}

/// SessionRecord
///
/// Server-side value behind a token. `user` is `None` for an anonymous session
/// that only exists to carry flash messages across a redirect.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionRecord {
    pub user: Option<SessionUser>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// SessionStore
///
/// Persistence contract for sessions and their flash queues. Operations on
/// different tokens never interact.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn insert(&self, token: &str, record: &SessionRecord) -> Result<(), AppError>;
    /// Raw lookup; expiry is applied by the manager.
    async fn load(&self, token: &str) -> Result<Option<SessionRecord>, AppError>;
    async fn remove(&self, token: &str) -> Result<(), AppError>;
    async fn push_flash(
        &self,
        token: &str,
        category: FlashCategory,
        message: &str,
    ) -> Result<(), AppError>;
    /// Returns the queued messages in push order and clears them in one step.
    async fn take_flash(&self, token: &str) -> Result<Vec<(FlashCategory, String)>, AppError>;
    /// Physically drops sessions whose expiry is at or before `now`.
    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64, AppError>;
}

pub type SessionStoreState = Arc<dyn SessionStore>;

// --- Postgres ---

/// PostgresSessionStore
///
/// Keeps sessions in `admin_sessions` and flash queues in `admin_session_flash`.
/// Both tables are provisioned by [`PostgresSessionStore::provision`], not by
/// the application migrations.
pub struct PostgresSessionStore {
    pool: PgPool,
}

#[derive(FromRow)]
struct SessionRow {
    user_snapshot: Option<Json<SessionUser>>,
    created_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

#[derive(FromRow)]
struct FlashRow {
    id: i64,
    category: String,
    message: String,
}

impl PostgresSessionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Creates the session tables if they do not exist yet.
    pub async fn provision(&self) -> Result<(), AppError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS admin_sessions (
                token TEXT PRIMARY KEY,
                user_snapshot JSONB,
                created_at TIMESTAMPTZ NOT NULL,
                expires_at TIMESTAMPTZ NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS admin_sessions_expires_at_idx ON admin_sessions (expires_at)",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS admin_session_flash (
                id BIGSERIAL PRIMARY KEY,
                token TEXT NOT NULL REFERENCES admin_sessions(token) ON DELETE CASCADE,
                category TEXT NOT NULL,
                message TEXT NOT NULL,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl SessionStore for PostgresSessionStore {
    async fn insert(&self, token: &str, record: &SessionRecord) -> Result<(), AppError> {
        sqlx::query(
            "INSERT INTO admin_sessions (token, user_snapshot, created_at, expires_at) VALUES ($1, $2, $3, $4)",
        )
        .bind(token)
        .bind(record.user.clone().map(Json))
        .bind(record.created_at)
        .bind(record.expires_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn load(&self, token: &str) -> Result<Option<SessionRecord>, AppError> {
        let row = sqlx::query_as::<_, SessionRow>(
            "SELECT user_snapshot, created_at, expires_at FROM admin_sessions WHERE token = $1",
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| SessionRecord {
            user: r.user_snapshot.map(|Json(user)| user),
            created_at: r.created_at,
            expires_at: r.expires_at,
        }))
    }

    async fn remove(&self, token: &str) -> Result<(), AppError> {
        sqlx::query("DELETE FROM admin_sessions WHERE token = $1")
            .bind(token)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn push_flash(
        &self,
        token: &str,
        category: FlashCategory,
        message: &str,
    ) -> Result<(), AppError> {
        sqlx::query("INSERT INTO admin_session_flash (token, category, message) VALUES ($1, $2, $3)")
            .bind(token)
            .bind(category.as_str())
            .bind(message)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn take_flash(&self, token: &str) -> Result<Vec<(FlashCategory, String)>, AppError> {
        // DELETE ... RETURNING reads and clears in a single statement.
        let mut rows = sqlx::query_as::<_, FlashRow>(
            "DELETE FROM admin_session_flash WHERE token = $1 RETURNING id, category, message",
        )
        .bind(token)
        .fetch_all(&self.pool)
        .await?;
        rows.sort_by_key(|r| r.id);

        Ok(rows
            .into_iter()
            .filter_map(|r| FlashCategory::parse(&r.category).map(|c| (c, r.message)))
            .collect())
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64, AppError> {
        let res = sqlx::query("DELETE FROM admin_sessions WHERE expires_at <= $1")
            .bind(now)
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected())
    }
}

// --- In-memory ---

struct MemoryEntry {
    record: SessionRecord,
    flash: Vec<(FlashCategory, String)>,
}

/// MemorySessionStore
///
/// Process-local store for tests and single-node development.
#[derive(Default)]
pub struct MemorySessionStore {
    entries: RwLock<HashMap<String, MemoryEntry>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored sessions, expired ones included.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn insert(&self, token: &str, record: &SessionRecord) -> Result<(), AppError> {
        let mut entries = self.entries.write().await;
        entries.insert(
            token.to_string(),
            MemoryEntry {
                record: record.clone(),
                flash: Vec::new(),
            },
        );
        Ok(())
    }

    async fn load(&self, token: &str) -> Result<Option<SessionRecord>, AppError> {
        let entries = self.entries.read().await;
        Ok(entries.get(token).map(|e| e.record.clone()))
    }

    async fn remove(&self, token: &str) -> Result<(), AppError> {
        self.entries.write().await.remove(token);
        Ok(())
    }

    async fn push_flash(
        &self,
        token: &str,
        category: FlashCategory,
        message: &str,
    ) -> Result<(), AppError> {
        let mut entries = self.entries.write().await;
        let entry = entries
            .get_mut(token)
            .ok_or_else(|| AppError::Store("no session for flash push".to_string()))?;
        entry.flash.push((category, message.to_string()));
        Ok(())
    }

    async fn take_flash(&self, token: &str) -> Result<Vec<(FlashCategory, String)>, AppError> {
        let mut entries = self.entries.write().await;
        Ok(entries
            .get_mut(token)
            .map(|e| std::mem::take(&mut e.flash))
            .unwrap_or_default())
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64, AppError> {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, e| e.record.expires_at > now);
        Ok((before - entries.len()) as u64)
    }
}

// --- Manager ---

/// SessionManager
///
/// Owns the token -> snapshot mapping: issues tokens, resolves them (expired
/// entries read as absent) and destroys them. Also knows how the token travels
/// in the cookie.
#[derive(Clone)]
pub struct SessionManager {
    store: SessionStoreState,
    ttl: TimeDelta,
    cookie_name: String,
    secure_cookie: bool,
}

impl SessionManager {
    pub fn new(store: SessionStoreState, config: &AppConfig) -> Self {
        Self {
            store,
            ttl: TimeDelta::hours(config.session_ttl_hours),
            cookie_name: config.session_cookie.clone(),
            secure_cookie: config.secure_cookies(),
        }
    }

    /// Overrides the lifetime. Mostly useful to exercise expiry in tests.
    pub fn with_ttl(mut self, ttl: TimeDelta) -> Self {
        self.ttl = ttl;
        self
    }

    pub(crate) fn store(&self) -> &SessionStoreState {
        &self.store
    }

    /// createSession: stores the snapshot with expiry = now + ttl.
    pub async fn create_session(&self, user: SessionUser) -> Result<String, AppError> {
        self.insert_record(Some(user)).await
    }

    /// Session without a user, created on demand to carry flash messages.
    pub async fn create_anonymous(&self) -> Result<String, AppError> {
        self.insert_record(None).await
    }

    async fn insert_record(&self, user: Option<SessionUser>) -> Result<String, AppError> {
        let token = new_token();
        let now = Utc::now();
        let record = SessionRecord {
            user,
            created_at: now,
            expires_at: now + self.ttl,
        };
        self.store.insert(&token, &record).await?;
        Ok(token)
    }

    /// resolveSession: `None` for unknown and for expired tokens.
    pub async fn resolve_session(&self, token: &str) -> Result<Option<SessionRecord>, AppError> {
        let record = self.store.load(token).await?;
        Ok(record.filter(|r| r.expires_at > Utc::now()))
    }

    /// destroySession: immediate removal (logout).
    pub async fn destroy_session(&self, token: &str) -> Result<(), AppError> {
        self.store.remove(token).await
    }

    pub async fn purge_expired(&self) -> Result<u64, AppError> {
        self.store.purge_expired(Utc::now()).await
    }

    /// Periodically drops expired sessions from the backing store.
    pub fn spawn_sweeper(&self, every: Duration) -> tokio::task::JoinHandle<()> {
        let manager = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            loop {
                ticker.tick().await;
                match manager.purge_expired().await {
                    Ok(0) => {}
                    Ok(n) => tracing::debug!(purged = n, "expired sessions removed"),
                    Err(e) => tracing::warn!(error = %e, "session sweep failed"),
                }
            }
        })
    }

    // --- Cookie transport ---

    pub fn token_from_headers(&self, headers: &HeaderMap) -> Option<String> {
        headers
            .get_all(axum::http::header::COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .flat_map(|s| s.split(';'))
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(name, _)| *name == self.cookie_name)
            .map(|(_, value)| value.to_string())
            .filter(|v| !v.is_empty())
    }

    pub fn set_cookie_value(&self, token: &str) -> String {
        format!(
            "{}={}; Max-Age={}; Path=/; HttpOnly; SameSite=Lax{}",
            self.cookie_name,
            token,
            self.ttl.num_seconds(),
            if self.secure_cookie { "; Secure" } else { "" }
        )
    }

    pub fn clear_cookie_value(&self) -> String {
        format!(
            "{}=; Max-Age=0; Expires=Thu, 01 Jan 1970 00:00:00 GMT; Path=/; HttpOnly; SameSite=Lax{}",
            self.cookie_name,
            if self.secure_cookie { "; Secure" } else { "" }
        )
    }
}

/// Opaque token: two v4 UUIDs (244 random bits) in simple form.
fn new_token() -> String {
    format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple())
}
