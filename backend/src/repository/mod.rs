use crate::{
    error::AppError,
    lifecycle::ResourceKind,
    models::{
        BlogPost, BlogPostInput, BlogPostSummary, ContactMessage, DashboardStats, Event,
        EventInput, EventSummary, Job, JobInput, JobSummary, NewUser, Training, TrainingInput,
        TrainingSummary, UserRecord, UserSummary,
    },
};
use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;

mod memory;
mod postgres;

pub use memory::MemoryRepository;
pub use postgres::PostgresRepository;

/// Repository Trait
///
/// Abstract contract for every persistence operation of the console. Handlers
/// only see `Arc<dyn Repository>`, so Postgres and the in-memory store are
/// interchangeable.
///
/// Unlike a best-effort read layer, every method reports failure as
/// `AppError` so the lifecycle engine can decide where to send the client.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Accounts ---
    // `email` is expected to be normalized already.
    async fn find_user_by_email(&self, email: &str) -> Result<Option<UserRecord>, AppError>;
    // A duplicate email surfaces as `AppError::Conflict`.
    async fn create_user(&self, user: NewUser) -> Result<UserRecord, AppError>;
    async fn list_users(&self, search: Option<&str>) -> Result<Vec<UserSummary>, AppError>;

    // --- Dashboard ---
    async fn get_stats(&self) -> Result<DashboardStats, AppError>;

    // --- Events ---
    async fn list_events(&self, search: Option<&str>) -> Result<Vec<EventSummary>, AppError>;
    async fn get_event(&self, id: Uuid) -> Result<Option<Event>, AppError>;
    async fn create_event(&self, input: EventInput) -> Result<Event, AppError>;
    // Full overwrite; `None` when the row does not exist.
    async fn update_event(&self, id: Uuid, input: EventInput) -> Result<Option<Event>, AppError>;

    // --- Trainings ---
    async fn list_trainings(&self, search: Option<&str>)
    -> Result<Vec<TrainingSummary>, AppError>;
    async fn get_training(&self, id: Uuid) -> Result<Option<Training>, AppError>;
    async fn create_training(&self, input: TrainingInput) -> Result<Training, AppError>;
    async fn update_training(
        &self,
        id: Uuid,
        input: TrainingInput,
    ) -> Result<Option<Training>, AppError>;

    // --- Jobs ---
    async fn list_jobs(&self, search: Option<&str>) -> Result<Vec<JobSummary>, AppError>;
    async fn get_job(&self, id: Uuid) -> Result<Option<Job>, AppError>;
    async fn create_job(&self, input: JobInput) -> Result<Job, AppError>;
    async fn update_job(&self, id: Uuid, input: JobInput) -> Result<Option<Job>, AppError>;

    // --- Blog ---
    async fn list_blog_posts(&self, search: Option<&str>)
    -> Result<Vec<BlogPostSummary>, AppError>;
    async fn get_blog_post(&self, id: Uuid) -> Result<Option<BlogPost>, AppError>;
    async fn create_blog_post(
        &self,
        input: BlogPostInput,
        author_id: Uuid,
        image_path: Option<String>,
    ) -> Result<BlogPost, AppError>;
    /// `image_path` replaces the stored path; the caller passes the current
    /// one through when the image is left alone.
    async fn update_blog_post(
        &self,
        id: Uuid,
        input: BlogPostInput,
        image_path: Option<String>,
    ) -> Result<Option<BlogPost>, AppError>;

    // --- Contact messages ---
    async fn list_messages(&self, search: Option<&str>) -> Result<Vec<ContactMessage>, AppError>;

    /// delete_resource
    ///
    /// Removes every dependent row, then the parent, as one unit of work: either
    /// both happen or neither does. `Ok(None)` means the parent did not exist.
    async fn delete_resource(
        &self,
        kind: ResourceKind,
        id: Uuid,
    ) -> Result<Option<DeletedRow>, AppError>;
}

/// DeletedRow
///
/// What is left to clean up once a parent row is gone. Only blog posts carry
/// an image path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeletedRow {
    pub image_path: Option<String>,
}

/// RepositoryState
///
/// The concrete type used to share the persistence layer across the application state.
pub type RepositoryState = Arc<dyn Repository>;
