use async_trait::async_trait;
use sqlx::{PgPool, Postgres, postgres::PgRow, query_builder::QueryBuilder};
use uuid::Uuid;

use super::{DeletedRow, Repository};
use crate::{
    error::AppError,
    lifecycle::ResourceKind,
    models::{
        BlogPost, BlogPostInput, BlogPostSummary, ContactMessage, DashboardStats, Event,
        EventInput, EventSummary, Job, JobInput, JobSummary, NewUser, Training, TrainingInput,
        TrainingSummary, UserRecord, UserSummary,
    },
};

const USER_COLUMNS: &str =
    "id, name, surname, email, password, role, phone, address, created_at, updated_at";
const EVENT_COLUMNS: &str =
    "id, title, description, event_date, location, capacity, created_at, updated_at";
const TRAINING_COLUMNS: &str =
    "id, title, description, start_date, end_date, location, capacity, created_at, updated_at";
const JOB_COLUMNS: &str = "id, title, company, location, description, requirements, deadline, is_active, created_at, updated_at";
const BLOG_COLUMNS: &str =
    "id, title, content, summary, image_path, author_id, is_published, created_at, updated_at";

/// PostgresRepository
///
/// The `Repository` backed by PostgreSQL. All statements are built at runtime
/// with bound parameters; nothing user-supplied is ever spliced into SQL.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Shared list query: `base` selects the rows, `columns` are matched with
    /// ILIKE when a search term is present.
    async fn fetch_list<T>(
        &self,
        base: &str,
        columns: &[&str],
        search: Option<&str>,
        order_by: &str,
    ) -> Result<Vec<T>, AppError>
    where
        T: for<'r> sqlx::FromRow<'r, PgRow> + Send + Unpin,
    {
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(base);

        if let Some(term) = search {
            let pattern = like_pattern(term);
            builder.push(" WHERE (");
            for (i, column) in columns.iter().enumerate() {
                if i > 0 {
                    builder.push(" OR ");
                }
                builder.push(*column);
                builder.push(" ILIKE ");
                builder.push_bind(pattern.clone());
            }
            builder.push(")");
        }

        builder.push(" ORDER BY ");
        builder.push(order_by);

        Ok(builder.build_query_as::<T>().fetch_all(&self.pool).await?)
    }
}

/// Wraps the term in `%` after escaping LIKE metacharacters, so a search for
/// `50%` matches the literal text.
fn like_pattern(term: &str) -> String {
    let escaped = term
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

#[async_trait]
impl Repository for PostgresRepository {
    // --- ACCOUNTS ---

    async fn find_user_by_email(&self, email: &str) -> Result<Option<UserRecord>, AppError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE LOWER(email) = LOWER($1)");
        Ok(sqlx::query_as::<_, UserRecord>(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?)
    }

    /// create_user
    ///
    /// The unique index on `LOWER(email)` is the final arbiter when two
    /// registrations race past the pre-check; the violation maps to Conflict.
    async fn create_user(&self, user: NewUser) -> Result<UserRecord, AppError> {
        let sql = format!(
            r#"
            INSERT INTO users (id, name, surname, email, password, role, phone, address, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, NOW(), NOW())
            RETURNING {USER_COLUMNS}
            "#
        );
        Ok(sqlx::query_as::<_, UserRecord>(&sql)
            .bind(Uuid::new_v4())
            .bind(user.name)
            .bind(user.surname)
            .bind(user.email)
            .bind(user.password_hash)
            .bind(user.role.as_str())
            .bind(user.phone)
            .bind(user.address)
            .fetch_one(&self.pool)
            .await?)
    }

    async fn list_users(&self, search: Option<&str>) -> Result<Vec<UserSummary>, AppError> {
        self.fetch_list(
            r#"
            SELECT u.id, u.name, u.surname, u.email, u.role, u.phone, u.address, u.created_at,
                (SELECT COUNT(*) FROM event_registrations r WHERE r.user_id = u.id) AS event_count,
                (SELECT COUNT(*) FROM training_participants p WHERE p.user_id = u.id) AS training_count,
                (SELECT COUNT(*) FROM job_applications a WHERE a.user_id = u.id) AS job_count
            FROM users u
            "#,
            &["u.name", "u.surname", "u.email"],
            search,
            "u.created_at DESC",
        )
        .await
    }

    // --- DASHBOARD ---

    /// get_stats
    ///
    /// All counters in a single round trip.
    async fn get_stats(&self) -> Result<DashboardStats, AppError> {
        Ok(sqlx::query_as::<_, DashboardStats>(
            r#"
            SELECT
                (SELECT COUNT(*) FROM users) AS total_users,
                (SELECT COUNT(*) FROM events) AS total_events,
                (SELECT COUNT(*) FROM trainings) AS total_trainings,
                (SELECT COUNT(*) FROM jobs) AS total_jobs,
                (SELECT COUNT(*) FROM blog_posts) AS total_blog_posts,
                (SELECT COUNT(*) FROM contact_messages) AS total_messages
            "#,
        )
        .fetch_one(&self.pool)
        .await?)
    }

    // --- EVENTS ---

    async fn list_events(&self, search: Option<&str>) -> Result<Vec<EventSummary>, AppError> {
        self.fetch_list(
            r#"
            SELECT e.id, e.title, e.description, e.event_date, e.location, e.capacity,
                e.created_at, e.updated_at,
                (SELECT COUNT(*) FROM event_registrations r WHERE r.event_id = e.id) AS participant_count
            FROM events e
            "#,
            &["e.title", "e.description", "e.location"],
            search,
            "e.event_date DESC",
        )
        .await
    }

    async fn get_event(&self, id: Uuid) -> Result<Option<Event>, AppError> {
        let sql = format!("SELECT {EVENT_COLUMNS} FROM events WHERE id = $1");
        Ok(sqlx::query_as::<_, Event>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn create_event(&self, input: EventInput) -> Result<Event, AppError> {
        let sql = format!(
            r#"
            INSERT INTO events (id, title, description, event_date, location, capacity, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, NOW(), NOW())
            RETURNING {EVENT_COLUMNS}
            "#
        );
        Ok(sqlx::query_as::<_, Event>(&sql)
            .bind(Uuid::new_v4())
            .bind(input.title)
            .bind(input.description)
            .bind(input.event_date)
            .bind(input.location)
            .bind(input.capacity)
            .fetch_one(&self.pool)
            .await?)
    }

    async fn update_event(&self, id: Uuid, input: EventInput) -> Result<Option<Event>, AppError> {
        let sql = format!(
            r#"
            UPDATE events
            SET title = $2, description = $3, event_date = $4, location = $5, capacity = $6,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {EVENT_COLUMNS}
            "#
        );
        Ok(sqlx::query_as::<_, Event>(&sql)
            .bind(id)
            .bind(input.title)
            .bind(input.description)
            .bind(input.event_date)
            .bind(input.location)
            .bind(input.capacity)
            .fetch_optional(&self.pool)
            .await?)
    }

    // --- TRAININGS ---

    async fn list_trainings(
        &self,
        search: Option<&str>,
    ) -> Result<Vec<TrainingSummary>, AppError> {
        self.fetch_list(
            r#"
            SELECT t.id, t.title, t.description, t.start_date, t.end_date, t.location, t.capacity,
                t.created_at, t.updated_at,
                (SELECT COUNT(*) FROM training_participants p WHERE p.training_id = t.id) AS participant_count
            FROM trainings t
            "#,
            &["t.title", "t.description", "t.location"],
            search,
            "t.start_date DESC",
        )
        .await
    }

    async fn get_training(&self, id: Uuid) -> Result<Option<Training>, AppError> {
        let sql = format!("SELECT {TRAINING_COLUMNS} FROM trainings WHERE id = $1");
        Ok(sqlx::query_as::<_, Training>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn create_training(&self, input: TrainingInput) -> Result<Training, AppError> {
        let sql = format!(
            r#"
            INSERT INTO trainings (id, title, description, start_date, end_date, location, capacity, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, NOW(), NOW())
            RETURNING {TRAINING_COLUMNS}
            "#
        );
        Ok(sqlx::query_as::<_, Training>(&sql)
            .bind(Uuid::new_v4())
            .bind(input.title)
            .bind(input.description)
            .bind(input.start_date)
            .bind(input.end_date)
            .bind(input.location)
            .bind(input.capacity)
            .fetch_one(&self.pool)
            .await?)
    }

    async fn update_training(
        &self,
        id: Uuid,
        input: TrainingInput,
    ) -> Result<Option<Training>, AppError> {
        let sql = format!(
            r#"
            UPDATE trainings
            SET title = $2, description = $3, start_date = $4, end_date = $5, location = $6,
                capacity = $7, updated_at = NOW()
            WHERE id = $1
            RETURNING {TRAINING_COLUMNS}
            "#
        );
        Ok(sqlx::query_as::<_, Training>(&sql)
            .bind(id)
            .bind(input.title)
            .bind(input.description)
            .bind(input.start_date)
            .bind(input.end_date)
            .bind(input.location)
            .bind(input.capacity)
            .fetch_optional(&self.pool)
            .await?)
    }

    // --- JOBS ---

    async fn list_jobs(&self, search: Option<&str>) -> Result<Vec<JobSummary>, AppError> {
        self.fetch_list(
            r#"
            SELECT j.id, j.title, j.company, j.location, j.description, j.requirements, j.deadline,
                j.is_active, j.created_at, j.updated_at,
                (SELECT COUNT(*) FROM job_applications a WHERE a.job_id = j.id) AS application_count
            FROM jobs j
            "#,
            &["j.title", "j.company", "j.description", "j.location"],
            search,
            "j.deadline DESC",
        )
        .await
    }

    async fn get_job(&self, id: Uuid) -> Result<Option<Job>, AppError> {
        let sql = format!("SELECT {JOB_COLUMNS} FROM jobs WHERE id = $1");
        Ok(sqlx::query_as::<_, Job>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn create_job(&self, input: JobInput) -> Result<Job, AppError> {
        let sql = format!(
            r#"
            INSERT INTO jobs (id, title, company, location, description, requirements, deadline, is_active, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, NOW(), NOW())
            RETURNING {JOB_COLUMNS}
            "#
        );
        Ok(sqlx::query_as::<_, Job>(&sql)
            .bind(Uuid::new_v4())
            .bind(input.title)
            .bind(input.company)
            .bind(input.location)
            .bind(input.description)
            .bind(input.requirements)
            .bind(input.deadline)
            .bind(input.is_active)
            .fetch_one(&self.pool)
            .await?)
    }

    async fn update_job(&self, id: Uuid, input: JobInput) -> Result<Option<Job>, AppError> {
        let sql = format!(
            r#"
            UPDATE jobs
            SET title = $2, company = $3, location = $4, description = $5, requirements = $6,
                deadline = $7, is_active = $8, updated_at = NOW()
            WHERE id = $1
            RETURNING {JOB_COLUMNS}
            "#
        );
        Ok(sqlx::query_as::<_, Job>(&sql)
            .bind(id)
            .bind(input.title)
            .bind(input.company)
            .bind(input.location)
            .bind(input.description)
            .bind(input.requirements)
            .bind(input.deadline)
            .bind(input.is_active)
            .fetch_optional(&self.pool)
            .await?)
    }

    // --- BLOG ---

    /// list_blog_posts
    ///
    /// The author join is a LEFT JOIN: posts whose author was removed still list.
    async fn list_blog_posts(
        &self,
        search: Option<&str>,
    ) -> Result<Vec<BlogPostSummary>, AppError> {
        self.fetch_list(
            r#"
            SELECT bp.id, bp.title, bp.content, bp.summary, bp.image_path, bp.author_id,
                bp.is_published, bp.created_at, bp.updated_at,
                u.name AS author_name, u.surname AS author_surname,
                (SELECT COUNT(*) FROM blog_comments c WHERE c.post_id = bp.id) AS comment_count
            FROM blog_posts bp
            LEFT JOIN users u ON u.id = bp.author_id
            "#,
            &["bp.title", "bp.content", "bp.summary"],
            search,
            "bp.created_at DESC",
        )
        .await
    }

    async fn get_blog_post(&self, id: Uuid) -> Result<Option<BlogPost>, AppError> {
        let sql = format!("SELECT {BLOG_COLUMNS} FROM blog_posts WHERE id = $1");
        Ok(sqlx::query_as::<_, BlogPost>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn create_blog_post(
        &self,
        input: BlogPostInput,
        author_id: Uuid,
        image_path: Option<String>,
    ) -> Result<BlogPost, AppError> {
        let sql = format!(
            r#"
            INSERT INTO blog_posts (id, title, content, summary, image_path, author_id, is_published, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, NOW(), NOW())
            RETURNING {BLOG_COLUMNS}
            "#
        );
        Ok(sqlx::query_as::<_, BlogPost>(&sql)
            .bind(Uuid::new_v4())
            .bind(input.title)
            .bind(input.content)
            .bind(input.summary)
            .bind(image_path)
            .bind(author_id)
            .bind(input.is_published)
            .fetch_one(&self.pool)
            .await?)
    }

    async fn update_blog_post(
        &self,
        id: Uuid,
        input: BlogPostInput,
        image_path: Option<String>,
    ) -> Result<Option<BlogPost>, AppError> {
        let sql = format!(
            r#"
            UPDATE blog_posts
            SET title = $2, content = $3, summary = $4, image_path = $5, is_published = $6,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {BLOG_COLUMNS}
            "#
        );
        Ok(sqlx::query_as::<_, BlogPost>(&sql)
            .bind(id)
            .bind(input.title)
            .bind(input.content)
            .bind(input.summary)
            .bind(image_path)
            .bind(input.is_published)
            .fetch_optional(&self.pool)
            .await?)
    }

    // --- MESSAGES ---

    async fn list_messages(&self, search: Option<&str>) -> Result<Vec<ContactMessage>, AppError> {
        self.fetch_list(
            "SELECT id, name, email, message, created_at FROM contact_messages",
            &["name", "email", "message"],
            search,
            "created_at DESC",
        )
        .await
    }

    // --- CASCADE ---

    /// delete_resource
    ///
    /// The schema has no ON DELETE CASCADE on dependent tables, so dependents
    /// are removed explicitly inside the same transaction as the parent.
    /// Table names come from `ResourceKind`, never from input.
    async fn delete_resource(
        &self,
        kind: ResourceKind,
        id: Uuid,
    ) -> Result<Option<DeletedRow>, AppError> {
        let Some((dependent_table, foreign_key)) = kind.dependents() else {
            return Err(AppError::Validation(format!(
                "{} records cannot be deleted",
                kind.label()
            )));
        };

        let mut tx = self.pool.begin().await?;

        let dependents_sql = format!("DELETE FROM {dependent_table} WHERE {foreign_key} = $1");
        let removed = sqlx::query(&dependents_sql)
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        // The image path comes back from the same statement that removes the row.
        let image_column = match kind {
            ResourceKind::BlogPost => "image_path",
            _ => "NULL::text",
        };
        let parent_sql = format!(
            "DELETE FROM {} WHERE id = $1 RETURNING {image_column}",
            kind.table()
        );
        let deleted: Option<Option<String>> = sqlx::query_scalar(&parent_sql)
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;

        // Dropping `tx` on an early `?` rolls everything back.
        tx.commit().await?;

        tracing::debug!(
            kind = kind.slug(),
            %id,
            removed,
            deleted = deleted.is_some(),
            "cascade delete committed"
        );
        Ok(deleted.map(|image_path| DeletedRow { image_path }))
    }
}
