use back_office::{
    AppConfig,
    error::AppError,
    flash::FlashCategory,
    lifecycle::ResourceKind,
    models::{BlogPostInput, EventInput, JobInput, NewUser, Role, TrainingInput},
    repository::{DeletedRow, PostgresRepository, Repository},
    session::{PostgresSessionStore, SessionManager, SessionUser},
};
use chrono::{NaiveDate, NaiveDateTime, TimeDelta};
use sqlx::PgPool;
use std::sync::Arc;
use uuid::Uuid;

// --- Test Context and Setup ---

/// Database-backed tests run only when `DATABASE_URL` points at a scratch
/// Postgres; otherwise each test returns early.
struct DbTestContext {
    pool: PgPool,
}

impl DbTestContext {
    async fn setup() -> Option<Self> {
        dotenv::dotenv().ok();

        let Ok(db_url) = std::env::var("DATABASE_URL") else {
            eprintln!("DATABASE_URL not set, skipping database test");
            return None;
        };

        let pool = PgPool::connect(&db_url)
            .await
            .expect("Failed to connect to database for integration tests.");

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .expect("Failed to run database migrations.");

        Some(DbTestContext { pool })
    }

    fn repository(&self) -> PostgresRepository {
        PostgresRepository::new(self.pool.clone())
    }
}

// --- Test Data Helpers ---

/// Marker unique to one test, so runs against a shared database do not see
/// each other's rows in searches.
fn marker() -> String {
    format!("t{}", &Uuid::new_v4().simple().to_string()[..12])
}

async fn insert_user(repo: &PostgresRepository, email: &str, role: Role) -> Uuid {
    repo.create_user(NewUser {
        name: "Integration".to_string(),
        surname: "Tester".to_string(),
        email: email.to_string(),
        password_hash: "$argon2id$placeholder".to_string(),
        role,
        phone: None,
        address: None,
    })
    .await
    .unwrap()
    .id
}

fn event_input(title: &str) -> EventInput {
    event_on(title, date(2030, 4, 1).and_hms_opt(18, 30, 0).unwrap())
}

fn event_on(title: &str, event_date: NaiveDateTime) -> EventInput {
    EventInput {
        title: title.to_string(),
        description: "Integration event".to_string(),
        event_date,
        location: "Main Hall".to_string(),
        capacity: 50,
    }
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn training_on(title: &str, start_date: NaiveDate) -> TrainingInput {
    TrainingInput {
        title: title.to_string(),
        description: "Integration training".to_string(),
        start_date,
        end_date: start_date + TimeDelta::days(2),
        location: "Lab".to_string(),
        capacity: 10,
    }
}

fn job_due(title: &str, deadline: NaiveDate) -> JobInput {
    JobInput {
        title: title.to_string(),
        company: "Acme".to_string(),
        location: "Remote".to_string(),
        description: "d".to_string(),
        requirements: String::new(),
        deadline,
        is_active: true,
    }
}

fn post_titled(title: &str) -> BlogPostInput {
    BlogPostInput {
        title: title.to_string(),
        content: "c".to_string(),
        summary: None,
        is_published: true,
    }
}

async fn add_dependent(pool: &PgPool, kind: ResourceKind, parent: Uuid, user: Uuid) {
    let sql = match kind {
        ResourceKind::Event => {
            "INSERT INTO event_registrations (id, event_id, user_id) VALUES ($1, $2, $3)"
        }
        ResourceKind::Training => {
            "INSERT INTO training_participants (id, training_id, user_id) VALUES ($1, $2, $3)"
        }
        ResourceKind::Job => {
            "INSERT INTO job_applications (id, job_id, user_id) VALUES ($1, $2, $3)"
        }
        ResourceKind::BlogPost => {
            "INSERT INTO blog_comments (id, post_id, user_id, comment) VALUES ($1, $2, $3, 'nice')"
        }
        other => panic!("{other:?} has no dependents"),
    };
    sqlx::query(sql)
        .bind(Uuid::new_v4())
        .bind(parent)
        .bind(user)
        .execute(pool)
        .await
        .unwrap();
}

async fn count_dependents(pool: &PgPool, kind: ResourceKind, parent: Uuid) -> i64 {
    let (table, column) = kind.dependents().unwrap();
    sqlx::query_scalar::<_, i64>(&format!(
        "SELECT COUNT(*) FROM {table} WHERE {column} = $1"
    ))
    .bind(parent)
    .fetch_one(pool)
    .await
    .unwrap()
}

// --- Users ---

#[tokio::test]
async fn test_user_email_is_unique_case_insensitively() {
    let Some(ctx) = DbTestContext::setup().await else {
        return;
    };
    let repo = ctx.repository();
    let email = format!("{}@example.com", marker());

    insert_user(&repo, &email, Role::Member).await;
    let found = repo
        .find_user_by_email(&email.to_uppercase())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(found.email, email);

    let err = repo
        .create_user(NewUser {
            name: "Dup".to_string(),
            surname: "Licate".to_string(),
            email: email.to_uppercase(),
            password_hash: "x".to_string(),
            role: Role::Member,
            phone: None,
            address: None,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));
}

#[tokio::test]
async fn test_user_list_counts_participation() {
    let Some(ctx) = DbTestContext::setup().await else {
        return;
    };
    let repo = ctx.repository();
    let tag = marker();
    let user = insert_user(&repo, &format!("{tag}@example.com"), Role::Member).await;
    let event = repo.create_event(event_input(&tag)).await.unwrap();
    add_dependent(&ctx.pool, ResourceKind::Event, event.id, user).await;

    let rows = repo.list_users(Some(&tag)).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].event_count, 1);
    assert_eq!(rows[0].training_count, 0);
    assert_eq!(rows[0].job_count, 0);
}

// --- Lifecycle ---

#[tokio::test]
async fn test_event_crud_and_search() {
    let Some(ctx) = DbTestContext::setup().await else {
        return;
    };
    let repo = ctx.repository();
    let tag = marker();

    let created = repo
        .create_event(event_input(&format!("Meetup {tag}")))
        .await
        .unwrap();

    let rows = repo.list_events(Some(&tag.to_uppercase())).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].event.id, created.id);
    assert_eq!(rows[0].participant_count, 0);

    let updated = repo
        .update_event(created.id, event_input(&format!("Gala {tag}")))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(updated.title, format!("Gala {tag}"));
    assert!(updated.updated_at >= created.updated_at);

    assert!(
        repo.update_event(Uuid::new_v4(), event_input("ghost"))
            .await
            .unwrap()
            .is_none()
    );
    assert!(repo.get_event(Uuid::new_v4()).await.unwrap().is_none());
}

#[tokio::test]
async fn test_search_treats_wildcards_literally() {
    let Some(ctx) = DbTestContext::setup().await else {
        return;
    };
    let repo = ctx.repository();
    let tag = marker();
    repo.create_event(event_input(&format!("{tag} 100% fun")))
        .await
        .unwrap();
    repo.create_event(event_input(&format!("{tag} 100 fun")))
        .await
        .unwrap();

    let rows = repo.list_events(Some(&format!("{tag} 100%"))).await.unwrap();
    assert_eq!(rows.len(), 1);
    let rows = repo.list_events(Some(&format!("{tag}_"))).await.unwrap();
    assert!(rows.is_empty());
}

#[tokio::test]
async fn test_delete_cascades_in_one_transaction() {
    let Some(ctx) = DbTestContext::setup().await else {
        return;
    };
    let repo = ctx.repository();
    let tag = marker();
    let user = insert_user(&repo, &format!("{tag}@example.com"), Role::Member).await;

    let event = repo.create_event(event_input(&tag)).await.unwrap();
    let training = repo
        .create_training(TrainingInput {
            title: tag.clone(),
            description: "d".to_string(),
            start_date: NaiveDate::from_ymd_opt(2030, 5, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2030, 5, 2).unwrap(),
            location: "Lab".to_string(),
            capacity: 10,
        })
        .await
        .unwrap();
    let job = repo
        .create_job(JobInput {
            title: tag.clone(),
            company: "Acme".to_string(),
            location: "Remote".to_string(),
            description: "d".to_string(),
            requirements: String::new(),
            deadline: NaiveDate::from_ymd_opt(2030, 6, 30).unwrap(),
            is_active: true,
        })
        .await
        .unwrap();
    let post = repo
        .create_blog_post(
            BlogPostInput {
                title: tag.clone(),
                content: "c".to_string(),
                summary: None,
                is_published: true,
            },
            user,
            None,
        )
        .await
        .unwrap();

    for (kind, id) in [
        (ResourceKind::Event, event.id),
        (ResourceKind::Training, training.id),
        (ResourceKind::Job, job.id),
        (ResourceKind::BlogPost, post.id),
    ] {
        add_dependent(&ctx.pool, kind, id, user).await;
        add_dependent(&ctx.pool, kind, id, user).await;

        assert!(repo.delete_resource(kind, id).await.unwrap().is_some(), "{kind:?}");
        assert_eq!(count_dependents(&ctx.pool, kind, id).await, 0, "{kind:?}");
        assert!(repo.delete_resource(kind, id).await.unwrap().is_none(), "{kind:?}");
    }

    assert!(repo.get_event(event.id).await.unwrap().is_none());
    assert!(repo.get_blog_post(post.id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_blog_list_joins_author_and_counts_comments() {
    let Some(ctx) = DbTestContext::setup().await else {
        return;
    };
    let repo = ctx.repository();
    let tag = marker();
    let user = insert_user(&repo, &format!("{tag}@example.com"), Role::Admin).await;
    let post = repo
        .create_blog_post(
            BlogPostInput {
                title: tag.clone(),
                content: "c".to_string(),
                summary: Some("s".to_string()),
                is_published: false,
            },
            user,
            Some("/uploads/blogs/x.png".to_string()),
        )
        .await
        .unwrap();
    add_dependent(&ctx.pool, ResourceKind::BlogPost, post.id, user).await;

    let rows = repo.list_blog_posts(Some(&tag)).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].author_name.as_deref(), Some("Integration"));
    assert_eq!(rows[0].comment_count, 1);
    assert_eq!(rows[0].post.image_path.as_deref(), Some("/uploads/blogs/x.png"));
    assert!(!rows[0].post.is_published);
}

#[tokio::test]
async fn test_blog_delete_returns_image_path_of_removed_row() {
    let Some(ctx) = DbTestContext::setup().await else {
        return;
    };
    let repo = ctx.repository();
    let tag = marker();
    let user = insert_user(&repo, &format!("{tag}@example.com"), Role::Admin).await;
    let with_image = repo
        .create_blog_post(post_titled(&tag), user, Some("/uploads/blogs/cover.png".to_string()))
        .await
        .unwrap();
    let without_image = repo
        .create_blog_post(post_titled(&tag), user, None)
        .await
        .unwrap();

    let deleted = repo
        .delete_resource(ResourceKind::BlogPost, with_image.id)
        .await
        .unwrap();
    assert_eq!(
        deleted,
        Some(DeletedRow {
            image_path: Some("/uploads/blogs/cover.png".to_string())
        })
    );
    let deleted = repo
        .delete_resource(ResourceKind::BlogPost, without_image.id)
        .await
        .unwrap();
    assert_eq!(deleted, Some(DeletedRow::default()));
}

#[tokio::test]
async fn test_lists_are_newest_first() {
    let Some(ctx) = DbTestContext::setup().await else {
        return;
    };
    let repo = ctx.repository();
    let tag = marker();
    let user = insert_user(&repo, &format!("{tag}@example.com"), Role::Admin).await;

    // Inserted oldest-last, so insertion order alone would list them backwards.
    let early = date(2030, 1, 10).and_hms_opt(9, 0, 0).unwrap();
    let late = date(2030, 9, 10).and_hms_opt(9, 0, 0).unwrap();
    let late_event = repo.create_event(event_on(&tag, late)).await.unwrap();
    let early_event = repo.create_event(event_on(&tag, early)).await.unwrap();
    let ids: Vec<Uuid> = repo
        .list_events(Some(&tag))
        .await
        .unwrap()
        .iter()
        .map(|r| r.event.id)
        .collect();
    assert_eq!(ids, [late_event.id, early_event.id]);

    let late_training = repo
        .create_training(training_on(&tag, date(2030, 9, 1)))
        .await
        .unwrap();
    let early_training = repo
        .create_training(training_on(&tag, date(2030, 1, 1)))
        .await
        .unwrap();
    let ids: Vec<Uuid> = repo
        .list_trainings(Some(&tag))
        .await
        .unwrap()
        .iter()
        .map(|r| r.training.id)
        .collect();
    assert_eq!(ids, [late_training.id, early_training.id]);

    let late_job = repo.create_job(job_due(&tag, date(2030, 12, 31))).await.unwrap();
    let early_job = repo.create_job(job_due(&tag, date(2030, 2, 1))).await.unwrap();
    let ids: Vec<Uuid> = repo
        .list_jobs(Some(&tag))
        .await
        .unwrap()
        .iter()
        .map(|r| r.job.id)
        .collect();
    assert_eq!(ids, [late_job.id, early_job.id]);

    // Posts have no date of their own; creation time decides.
    let first_post = repo
        .create_blog_post(post_titled(&tag), user, None)
        .await
        .unwrap();
    let second_post = repo
        .create_blog_post(post_titled(&tag), user, None)
        .await
        .unwrap();
    let ids: Vec<Uuid> = repo
        .list_blog_posts(Some(&tag))
        .await
        .unwrap()
        .iter()
        .map(|r| r.post.id)
        .collect();
    assert_eq!(ids, [second_post.id, first_post.id]);
}

// --- Sessions ---

#[tokio::test]
async fn test_postgres_session_store_round_trip() {
    let Some(ctx) = DbTestContext::setup().await else {
        return;
    };
    let store = PostgresSessionStore::new(ctx.pool.clone());
    store.provision().await.unwrap();
    let sessions = SessionManager::new(Arc::new(store), &AppConfig::default());

    let user = SessionUser {
        id: Uuid::new_v4(),
        name: "Pg".to_string(),
        surname: "Admin".to_string(),
        email: "pg@example.com".to_string(),
        role: "admin".to_string(),
    };
    let token = sessions.create_session(user.clone()).await.unwrap();
    let record = sessions.resolve_session(&token).await.unwrap().unwrap();
    assert_eq!(record.user, Some(user));

    sessions
        .push_flash(&token, FlashCategory::Success, "one")
        .await
        .unwrap();
    sessions
        .push_flash(&token, FlashCategory::Success, "two")
        .await
        .unwrap();
    let drained = sessions.drain_flash(&token).await.unwrap();
    assert_eq!(drained.success, vec!["one", "two"]);
    assert!(sessions.drain_flash(&token).await.unwrap().is_empty());

    sessions.destroy_session(&token).await.unwrap();
    assert!(sessions.resolve_session(&token).await.unwrap().is_none());
}

#[tokio::test]
async fn test_postgres_session_expiry_and_purge() {
    let Some(ctx) = DbTestContext::setup().await else {
        return;
    };
    let store = PostgresSessionStore::new(ctx.pool.clone());
    store.provision().await.unwrap();
    let sessions = SessionManager::new(Arc::new(store), &AppConfig::default())
        .with_ttl(TimeDelta::seconds(-1));

    let token = sessions.create_anonymous().await.unwrap();
    assert!(sessions.resolve_session(&token).await.unwrap().is_none());
    assert!(sessions.purge_expired().await.unwrap() >= 1);
}
