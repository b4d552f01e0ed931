use async_trait::async_trait;
use chrono::Utc;
use std::{
    collections::HashMap,
    sync::atomic::{AtomicBool, Ordering},
};
use tokio::sync::RwLock;
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

/// A row in one of the dependent tables (registrations, participants,
/// applications, comments).
#[derive(Debug, Clone)]
struct Dependent {
    parent: Uuid,
    user_id: Option<Uuid>,
}

#[derive(Default)]
struct Tables {
    users: Vec<UserRecord>,
    events: Vec<Event>,
    trainings: Vec<Training>,
    jobs: Vec<Job>,
    blog_posts: Vec<BlogPost>,
    messages: Vec<ContactMessage>,
    dependents: HashMap<ResourceKind, Vec<Dependent>>,
}

impl Tables {
    fn dependents_of(&self, kind: ResourceKind, parent: Uuid) -> i64 {
        self.dependents
            .get(&kind)
            .map(|rows| rows.iter().filter(|d| d.parent == parent).count() as i64)
            .unwrap_or(0)
    }

    fn dependents_by_user(&self, kind: ResourceKind, user_id: Uuid) -> i64 {
        self.dependents
            .get(&kind)
            .map(|rows| {
                rows.iter()
                    .filter(|d| d.user_id == Some(user_id))
                    .count() as i64
            })
            .unwrap_or(0)
    }
}

/// MemoryRepository
///
/// Process-local `Repository` used by the test suites and for running the
/// console without a database. A single lock guards all tables, which makes
/// the cascade delete trivially atomic. `set_failing(true)` turns every call
/// into a store error to exercise failure paths.
#[derive(Default)]
pub struct MemoryRepository {
    tables: RwLock<Tables>,
    failing: AtomicBool,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn check(&self) -> Result<(), AppError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(AppError::Store("store unavailable".to_string()));
        }
        Ok(())
    }

    /// Seeds a dependent row (registration, participant, application or
    /// comment) pointing at `parent`.
    pub async fn add_dependent(&self, kind: ResourceKind, parent: Uuid, user_id: Option<Uuid>) {
        self.tables
            .write()
            .await
            .dependents
            .entry(kind)
            .or_default()
            .push(Dependent { parent, user_id });
    }

    pub async fn dependent_count(&self, kind: ResourceKind, parent: Uuid) -> usize {
        self.tables.read().await.dependents_of(kind, parent) as usize
    }

    /// Contact messages are written by the public site; tests seed them here.
    pub async fn add_message(&self, name: &str, email: &str, message: &str) -> ContactMessage {
        let row = ContactMessage {
            id: Uuid::new_v4(),
            name: name.to_string(),
            email: email.to_string(),
            message: message.to_string(),
            created_at: Utc::now(),
        };
        self.tables.write().await.messages.push(row.clone());
        row
    }

    /// Overwrites the stored role of a user, as a direct edit of the row would.
    pub async fn set_role(&self, user_id: Uuid, role: &str) {
        if let Some(user) = self
            .tables
            .write()
            .await
            .users
            .iter_mut()
            .find(|u| u.id == user_id)
        {
            user.role = role.to_string();
        }
    }
}

fn remove_row<T>(rows: &mut Vec<T>, is_target: impl Fn(&T) -> bool) -> Option<T> {
    let index = rows.iter().position(is_target)?;
    Some(rows.remove(index))
}

fn matches(search: Option<&str>, fields: &[&str]) -> bool {
    match search {
        None => true,
        Some(term) => {
            let term = term.to_lowercase();
            fields.iter().any(|f| f.to_lowercase().contains(&term))
        }
    }
}

#[async_trait]
impl Repository for MemoryRepository {
    async fn find_user_by_email(&self, email: &str) -> Result<Option<UserRecord>, AppError> {
        self.check()?;
        let email = email.to_lowercase();
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .iter()
            .find(|u| u.email.to_lowercase() == email)
            .cloned())
    }

    async fn create_user(&self, user: NewUser) -> Result<UserRecord, AppError> {
        self.check()?;
        let mut tables = self.tables.write().await;
        let email = user.email.to_lowercase();
        if tables.users.iter().any(|u| u.email.to_lowercase() == email) {
            return Err(AppError::Conflict(
                "This email address is already in use".to_string(),
            ));
        }
        let now = Utc::now();
        let record = UserRecord {
            id: Uuid::new_v4(),
            name: user.name,
            surname: user.surname,
            email: user.email,
            password_hash: user.password_hash,
            role: user.role.as_str().to_string(),
            phone: user.phone,
            address: user.address,
            created_at: now,
            updated_at: now,
        };
        tables.users.push(record.clone());
        Ok(record)
    }

    async fn list_users(&self, search: Option<&str>) -> Result<Vec<UserSummary>, AppError> {
        self.check()?;
        let tables = self.tables.read().await;
        let mut rows: Vec<UserSummary> = tables
            .users
            .iter()
            .filter(|u| matches(search, &[u.name.as_str(), u.surname.as_str(), u.email.as_str()]))
            .map(|u| UserSummary {
                id: u.id,
                name: u.name.clone(),
                surname: u.surname.clone(),
                email: u.email.clone(),
                role: u.role.clone(),
                phone: u.phone.clone(),
                address: u.address.clone(),
                created_at: u.created_at,
                event_count: tables.dependents_by_user(ResourceKind::Event, u.id),
                training_count: tables.dependents_by_user(ResourceKind::Training, u.id),
                job_count: tables.dependents_by_user(ResourceKind::Job, u.id),
            })
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(rows)
    }

    async fn get_stats(&self) -> Result<DashboardStats, AppError> {
        self.check()?;
        let tables = self.tables.read().await;
        Ok(DashboardStats {
            total_users: tables.users.len() as i64,
            total_events: tables.events.len() as i64,
            total_trainings: tables.trainings.len() as i64,
            total_jobs: tables.jobs.len() as i64,
            total_blog_posts: tables.blog_posts.len() as i64,
            total_messages: tables.messages.len() as i64,
        })
    }

    // --- Events ---

    async fn list_events(&self, search: Option<&str>) -> Result<Vec<EventSummary>, AppError> {
        self.check()?;
        let tables = self.tables.read().await;
        let mut rows: Vec<EventSummary> = tables
            .events
            .iter()
            .filter(|e| {
                matches(
                    search,
                    &[
                        e.title.as_str(),
                        e.description.as_str(),
                        e.location.as_str(),
                    ],
                )
            })
            .map(|e| EventSummary {
                participant_count: tables.dependents_of(ResourceKind::Event, e.id),
                event: e.clone(),
            })
            .collect();
        rows.sort_by(|a, b| b.event.event_date.cmp(&a.event.event_date));
        Ok(rows)
    }

    async fn get_event(&self, id: Uuid) -> Result<Option<Event>, AppError> {
        self.check()?;
        let tables = self.tables.read().await;
        Ok(tables.events.iter().find(|e| e.id == id).cloned())
    }

    async fn create_event(&self, input: EventInput) -> Result<Event, AppError> {
        self.check()?;
        let now = Utc::now();
        let event = Event {
            id: Uuid::new_v4(),
            title: input.title,
            description: input.description,
            event_date: input.event_date,
            location: input.location,
            capacity: input.capacity,
            created_at: now,
            updated_at: now,
        };
        self.tables.write().await.events.push(event.clone());
        Ok(event)
    }

    async fn update_event(&self, id: Uuid, input: EventInput) -> Result<Option<Event>, AppError> {
        self.check()?;
        let mut tables = self.tables.write().await;
        Ok(tables.events.iter_mut().find(|e| e.id == id).map(|e| {
            e.title = input.title;
            e.description = input.description;
            e.event_date = input.event_date;
            e.location = input.location;
            e.capacity = input.capacity;
            e.updated_at = Utc::now();
            e.clone()
        }))
    }

    // --- Trainings ---

    async fn list_trainings(
        &self,
        search: Option<&str>,
    ) -> Result<Vec<TrainingSummary>, AppError> {
        self.check()?;
        let tables = self.tables.read().await;
        let mut rows: Vec<TrainingSummary> = tables
            .trainings
            .iter()
            .filter(|t| {
                matches(
                    search,
                    &[
                        t.title.as_str(),
                        t.description.as_str(),
                        t.location.as_str(),
                    ],
                )
            })
            .map(|t| TrainingSummary {
                participant_count: tables.dependents_of(ResourceKind::Training, t.id),
                training: t.clone(),
            })
            .collect();
        rows.sort_by(|a, b| b.training.start_date.cmp(&a.training.start_date));
        Ok(rows)
    }

    async fn get_training(&self, id: Uuid) -> Result<Option<Training>, AppError> {
        self.check()?;
        let tables = self.tables.read().await;
        Ok(tables.trainings.iter().find(|t| t.id == id).cloned())
    }

    async fn create_training(&self, input: TrainingInput) -> Result<Training, AppError> {
        self.check()?;
        let now = Utc::now();
        let training = Training {
            id: Uuid::new_v4(),
            title: input.title,
            description: input.description,
            start_date: input.start_date,
            end_date: input.end_date,
            location: input.location,
            capacity: input.capacity,
            created_at: now,
            updated_at: now,
        };
        self.tables.write().await.trainings.push(training.clone());
        Ok(training)
    }

    async fn update_training(
        &self,
        id: Uuid,
        input: TrainingInput,
    ) -> Result<Option<Training>, AppError> {
        self.check()?;
        let mut tables = self.tables.write().await;
        Ok(tables.trainings.iter_mut().find(|t| t.id == id).map(|t| {
            t.title = input.title;
            t.description = input.description;
            t.start_date = input.start_date;
            t.end_date = input.end_date;
            t.location = input.location;
            t.capacity = input.capacity;
            t.updated_at = Utc::now();
            t.clone()
        }))
    }

    // --- Jobs ---

    async fn list_jobs(&self, search: Option<&str>) -> Result<Vec<JobSummary>, AppError> {
        self.check()?;
        let tables = self.tables.read().await;
        let mut rows: Vec<JobSummary> = tables
            .jobs
            .iter()
            .filter(|j| {
                matches(
                    search,
                    &[
                        j.title.as_str(),
                        j.company.as_str(),
                        j.description.as_str(),
                        j.location.as_str(),
                    ],
                )
            })
            .map(|j| JobSummary {
                application_count: tables.dependents_of(ResourceKind::Job, j.id),
                job: j.clone(),
            })
            .collect();
        rows.sort_by(|a, b| b.job.deadline.cmp(&a.job.deadline));
        Ok(rows)
    }

    async fn get_job(&self, id: Uuid) -> Result<Option<Job>, AppError> {
        self.check()?;
        let tables = self.tables.read().await;
        Ok(tables.jobs.iter().find(|j| j.id == id).cloned())
    }

    async fn create_job(&self, input: JobInput) -> Result<Job, AppError> {
        self.check()?;
        let now = Utc::now();
        let job = Job {
            id: Uuid::new_v4(),
            title: input.title,
            company: input.company,
            location: input.location,
            description: input.description,
            requirements: input.requirements,
            deadline: input.deadline,
            is_active: input.is_active,
            created_at: now,
            updated_at: now,
        };
        self.tables.write().await.jobs.push(job.clone());
        Ok(job)
    }

    async fn update_job(&self, id: Uuid, input: JobInput) -> Result<Option<Job>, AppError> {
        self.check()?;
        let mut tables = self.tables.write().await;
        Ok(tables.jobs.iter_mut().find(|j| j.id == id).map(|j| {
            j.title = input.title;
            j.company = input.company;
            j.location = input.location;
            j.description = input.description;
            j.requirements = input.requirements;
            j.deadline = input.deadline;
            j.is_active = input.is_active;
            j.updated_at = Utc::now();
            j.clone()
        }))
    }

    // --- Blog ---

    async fn list_blog_posts(
        &self,
        search: Option<&str>,
    ) -> Result<Vec<BlogPostSummary>, AppError> {
        self.check()?;
        let tables = self.tables.read().await;
        let mut rows: Vec<BlogPostSummary> = tables
            .blog_posts
            .iter()
            .filter(|p| {
                matches(
                    search,
                    &[
                        p.title.as_str(),
                        p.content.as_str(),
                        p.summary.as_deref().unwrap_or(""),
                    ],
                )
            })
            .map(|p| {
                let author = p
                    .author_id
                    .and_then(|id| tables.users.iter().find(|u| u.id == id));
                BlogPostSummary {
                    author_name: author.map(|u| u.name.clone()),
                    author_surname: author.map(|u| u.surname.clone()),
                    comment_count: tables.dependents_of(ResourceKind::BlogPost, p.id),
                    post: p.clone(),
                }
            })
            .collect();
        rows.sort_by(|a, b| b.post.created_at.cmp(&a.post.created_at));
        Ok(rows)
    }

    async fn get_blog_post(&self, id: Uuid) -> Result<Option<BlogPost>, AppError> {
        self.check()?;
        let tables = self.tables.read().await;
        Ok(tables.blog_posts.iter().find(|p| p.id == id).cloned())
    }

    async fn create_blog_post(
        &self,
        input: BlogPostInput,
        author_id: Uuid,
        image_path: Option<String>,
    ) -> Result<BlogPost, AppError> {
        self.check()?;
        let now = Utc::now();
        let post = BlogPost {
            id: Uuid::new_v4(),
            title: input.title,
            content: input.content,
            summary: input.summary,
            image_path,
            author_id: Some(author_id),
            is_published: input.is_published,
            created_at: now,
            updated_at: now,
        };
        self.tables.write().await.blog_posts.push(post.clone());
        Ok(post)
    }

    async fn update_blog_post(
        &self,
        id: Uuid,
        input: BlogPostInput,
        image_path: Option<String>,
    ) -> Result<Option<BlogPost>, AppError> {
        self.check()?;
        let mut tables = self.tables.write().await;
        Ok(tables.blog_posts.iter_mut().find(|p| p.id == id).map(|p| {
            p.title = input.title;
            p.content = input.content;
            p.summary = input.summary;
            p.image_path = image_path;
            p.is_published = input.is_published;
            p.updated_at = Utc::now();
            p.clone()
        }))
    }

    // --- Messages ---

    async fn list_messages(&self, search: Option<&str>) -> Result<Vec<ContactMessage>, AppError> {
        self.check()?;
        let tables = self.tables.read().await;
        let mut rows: Vec<ContactMessage> = tables
            .messages
            .iter()
            .filter(|m| matches(search, &[m.name.as_str(), m.email.as_str(), m.message.as_str()]))
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(rows)
    }

    async fn delete_resource(
        &self,
        kind: ResourceKind,
        id: Uuid,
    ) -> Result<Option<DeletedRow>, AppError> {
        self.check()?;
        if kind.dependents().is_none() {
            return Err(AppError::Validation(format!(
                "{} records cannot be deleted",
                kind.label()
            )));
        }

        let mut tables = self.tables.write().await;
        if let Some(rows) = tables.dependents.get_mut(&kind) {
            rows.retain(|d| d.parent != id);
        }

        let deleted = match kind {
            ResourceKind::Event => remove_row(&mut tables.events, |e| e.id == id)
                .map(|_| DeletedRow::default()),
            ResourceKind::Training => remove_row(&mut tables.trainings, |t| t.id == id)
                .map(|_| DeletedRow::default()),
            ResourceKind::Job => {
                remove_row(&mut tables.jobs, |j| j.id == id).map(|_| DeletedRow::default())
            }
            ResourceKind::BlogPost => {
                remove_row(&mut tables.blog_posts, |p| p.id == id).map(|p| DeletedRow {
                    image_path: p.image_path,
                })
            }
            ResourceKind::User | ResourceKind::ContactMessage => None,
        };
        Ok(deleted)
    }
}
