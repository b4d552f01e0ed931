use axum::{
    extract::{Multipart, Path, Query, State, multipart::MultipartRejection},
    response::Response,
};
use uuid::Uuid;

use crate::{
    AppState,
    auth::{AdminUser, Session},
    error::AppError,
    lifecycle::{self, ResourceKind},
    models::{BlogForm, BlogPost, BlogPostSummary, SearchQuery},
    repository::DeletedRow,
    storage::{self, ALLOWED_IMAGE_TYPES, StorageState},
};

const KIND: ResourceKind = ResourceKind::BlogPost;

/// Cover image part of a blog form.
struct ImageUpload {
    file_name: String,
    content_type: String,
    bytes: Vec<u8>,
}

/// A decoded multipart blog form.
struct BlogSubmission {
    form: BlogForm,
    image: Option<ImageUpload>,
    // Edit form checkbox: drop the current image without replacing it.
    remove_image: bool,
}

fn malformed(e: impl std::fmt::Display) -> AppError {
    tracing::info!(error = %e, "unreadable blog form");
    AppError::Validation("The form could not be read. Please try again.".to_string())
}

async fn read_submission(
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<BlogSubmission, AppError> {
    let mut multipart = multipart.map_err(malformed)?;
    let mut submission = BlogSubmission {
        form: BlogForm::default(),
        image: None,
        remove_image: false,
    };

    while let Some(field) = multipart.next_field().await.map_err(malformed)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "image" => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let bytes = field.bytes().await.map_err(malformed)?;

                // An untouched file input still sends an empty part.
                if file_name.is_empty() || bytes.is_empty() {
                    continue;
                }
                if !ALLOWED_IMAGE_TYPES.contains(&content_type.as_str()) {
                    return Err(AppError::Validation(
                        "Only JPEG, PNG, GIF or WebP images can be uploaded".to_string(),
                    ));
                }
                submission.image = Some(ImageUpload {
                    file_name,
                    content_type,
                    bytes: bytes.to_vec(),
                });
            }
            "title" => submission.form.title = field.text().await.map_err(malformed)?,
            "content" => submission.form.content = field.text().await.map_err(malformed)?,
            "summary" => submission.form.summary = field.text().await.map_err(malformed)?,
            "is_published" => {
                submission.form.is_published = Some(field.text().await.map_err(malformed)?)
            }
            "remove_image" => {
                let value = field.text().await.map_err(malformed)?;
                submission.remove_image = !value.trim().is_empty() && value.trim() != "false";
            }
            _ => {}
        }
    }

    Ok(submission)
}

async fn store_image(storage: &StorageState, image: ImageUpload) -> Result<String, AppError> {
    let key = storage::object_key(&image.file_name);
    let size = image.bytes.len();
    match storage
        .put_object(&key, image.bytes, &image.content_type)
        .await
    {
        Ok(path) => {
            tracing::debug!(%path, size, "blog image stored");
            Ok(path)
        }
        Err(e) => {
            tracing::error!(%key, size, error = %e, "blog image upload failed");
            Err(AppError::Upload(e))
        }
    }
}

// Compensation and cleanup share this; a leftover file is only worth a warning.
async fn discard_image(storage: &StorageState, path: &str) {
    if let Err(e) = storage.delete_object(path).await {
        tracing::warn!(%path, error = %e, "could not remove blog image");
    }
}

#[utoipa::path(
    get,
    path = "/admin/blogs",
    params(SearchQuery),
    responses(
        (status = 200, description = "Blog post list page", body = [BlogPostSummary]),
        (status = 303, description = "Query failed, redirect to the dashboard")
    )
)]
pub async fn list_blog_posts(
    State(state): State<AppState>,
    AdminUser(user): AdminUser,
    session: Session,
    Query(query): Query<SearchQuery>,
) -> Response {
    let search = query.term();
    let result = state.repo.list_blog_posts(search.as_deref()).await;
    lifecycle::render_list(&session, user, KIND, search, result).await
}

#[utoipa::path(
    get,
    path = "/admin/blogs/new",
    responses((status = 200, description = "Empty blog post form"))
)]
pub async fn new_blog_post_form(AdminUser(user): AdminUser, session: Session) -> Response {
    lifecycle::render_new_form(&session, user, KIND).await
}

/// create_blog_post
///
/// The image is uploaded before the row is inserted. An upload failure stops
/// the create; an insert failure deletes the image that was just stored.
#[utoipa::path(
    post,
    path = "/admin/blogs",
    request_body(content = BlogForm, content_type = "multipart/form-data"),
    responses(
        (status = 303, description = "Redirect to the list on success, to the new form on failure")
    )
)]
pub async fn create_blog_post(
    State(state): State<AppState>,
    AdminUser(user): AdminUser,
    session: Session,
    multipart: Result<Multipart, MultipartRejection>,
) -> Response {
    let result = create_with_image(&state, user.id, multipart).await;
    lifecycle::finish_create(&session, KIND, result).await
}

async fn create_with_image(
    state: &AppState,
    author_id: Uuid,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<BlogPost, AppError> {
    let submission = read_submission(multipart).await?;
    let input = submission.form.validate(true)?;

    let image_path = match submission.image {
        Some(image) => Some(store_image(&state.storage, image).await?),
        None => None,
    };

    match state
        .repo
        .create_blog_post(input, author_id, image_path.clone())
        .await
    {
        Ok(post) => Ok(post),
        Err(e) => {
            if let Some(path) = image_path {
                discard_image(&state.storage, &path).await;
            }
            Err(e)
        }
    }
}

#[utoipa::path(
    get,
    path = "/admin/blogs/{id}/edit",
    params(("id" = Uuid, Path, description = "Blog post id")),
    responses(
        (status = 200, description = "Pre-filled blog post form", body = BlogPost),
        (status = 303, description = "Post not found, redirect to the list")
    )
)]
pub async fn edit_blog_post_form(
    State(state): State<AppState>,
    AdminUser(user): AdminUser,
    session: Session,
    Path(id): Path<Uuid>,
) -> Response {
    let result = state.repo.get_blog_post(id).await;
    lifecycle::render_edit(&session, user, KIND, id, result).await
}

/// update_blog_post
///
/// A new image replaces the old one; the old file is removed only once the
/// row points at the new one. Without a new image the current path is kept
/// unless `remove_image` is checked.
#[utoipa::path(
    post,
    path = "/admin/blogs/{id}",
    params(("id" = Uuid, Path, description = "Blog post id")),
    request_body(content = BlogForm, content_type = "multipart/form-data"),
    responses(
        (status = 303, description = "Redirect to the list on success, to the edit form on failure")
    )
)]
pub async fn update_blog_post(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Response {
    let result = update_with_image(&state, id, multipart).await;
    lifecycle::finish_update(&session, KIND, id, result).await
}

async fn update_with_image(
    state: &AppState,
    id: Uuid,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Option<BlogPost>, AppError> {
    let submission = read_submission(multipart).await?;
    let input = submission.form.validate(false)?;

    let Some(current) = state.repo.get_blog_post(id).await? else {
        return Ok(None);
    };

    let uploaded = match submission.image {
        Some(image) => Some(store_image(&state.storage, image).await?),
        None => None,
    };
    let next_path = match (&uploaded, submission.remove_image) {
        (Some(path), _) => Some(path.clone()),
        (None, true) => None,
        (None, false) => current.image_path.clone(),
    };

    match state.repo.update_blog_post(id, input, next_path.clone()).await {
        Ok(Some(post)) => {
            if let Some(old) = current.image_path.as_deref() {
                if next_path.as_deref() != Some(old) {
                    discard_image(&state.storage, old).await;
                }
            }
            Ok(Some(post))
        }
        other => {
            if let Some(path) = uploaded {
                discard_image(&state.storage, &path).await;
            }
            other
        }
    }
}

/// delete_blog_post
///
/// Comments, then the post. The image file named by the deleted row is
/// removed once the transaction has committed.
#[utoipa::path(
    post,
    path = "/admin/blogs/{id}/delete",
    params(("id" = Uuid, Path, description = "Blog post id")),
    responses((status = 303, description = "Redirect to the list"))
)]
pub async fn delete_blog_post(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
) -> Response {
    let result = state.repo.delete_resource(KIND, id).await;
    if let Ok(Some(DeletedRow {
        image_path: Some(path),
    })) = &result
    {
        discard_image(&state.storage, path).await;
    }
    lifecycle::finish_delete(&session, KIND, id, result).await
}
