mod common;

use axum::http::StatusCode;
use back_office::{
    MockStorageService,
    lifecycle::ResourceKind,
    repository::{DeletedRow, Repository},
};
use common::{TestApp, TestClient, location};
use uuid::Uuid;

const PNG: &[u8] = &[0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a];

async fn first_post_id(client: &mut TestClient) -> Uuid {
    let page = client.page("/admin/blogs").await;
    Uuid::parse_str(page["items"][0]["id"].as_str().unwrap()).unwrap()
}

#[tokio::test]
async fn test_create_with_image_stores_file_and_path() {
    let app = TestApp::new();
    let mut client = app.admin_client().await;

    let res = client
        .post_multipart(
            "/admin/blogs",
            &[("title", "Hello"), ("content", "First post"), ("summary", "")],
            Some(("cover.png", "image/png", PNG)),
        )
        .await;
    assert_eq!(res.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&res), "/admin/blogs");

    let page = client.page("/admin/blogs").await;
    assert_eq!(page["flash"]["success"][0], "Blog post created successfully");
    let post = &page["items"][0];
    assert_eq!(post["title"], "Hello");
    assert_eq!(post["is_published"], true);
    assert!(post["summary"].is_null());
    assert_eq!(post["author_name"], "Test");
    assert_eq!(post["comment_count"], 0);

    let image_path = post["image_path"].as_str().unwrap();
    assert!(image_path.ends_with("-cover.png"));
    assert_eq!(app.storage.stored_paths(), vec![image_path.to_string()]);
}

#[tokio::test]
async fn test_create_without_image() {
    let app = TestApp::new();
    let mut client = app.admin_client().await;

    client
        .post_multipart(
            "/admin/blogs",
            &[("title", "No cover"), ("content", "Text only")],
            Some(("", "application/octet-stream", b"")),
        )
        .await;

    let page = client.page("/admin/blogs").await;
    assert!(page["items"][0]["image_path"].is_null());
    assert!(app.storage.stored_paths().is_empty());
}

#[tokio::test]
async fn test_rejects_non_image_upload() {
    let app = TestApp::new();
    let mut client = app.admin_client().await;

    let res = client
        .post_multipart(
            "/admin/blogs",
            &[("title", "Bad"), ("content", "Bad")],
            Some(("script.sh", "text/x-shellscript", b"#!/bin/sh")),
        )
        .await;
    assert_eq!(location(&res), "/admin/blogs/new");

    let page = client.page("/admin/blogs/new").await;
    assert_eq!(
        page["flash"]["error"][0],
        "Only JPEG, PNG, GIF or WebP images can be uploaded"
    );
    assert!(app.storage.stored_paths().is_empty());
}

#[tokio::test]
async fn test_upload_failure_creates_no_row() {
    let app = TestApp::with_storage(MockStorageService::new_failing());
    let mut client = app.admin_client().await;

    let res = client
        .post_multipart(
            "/admin/blogs",
            &[("title", "Hello"), ("content", "Body")],
            Some(("cover.png", "image/png", PNG)),
        )
        .await;
    assert_eq!(location(&res), "/admin/blogs/new");

    assert!(app.repo.list_blog_posts(None).await.unwrap().is_empty());
    let page = client.page("/admin/blogs/new").await;
    assert_eq!(
        page["flash"]["error"][0],
        "An error occurred while creating the blog post"
    );
}

#[tokio::test]
async fn test_insert_failure_removes_uploaded_image() {
    let app = TestApp::new();
    let mut client = app.admin_client().await;

    app.repo.set_failing(true);
    let res = client
        .post_multipart(
            "/admin/blogs",
            &[("title", "Hello"), ("content", "Body")],
            Some(("cover.png", "image/png", PNG)),
        )
        .await;
    app.repo.set_failing(false);

    assert_eq!(location(&res), "/admin/blogs/new");
    assert!(app.storage.stored_paths().is_empty(), "orphan image left behind");
    assert!(app.repo.list_blog_posts(None).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_update_replaces_image_and_removes_old_one() {
    let app = TestApp::new();
    let mut client = app.admin_client().await;
    client
        .post_multipart(
            "/admin/blogs",
            &[("title", "Hello"), ("content", "Body")],
            Some(("old.png", "image/png", PNG)),
        )
        .await;
    let id = first_post_id(&mut client).await;
    let old = app.repo.get_blog_post(id).await.unwrap().unwrap().image_path.unwrap();

    let res = client
        .post_multipart(
            &format!("/admin/blogs/{id}"),
            &[("title", "Hello again"), ("content", "Body"), ("is_published", "on")],
            Some(("new.png", "image/png", PNG)),
        )
        .await;
    assert_eq!(location(&res), "/admin/blogs");

    let post = app.repo.get_blog_post(id).await.unwrap().unwrap();
    let new = post.image_path.unwrap();
    assert_eq!(post.title, "Hello again");
    assert!(new.ends_with("-new.png"));
    assert!(!app.storage.contains(&old));
    assert!(app.storage.contains(&new));
}

#[tokio::test]
async fn test_update_without_image_keeps_or_removes_current() {
    let app = TestApp::new();
    let mut client = app.admin_client().await;
    client
        .post_multipart(
            "/admin/blogs",
            &[("title", "Hello"), ("content", "Body")],
            Some(("cover.png", "image/png", PNG)),
        )
        .await;
    let id = first_post_id(&mut client).await;
    let cover = app.repo.get_blog_post(id).await.unwrap().unwrap().image_path;

    // Unchecked publish box on edit means draft; the image stays.
    client
        .post_multipart(
            &format!("/admin/blogs/{id}"),
            &[("title", "Hello"), ("content", "Edited")],
            None,
        )
        .await;
    let post = app.repo.get_blog_post(id).await.unwrap().unwrap();
    assert_eq!(post.image_path, cover);
    assert!(!post.is_published);

    client
        .post_multipart(
            &format!("/admin/blogs/{id}"),
            &[("title", "Hello"), ("content", "Edited"), ("remove_image", "on")],
            None,
        )
        .await;
    let post = app.repo.get_blog_post(id).await.unwrap().unwrap();
    assert!(post.image_path.is_none());
    assert!(app.storage.stored_paths().is_empty());
}

#[tokio::test]
async fn test_delete_removes_comments_row_and_image() {
    let app = TestApp::new();
    let mut client = app.admin_client().await;
    client
        .post_multipart(
            "/admin/blogs",
            &[("title", "Hello"), ("content", "Body")],
            Some(("cover.png", "image/png", PNG)),
        )
        .await;
    let id = first_post_id(&mut client).await;
    app.repo.add_dependent(ResourceKind::BlogPost, id, None).await;

    let page = client.page("/admin/blogs").await;
    assert_eq!(page["items"][0]["comment_count"], 1);

    let res = client
        .post_form(&format!("/admin/blogs/{id}/delete"), "")
        .await;
    assert_eq!(location(&res), "/admin/blogs");

    assert!(app.repo.get_blog_post(id).await.unwrap().is_none());
    assert_eq!(app.repo.dependent_count(ResourceKind::BlogPost, id).await, 0);
    assert!(app.storage.stored_paths().is_empty());
}

#[tokio::test]
async fn test_delete_reports_image_path_of_removed_row() {
    let app = TestApp::new();
    let mut client = app.admin_client().await;
    client
        .post_multipart(
            "/admin/blogs",
            &[("title", "Hello"), ("content", "Body")],
            Some(("cover.png", "image/png", PNG)),
        )
        .await;
    let id = first_post_id(&mut client).await;
    let stored = app.repo.get_blog_post(id).await.unwrap().unwrap().image_path;
    assert!(stored.is_some());

    let deleted = app
        .repo
        .delete_resource(ResourceKind::BlogPost, id)
        .await
        .unwrap();
    assert_eq!(deleted, Some(DeletedRow { image_path: stored }));
    assert_eq!(
        app.repo.delete_resource(ResourceKind::BlogPost, id).await.unwrap(),
        None
    );
}

#[tokio::test]
async fn test_unreadable_form_is_a_validation_error() {
    let app = TestApp::new();
    let mut client = app.admin_client().await;

    // Not multipart at all.
    let res = client.post_form("/admin/blogs", "title=x&content=y").await;
    assert_eq!(res.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&res), "/admin/blogs/new");

    let page = client.page("/admin/blogs/new").await;
    assert_eq!(
        page["flash"]["error"][0],
        "The form could not be read. Please try again."
    );
}
