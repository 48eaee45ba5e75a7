//! Not-found handling and the login gate on every protected route.

mod common;

use axum::http::{Method, StatusCode};
use common::TestApp;

#[tokio::test]
async fn unknown_route_renders_custom_not_found_page() {
    let app = TestApp::new().await;

    let resp = app.get("/definitely/not/here/", None).await;

    assert_eq!(resp.status, StatusCode::NOT_FOUND);
    assert!(resp.text().contains("Page not found"));
}

#[tokio::test]
async fn malformed_ids_are_not_found() {
    let app = TestApp::new().await;
    let user = app.create_user("leo").await;

    let detail = app.get("/posts/not-a-uuid/", None).await;
    let edit = app.get("/posts/not-a-uuid/edit/", Some(&user)).await;
    let comment = app
        .post_form("/posts/not-a-uuid/comment/", &[("text", "hi")], Some(&user))
        .await;
    let delete = app
        .post_form("/comments/not-a-uuid/delete/", &[], Some(&user))
        .await;

    assert_eq!(detail.status, StatusCode::NOT_FOUND);
    assert_eq!(edit.status, StatusCode::NOT_FOUND);
    assert_eq!(comment.status, StatusCode::NOT_FOUND);
    assert_eq!(delete.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn gated_routes_redirect_anonymous_callers() {
    let app = TestApp::new().await;
    let author = app.create_user("leo").await;
    let post = app.create_post(&author, "gated", None).await;

    let gated = [
        (Method::GET, "/posts/create/".to_string()),
        (Method::POST, "/posts/create/".to_string()),
        (Method::GET, format!("/posts/{}/edit/", post.id)),
        (Method::POST, format!("/posts/{}/edit/", post.id)),
        (Method::POST, format!("/posts/{}/comment/", post.id)),
        (Method::POST, format!("/comments/{}/delete/", uuid::Uuid::new_v4())),
        (Method::GET, "/follow/".to_string()),
        (Method::POST, "/profile/leo/follow/".to_string()),
        (Method::POST, "/profile/leo/unfollow/".to_string()),
    ];

    for (method, path) in gated {
        let resp = app.request(method.clone(), &path, None, None).await;
        assert_eq!(resp.status, StatusCode::SEE_OTHER, "{} {}", method, path);
        let location = resp.location.unwrap();
        assert!(
            location.starts_with("/auth/login/?next="),
            "{} {} -> {}",
            method,
            path,
            location
        );
    }
}

#[tokio::test]
async fn public_routes_do_not_require_login() {
    let app = TestApp::new().await;
    let author = app.create_user("leo").await;
    let group = app.create_group("cats").await;
    let post = app.create_post(&author, "public", Some(&group)).await;

    for path in [
        "/".to_string(),
        "/group/cats/".to_string(),
        "/profile/leo/".to_string(),
        format!("/posts/{}/", post.id),
        "/auth/login/".to_string(),
        "/auth/signup/".to_string(),
    ] {
        let resp = app.get(&path, None).await;
        assert_eq!(resp.status, StatusCode::OK, "{}", path);
    }
}

#[tokio::test]
async fn not_found_page_keeps_the_viewer_logged_in() {
    let app = TestApp::new().await;
    let user = app.create_user("leo").await;

    let unknown_route = app.get("/definitely/not/here/", Some(&user)).await;
    let unknown_group = app.get("/group/missing/", Some(&user)).await;
    let anonymous = app.get("/definitely/not/here/", None).await;

    for resp in [&unknown_route, &unknown_group] {
        assert_eq!(resp.status, StatusCode::NOT_FOUND);
        let body = resp.text();
        assert!(body.contains("Page not found"));
        assert!(body.contains("Log out"));
        assert!(body.contains("/profile/leo/"));
    }
    assert!(!anonymous.text().contains("Log out"));
}
