//! Post listing, detail, create and edit.

mod common;

use axum::http::StatusCode;
use common::{png_bytes, PostFields, TestApp};
use yatube::domain::post::PostFilter;

// ===========================================================================
// Listings
// ===========================================================================

#[tokio::test]
async fn index_lists_posts_newest_first() {
    let app = TestApp::new().await;
    let author = app.create_user("leo").await;
    app.create_post(&author, "first entry", None).await;
    app.create_post(&author, "second entry", None).await;

    let resp = app.get("/", None).await;

    assert_eq!(resp.status, StatusCode::OK);
    let body = resp.text();
    let first = body.find("first entry").expect("first post missing");
    let second = body.find("second entry").expect("second post missing");
    assert!(second < first, "newer post should be rendered first");
}

#[tokio::test]
async fn group_page_lists_its_posts() {
    let app = TestApp::new().await;
    let author = app.create_user("leo").await;
    let group = app.create_group("group-slug").await;
    let other = app.create_group("other-slug").await;
    app.create_post(&author, "in the group", Some(&group)).await;
    app.create_post(&author, "somewhere else", Some(&other)).await;

    let resp = app.get("/group/group-slug/", None).await;

    assert_eq!(resp.status, StatusCode::OK);
    let body = resp.text();
    assert!(body.contains("Group group-slug"));
    assert!(body.contains("in the group"));
    assert!(!body.contains("somewhere else"));
}

#[tokio::test]
async fn unknown_group_is_not_found() {
    let app = TestApp::new().await;
    let author = app.create_user("leo").await;
    let group = app.create_group("group-slug").await;
    app.create_post(&author, "in the group", Some(&group)).await;

    let resp = app.get("/group/no-such-group/", None).await;

    assert_eq!(resp.status, StatusCode::NOT_FOUND);
    assert!(resp.text().contains("Page not found"));
}

#[tokio::test]
async fn profile_shows_only_the_authors_posts() {
    let app = TestApp::new().await;
    let leo = app.create_user("leo").await;
    let ann = app.create_user("ann").await;
    app.create_post(&leo, "by leo", None).await;
    app.create_post(&ann, "by ann", None).await;

    let resp = app.get("/profile/leo/", None).await;

    assert_eq!(resp.status, StatusCode::OK);
    let body = resp.text();
    assert!(body.contains("by leo"));
    assert!(!body.contains("by ann"));
    assert!(body.contains("Posts: 1"));
}

#[tokio::test]
async fn unknown_profile_is_not_found() {
    let app = TestApp::new().await;

    let resp = app.get("/profile/ghost/", None).await;

    assert_eq!(resp.status, StatusCode::NOT_FOUND);
}

// ===========================================================================
// Detail
// ===========================================================================

#[tokio::test]
async fn post_detail_shows_post_and_author_count() {
    let app = TestApp::new().await;
    let author = app.create_user("leo").await;
    let post = app.create_post(&author, "the detailed post", None).await;
    app.create_post(&author, "another one", None).await;

    let resp = app.get(&format!("/posts/{}/", post.id), None).await;

    assert_eq!(resp.status, StatusCode::OK);
    let body = resp.text();
    assert!(body.contains("the detailed post"));
    assert!(body.contains("(posts: 2)"));
    assert!(!body.contains("Edit</a>"));
}

#[tokio::test]
async fn post_detail_offers_edit_to_author() {
    let app = TestApp::new().await;
    let author = app.create_user("leo").await;
    let post = app.create_post(&author, "mine", None).await;

    let resp = app.get(&format!("/posts/{}/", post.id), Some(&author)).await;

    assert_eq!(resp.status, StatusCode::OK);
    assert!(resp.text().contains("Edit</a>"));
}

#[tokio::test]
async fn post_detail_unknown_or_malformed_id_is_not_found() {
    let app = TestApp::new().await;

    let unknown = app
        .get(&format!("/posts/{}/", uuid::Uuid::new_v4()), None)
        .await;
    let malformed = app.get("/posts/12345/", None).await;

    assert_eq!(unknown.status, StatusCode::NOT_FOUND);
    assert_eq!(malformed.status, StatusCode::NOT_FOUND);
}

// ===========================================================================
// Create
// ===========================================================================

#[tokio::test]
async fn create_form_requires_login() {
    let app = TestApp::new().await;

    let resp = app.get("/posts/create/", None).await;

    assert_eq!(resp.status, StatusCode::SEE_OTHER);
    let location = resp.location.unwrap();
    assert!(location.starts_with("/auth/login/?next="));
    assert!(location.contains("create"));
}

#[tokio::test]
async fn create_form_lists_groups() {
    let app = TestApp::new().await;
    let author = app.create_user("leo").await;
    app.create_group("cats").await;

    let resp = app.get("/posts/create/", Some(&author)).await;

    assert_eq!(resp.status, StatusCode::OK);
    let body = resp.text();
    assert!(body.contains("New post"));
    assert!(body.contains("Group cats"));
}

#[tokio::test]
async fn create_post_redirects_to_profile() {
    let app = TestApp::new().await;
    let author = app.create_user("leo").await;
    let group = app.create_group("cats").await;

    let resp = app
        .post_multipart(
            "/posts/create/",
            PostFields {
                text: "a brand new post",
                group: Some(group.id.to_string()),
                ..Default::default()
            },
            Some(&author),
        )
        .await;

    assert_eq!(resp.status, StatusCode::SEE_OTHER);
    assert_eq!(resp.location.as_deref(), Some("/profile/leo/"));

    let posts = app
        .state
        .repos
        .posts
        .list(PostFilter::Author(author.id), 10, 0)
        .await
        .unwrap();
    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0].text, "a brand new post");
    assert_eq!(posts[0].group.as_ref().map(|g| g.id), Some(group.id));
}

#[tokio::test]
async fn create_post_with_empty_text_rerenders_form() {
    let app = TestApp::new().await;
    let author = app.create_user("leo").await;

    let resp = app
        .post_multipart(
            "/posts/create/",
            PostFields {
                text: "   ",
                ..Default::default()
            },
            Some(&author),
        )
        .await;

    assert_eq!(resp.status, StatusCode::OK);
    assert!(resp.text().contains("This field is required."));
    let total = app.state.repos.posts.count(PostFilter::All).await.unwrap();
    assert_eq!(total, 0);
}

#[tokio::test]
async fn create_post_with_unknown_group_is_rejected() {
    let app = TestApp::new().await;
    let author = app.create_user("leo").await;

    let resp = app
        .post_multipart(
            "/posts/create/",
            PostFields {
                text: "hello",
                group: Some(uuid::Uuid::new_v4().to_string()),
                ..Default::default()
            },
            Some(&author),
        )
        .await;

    assert_eq!(resp.status, StatusCode::OK);
    assert!(resp.text().contains("Select a valid choice."));
    let total = app.state.repos.posts.count(PostFilter::All).await.unwrap();
    assert_eq!(total, 0);
}

#[tokio::test]
async fn create_post_with_image_stores_it() {
    let app = TestApp::new().await;
    let author = app.create_user("leo").await;

    let resp = app
        .post_multipart(
            "/posts/create/",
            PostFields {
                text: "with a picture",
                image: Some(("small.png", png_bytes())),
                ..Default::default()
            },
            Some(&author),
        )
        .await;
    assert_eq!(resp.status, StatusCode::SEE_OTHER);

    let posts = app
        .state
        .repos
        .posts
        .list(PostFilter::All, 10, 0)
        .await
        .unwrap();
    let key = posts[0].image.clone().expect("image key missing");
    assert!(key.starts_with("posts/"));
    assert!(key.ends_with(".png"));

    let media_root = app.state.media_root.clone().unwrap();
    assert!(media_root.join(&key).exists());

    let served = app.get(&format!("/media/{}", key), None).await;
    assert_eq!(served.status, StatusCode::OK);
    assert_eq!(served.body_bytes(), png_bytes().as_slice());
}

#[tokio::test]
async fn create_post_with_non_image_upload_is_rejected() {
    let app = TestApp::new().await;
    let author = app.create_user("leo").await;

    let resp = app
        .post_multipart(
            "/posts/create/",
            PostFields {
                text: "not really a picture",
                image: Some(("notes.txt", b"just some text".to_vec())),
                ..Default::default()
            },
            Some(&author),
        )
        .await;

    assert_eq!(resp.status, StatusCode::OK);
    assert!(resp.text().contains("Upload a valid image."));
    let total = app.state.repos.posts.count(PostFilter::All).await.unwrap();
    assert_eq!(total, 0);
}

// ===========================================================================
// Edit
// ===========================================================================

#[tokio::test]
async fn edit_form_is_prefilled_for_author() {
    let app = TestApp::new().await;
    let author = app.create_user("leo").await;
    let post = app.create_post(&author, "original words", None).await;

    let resp = app
        .get(&format!("/posts/{}/edit/", post.id), Some(&author))
        .await;

    assert_eq!(resp.status, StatusCode::OK);
    let body = resp.text();
    assert!(body.contains("Edit post"));
    assert!(body.contains("original words"));
}

#[tokio::test]
async fn edit_by_author_updates_post() {
    let app = TestApp::new().await;
    let author = app.create_user("leo").await;
    let group = app.create_group("cats").await;
    let post = app.create_post(&author, "original words", None).await;

    let resp = app
        .post_multipart(
            &format!("/posts/{}/edit/", post.id),
            PostFields {
                text: "revised words",
                group: Some(group.id.to_string()),
                ..Default::default()
            },
            Some(&author),
        )
        .await;

    assert_eq!(resp.status, StatusCode::SEE_OTHER);
    assert_eq!(resp.location, Some(format!("/posts/{}/", post.id)));

    let updated = app.state.repos.posts.get(post.id).await.unwrap().unwrap();
    assert_eq!(updated.text, "revised words");
    assert_eq!(updated.group.map(|g| g.id), Some(group.id));
    assert_eq!(updated.author_id, author.id);
    assert_eq!(updated.created_at, post.created_at);
}

#[tokio::test]
async fn edit_by_non_author_redirects_without_changes() {
    let app = TestApp::new().await;
    let author = app.create_user("leo").await;
    let intruder = app.create_user("mallory").await;
    let post = app.create_post(&author, "original words", None).await;

    let form = app
        .get(&format!("/posts/{}/edit/", post.id), Some(&intruder))
        .await;
    assert_eq!(form.status, StatusCode::SEE_OTHER);
    assert_eq!(form.location, Some(format!("/posts/{}/", post.id)));

    let submit = app
        .post_multipart(
            &format!("/posts/{}/edit/", post.id),
            PostFields {
                text: "defaced",
                ..Default::default()
            },
            Some(&intruder),
        )
        .await;
    assert_eq!(submit.status, StatusCode::SEE_OTHER);
    assert_eq!(submit.location, Some(format!("/posts/{}/", post.id)));

    let unchanged = app.state.repos.posts.get(post.id).await.unwrap().unwrap();
    assert_eq!(unchanged.text, "original words");
}

#[tokio::test]
async fn edit_requires_login() {
    let app = TestApp::new().await;
    let author = app.create_user("leo").await;
    let post = app.create_post(&author, "original words", None).await;

    let resp = app
        .post_multipart(
            &format!("/posts/{}/edit/", post.id),
            PostFields {
                text: "anonymous edit",
                ..Default::default()
            },
            None,
        )
        .await;

    assert_eq!(resp.status, StatusCode::SEE_OTHER);
    assert!(resp.location.unwrap().starts_with("/auth/login/"));
    let unchanged = app.state.repos.posts.get(post.id).await.unwrap().unwrap();
    assert_eq!(unchanged.text, "original words");
}

#[tokio::test]
async fn edit_keeps_image_unless_cleared() {
    let app = TestApp::new().await;
    let author = app.create_user("leo").await;

    app.post_multipart(
        "/posts/create/",
        PostFields {
            text: "with a picture",
            image: Some(("small.png", png_bytes())),
            ..Default::default()
        },
        Some(&author),
    )
    .await;
    let post = app
        .state
        .repos
        .posts
        .list(PostFilter::All, 1, 0)
        .await
        .unwrap()
        .remove(0);
    assert!(post.image.is_some());

    app.post_multipart(
        &format!("/posts/{}/edit/", post.id),
        PostFields {
            text: "new caption",
            ..Default::default()
        },
        Some(&author),
    )
    .await;
    let kept = app.state.repos.posts.get(post.id).await.unwrap().unwrap();
    assert_eq!(kept.image, post.image);

    app.post_multipart(
        &format!("/posts/{}/edit/", post.id),
        PostFields {
            text: "new caption",
            clear_image: true,
            ..Default::default()
        },
        Some(&author),
    )
    .await;
    let cleared = app.state.repos.posts.get(post.id).await.unwrap().unwrap();
    assert_eq!(cleared.image, None);
}

#[tokio::test]
async fn edit_unknown_post_is_not_found() {
    let app = TestApp::new().await;
    let author = app.create_user("leo").await;

    let resp = app
        .get(&format!("/posts/{}/edit/", uuid::Uuid::new_v4()), Some(&author))
        .await;

    assert_eq!(resp.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn non_author_is_redirected_whatever_the_payload() {
    let app = TestApp::new().await;
    let author = app.create_user("leo").await;
    let intruder = app.create_user("mallory").await;
    let post = app.create_post(&author, "original words", None).await;

    let resp = app
        .post_form(
            &format!("/posts/{}/edit/", post.id),
            &[("text", "defaced")],
            Some(&intruder),
        )
        .await;

    assert_eq!(resp.status, StatusCode::SEE_OTHER);
    assert_eq!(resp.location, Some(format!("/posts/{}/", post.id)));
    let unchanged = app.state.repos.posts.get(post.id).await.unwrap().unwrap();
    assert_eq!(unchanged.text, "original words");
}

#[tokio::test]
async fn author_sending_a_non_multipart_edit_gets_bad_request() {
    let app = TestApp::new().await;
    let author = app.create_user("leo").await;
    let post = app.create_post(&author, "original words", None).await;

    let resp = app
        .post_form(
            &format!("/posts/{}/edit/", post.id),
            &[("text", "revised words")],
            Some(&author),
        )
        .await;

    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    let unchanged = app.state.repos.posts.get(post.id).await.unwrap().unwrap();
    assert_eq!(unchanged.text, "original words");
}

#[tokio::test]
async fn edit_with_blank_text_rerenders_form() {
    let app = TestApp::new().await;
    let author = app.create_user("leo").await;
    let post = app.create_post(&author, "original words", None).await;

    let resp = app
        .post_multipart(
            &format!("/posts/{}/edit/", post.id),
            PostFields {
                text: "   ",
                ..Default::default()
            },
            Some(&author),
        )
        .await;

    assert_eq!(resp.status, StatusCode::OK);
    let body = resp.text();
    assert!(body.contains("Edit post"));
    assert!(body.contains("This field is required."));
    let unchanged = app.state.repos.posts.get(post.id).await.unwrap().unwrap();
    assert_eq!(unchanged.text, "original words");
}

#[tokio::test]
async fn edit_rejects_clearing_and_uploading_together() {
    let app = TestApp::new().await;
    let author = app.create_user("leo").await;

    app.post_multipart(
        "/posts/create/",
        PostFields {
            text: "with a picture",
            image: Some(("small.png", png_bytes())),
            ..Default::default()
        },
        Some(&author),
    )
    .await;
    let post = app
        .state
        .repos
        .posts
        .list(PostFilter::All, 1, 0)
        .await
        .unwrap()
        .remove(0);
    assert!(post.image.is_some());

    let resp = app
        .post_multipart(
            &format!("/posts/{}/edit/", post.id),
            PostFields {
                text: "new caption",
                image: Some(("other.png", png_bytes())),
                clear_image: true,
                ..Default::default()
            },
            Some(&author),
        )
        .await;

    assert_eq!(resp.status, StatusCode::OK);
    assert!(resp
        .text()
        .contains("Please either submit a file or check the clear checkbox, not both."));
    let unchanged = app.state.repos.posts.get(post.id).await.unwrap().unwrap();
    assert_eq!(unchanged.text, "with a picture");
    assert_eq!(unchanged.image, post.image);
}
