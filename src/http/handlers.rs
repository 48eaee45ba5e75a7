use askama::Template;
use axum::extract::multipart::MultipartRejection;
use axum::extract::{Multipart, Path, Query, State};
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::Form;
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;
use uuid::Uuid;

use crate::app::error::ServiceError;
use crate::app::forms::{
    CommentForm, FormErrors, LoginForm, PostForm, SignupForm, Upload,
};
use crate::app::pagination::Page;
use crate::domain::post::Post;
use crate::http::auth::{expired_session_cookie, safe_next, session_cookie};
use crate::http::views::{
    CommentView, FollowPage, GroupOption, GroupPage, IndexPage, LoginPage, PostDetailPage,
    PostFormPage, PostView, ProfilePage, SignupPage,
};
use crate::http::{post_url, profile_url, AppError, AuthUser};
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct NextQuery {
    pub next: Option<String>,
}

fn render<T: Template>(template: T) -> Result<Html<String>, AppError> {
    template.render().map(Html).map_err(|err| {
        tracing::error!(error = ?err, "failed to render template");
        AppError::internal("failed to render page")
    })
}

/// Malformed ids can't name anything, so they are plain 404s.
fn parse_id(raw: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw).map_err(|_| AppError::not_found("no such entry"))
}

fn post_views(state: &AppState, page: Page<Post>) -> Page<PostView> {
    page.map(|post| PostView::new(post, |key| state.media.url(key)))
}

pub async fn index(
    State(state): State<AppState>,
    viewer: Option<AuthUser>,
    Query(query): Query<PageQuery>,
) -> Result<Html<String>, AppError> {
    let page = state
        .post_service()
        .latest(query.page.as_deref())
        .await
        .map_err(|err| AppError::service(err, "list posts"))?;

    render(IndexPage {
        viewer,
        page: post_views(&state, page),
    })
}

pub async fn group_posts(
    State(state): State<AppState>,
    viewer: Option<AuthUser>,
    Path(slug): Path<String>,
    Query(query): Query<PageQuery>,
) -> Result<Html<String>, AppError> {
    let feed = state
        .post_service()
        .group_feed(&slug, query.page.as_deref())
        .await
        .map_err(|err| AppError::service(err, "list group posts"))?;

    render(GroupPage {
        viewer,
        group: feed.group,
        page: post_views(&state, feed.page),
    })
}

pub async fn profile(
    State(state): State<AppState>,
    viewer: Option<AuthUser>,
    Path(username): Path<String>,
    Query(query): Query<PageQuery>,
) -> Result<Html<String>, AppError> {
    let feed = state
        .post_service()
        .profile_feed(
            &username,
            viewer.as_ref().map(|user| user.id),
            query.page.as_deref(),
        )
        .await
        .map_err(|err| AppError::service(err, "load profile"))?;

    let can_follow = viewer
        .as_ref()
        .map(|user| user.id != feed.author.id)
        .unwrap_or(false);

    render(ProfilePage {
        viewer,
        author_name: feed.author.display_name(),
        author: feed.author,
        page: post_views(&state, feed.page),
        following: feed.following,
        can_follow,
    })
}

pub async fn post_detail(
    State(state): State<AppState>,
    viewer: Option<AuthUser>,
    Path(post_id): Path<String>,
) -> Result<Html<String>, AppError> {
    let post_id = parse_id(&post_id)?;
    let detail = state
        .post_service()
        .detail(post_id)
        .await
        .map_err(|err| AppError::service(err, "load post"))?;

    let can_edit = viewer
        .as_ref()
        .map(|user| user.id == detail.post.author_id)
        .unwrap_or(false);
    let comments = detail
        .comments
        .into_iter()
        .map(|comment| CommentView::new(comment, viewer.as_ref()))
        .collect();

    render(PostDetailPage {
        post: PostView::new(detail.post, |key| state.media.url(key)),
        author_posts: detail.author_posts,
        comments,
        can_edit,
        viewer,
    })
}

async fn post_form_page(
    state: &AppState,
    user: AuthUser,
    editing: Option<&Post>,
    text: String,
    group: &str,
    errors: FormErrors,
) -> Result<Html<String>, AppError> {
    let groups = state
        .post_service()
        .groups()
        .await
        .map_err(|err| AppError::service(err, "list groups"))?;

    let (is_edit, action, current_image) = match editing {
        Some(post) => (
            true,
            format!("/posts/{}/edit/", post.id),
            post.image.as_deref().map(|key| state.media.url(key)),
        ),
        None => (false, "/posts/create/".to_string(), None),
    };

    render(PostFormPage {
        viewer: Some(user),
        is_edit,
        action,
        text,
        groups: GroupOption::list(groups, group),
        current_image,
        errors,
    })
}

pub async fn post_create_form(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Html<String>, AppError> {
    post_form_page(&state, user, None, String::new(), "", FormErrors::new()).await
}

pub async fn post_create(
    State(state): State<AppState>,
    user: AuthUser,
    multipart: Multipart,
) -> Result<Response, AppError> {
    let form = read_post_form(multipart).await?;
    let (text, group) = (form.text.clone(), form.group.clone());

    match state.post_service().create(user.id, form).await {
        Ok(_) => Ok(Redirect::to(&profile_url(&user.username)).into_response()),
        Err(ServiceError::Validation(errors)) => {
            Ok(post_form_page(&state, user, None, text, &group, errors)
                .await?
                .into_response())
        }
        Err(err) => Err(AppError::service(err, "create post")),
    }
}

pub async fn post_edit_form(
    State(state): State<AppState>,
    user: AuthUser,
    Path(post_id): Path<String>,
) -> Result<Html<String>, AppError> {
    let post_id = parse_id(&post_id)?;
    let post = state
        .post_service()
        .editable(post_id, user.id)
        .await
        .map_err(|err| AppError::service(err, "load post for editing"))?;

    let group = post
        .group
        .as_ref()
        .map(|group| group.id.to_string())
        .unwrap_or_default();
    let text = post.text.clone();
    post_form_page(&state, user, Some(&post), text, &group, FormErrors::new()).await
}

pub async fn post_edit(
    State(state): State<AppState>,
    user: AuthUser,
    Path(post_id): Path<String>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Response, AppError> {
    let post_id = parse_id(&post_id)?;
    let service = state.post_service();
    // ownership is settled before the body is looked at
    let post = service
        .editable(post_id, user.id)
        .await
        .map_err(|err| AppError::service(err, "load post for editing"))?;

    let multipart = multipart
        .map_err(|err| AppError::bad_request(format!("invalid multipart body: {}", err)))?;
    let form = read_post_form(multipart).await?;
    let (text, group) = (form.text.clone(), form.group.clone());

    match service.edit(post.id, user.id, form).await {
        Ok(updated) => Ok(Redirect::to(&post_url(updated.id)).into_response()),
        Err(ServiceError::Validation(errors)) => {
            Ok(post_form_page(&state, user, Some(&post), text, &group, errors)
                .await?
                .into_response())
        }
        Err(err) => Err(AppError::service(err, "update post")),
    }
}

async fn read_post_form(mut multipart: Multipart) -> Result<PostForm, AppError> {
    let mut form = PostForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| AppError::bad_request(format!("invalid multipart body: {}", err)))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "text" => form.text = field_text(field).await?,
            "group" => form.group = field_text(field).await?,
            "image-clear" => form.clear_image = !field_text(field).await?.is_empty(),
            "image" => {
                let file_name = field.file_name().map(str::to_string);
                let content_type = field.content_type().map(str::to_string);
                let data = field
                    .bytes()
                    .await
                    .map_err(|err| AppError::bad_request(format!("invalid upload: {}", err)))?;
                // browsers send an empty part when no file was picked
                if !data.is_empty() {
                    form.image = Some(Upload {
                        file_name,
                        content_type,
                        data,
                    });
                }
            }
            _ => {}
        }
    }

    Ok(form)
}

async fn field_text(field: axum::extract::multipart::Field<'_>) -> Result<String, AppError> {
    field
        .text()
        .await
        .map_err(|err| AppError::bad_request(format!("invalid form field: {}", err)))
}

pub async fn add_comment(
    State(state): State<AppState>,
    user: AuthUser,
    Path(post_id): Path<String>,
    Form(form): Form<CommentForm>,
) -> Result<Redirect, AppError> {
    let post_id = parse_id(&post_id)?;

    match state.comment_service().add(post_id, user.id, form).await {
        Ok(_) => {}
        Err(ServiceError::Validation(errors)) => {
            tracing::debug!(post_id = %post_id, ?errors, "dropped invalid comment");
        }
        Err(err) => return Err(AppError::service(err, "add comment")),
    }

    Ok(Redirect::to(&post_url(post_id)))
}

pub async fn delete_comment(
    State(state): State<AppState>,
    user: AuthUser,
    Path(comment_id): Path<String>,
) -> Result<Redirect, AppError> {
    let comment_id = parse_id(&comment_id)?;
    let post_id = state
        .comment_service()
        .delete(comment_id, user.id)
        .await
        .map_err(|err| AppError::service(err, "delete comment"))?;

    Ok(Redirect::to(&post_url(post_id)))
}

pub async fn follow_index(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<PageQuery>,
) -> Result<Html<String>, AppError> {
    let page = state
        .post_service()
        .followed_feed(user.id, query.page.as_deref())
        .await
        .map_err(|err| AppError::service(err, "list followed posts"))?;

    render(FollowPage {
        viewer: Some(user),
        page: post_views(&state, page),
    })
}

pub async fn profile_follow(
    State(state): State<AppState>,
    user: AuthUser,
    Path(username): Path<String>,
) -> Result<Redirect, AppError> {
    state
        .social_service()
        .follow(user.id, &username)
        .await
        .map_err(|err| AppError::service(err, "follow user"))?;

    Ok(Redirect::to(&profile_url(&username)))
}

pub async fn profile_unfollow(
    State(state): State<AppState>,
    user: AuthUser,
    Path(username): Path<String>,
) -> Result<Redirect, AppError> {
    state
        .social_service()
        .unfollow(user.id, &username)
        .await
        .map_err(|err| AppError::service(err, "unfollow user"))?;

    Ok(Redirect::to(&profile_url(&username)))
}

pub async fn signup_form(viewer: Option<AuthUser>) -> Result<Html<String>, AppError> {
    render(SignupPage {
        viewer,
        first_name: String::new(),
        last_name: String::new(),
        username: String::new(),
        email: String::new(),
        errors: FormErrors::new(),
    })
}

pub async fn signup(
    State(state): State<AppState>,
    viewer: Option<AuthUser>,
    Form(form): Form<SignupForm>,
) -> Result<Response, AppError> {
    let echo = form.clone();

    match state.auth_service().signup(form).await {
        Ok(_) => Ok(Redirect::to("/").into_response()),
        Err(ServiceError::Validation(errors)) => Ok(render(SignupPage {
            viewer,
            first_name: echo.first_name,
            last_name: echo.last_name,
            username: echo.username,
            email: echo.email,
            errors,
        })?
        .into_response()),
        Err(err) => Err(AppError::service(err, "sign up")),
    }
}

pub async fn login_form(
    viewer: Option<AuthUser>,
    Query(query): Query<NextQuery>,
) -> Result<Html<String>, AppError> {
    render(LoginPage {
        viewer,
        username: String::new(),
        next: safe_next(query.next.as_deref()),
        errors: FormErrors::new(),
    })
}

pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<LoginForm>,
) -> Result<Response, AppError> {
    let service = state.auth_service();
    let next = safe_next(form.next.as_deref());

    let user = match service.login(&form).await {
        Ok(user) => user,
        Err(ServiceError::Validation(errors)) => {
            return Ok(render(LoginPage {
                viewer: None,
                username: form.username,
                next,
                errors,
            })?
            .into_response());
        }
        Err(err) => return Err(AppError::service(err, "log in")),
    };

    let token = service.issue_session(user.id).map_err(|err| {
        tracing::error!(error = ?err, user_id = %user.id, "failed to issue session");
        AppError::internal("failed to log in")
    })?;

    Ok((jar.add(session_cookie(&state, token)), Redirect::to(&next)).into_response())
}

pub async fn logout(jar: CookieJar, viewer: Option<AuthUser>) -> Response {
    if let Some(user) = viewer {
        tracing::info!(user_id = %user.id, "user logged out");
    }
    (jar.remove(expired_session_cookie()), Redirect::to("/")).into_response()
}

pub async fn not_found() -> AppError {
    AppError::not_found("page not found")
}
