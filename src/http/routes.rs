use axum::middleware::from_fn_with_state;
use axum::{routing::get, routing::post, Router};
use tower_http::services::ServeDir;

use crate::http::handlers;
use crate::http::middleware::login::require_login;
use crate::http::middleware::page_cache::cache_page;
use crate::AppState;

pub fn feeds(state: AppState) -> Router<AppState> {
    let index = Router::new()
        .route("/", get(handlers::index))
        .route_layer(from_fn_with_state(state.clone(), cache_page));

    let followed = Router::new()
        .route("/follow/", get(handlers::follow_index))
        .route_layer(from_fn_with_state(state, require_login));

    Router::new()
        .merge(index)
        .merge(followed)
        .route("/group/:slug/", get(handlers::group_posts))
        .route("/profile/:username/", get(handlers::profile))
}

pub fn posts(state: AppState) -> Router<AppState> {
    let gated = Router::new()
        .route(
            "/posts/create/",
            get(handlers::post_create_form).post(handlers::post_create),
        )
        .route(
            "/posts/:id/edit/",
            get(handlers::post_edit_form).post(handlers::post_edit),
        )
        .route("/posts/:id/comment/", post(handlers::add_comment))
        .route("/comments/:id/delete/", post(handlers::delete_comment))
        .route_layer(from_fn_with_state(state, require_login));

    Router::new()
        .merge(gated)
        .route("/posts/:id/", get(handlers::post_detail))
}

pub fn social(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/profile/:username/follow/", post(handlers::profile_follow))
        .route(
            "/profile/:username/unfollow/",
            post(handlers::profile_unfollow),
        )
        .route_layer(from_fn_with_state(state, require_login))
}

pub fn accounts() -> Router<AppState> {
    Router::new()
        .route(
            "/auth/signup/",
            get(handlers::signup_form).post(handlers::signup),
        )
        .route("/signup/", get(handlers::signup_form).post(handlers::signup))
        .route(
            "/auth/login/",
            get(handlers::login_form).post(handlers::login),
        )
        .route("/auth/logout/", post(handlers::logout))
}

/// Locally stored images; object storage serves its own URLs.
pub fn media(state: &AppState) -> Router<AppState> {
    match &state.media_root {
        Some(root) if state.media_url.starts_with('/') && state.media_url.len() > 1 => {
            Router::new().nest_service(
                state.media_url.trim_end_matches('/'),
                ServeDir::new(root),
            )
        }
        _ => Router::new(),
    }
}
