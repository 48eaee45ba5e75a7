use axum::extract::DefaultBodyLimit;
use axum::middleware::from_fn_with_state;
use axum::Router;
use uuid::Uuid;

use crate::AppState;

pub mod auth;
mod error;
mod handlers;
mod middleware;
mod routes;
pub mod views;

pub use auth::AuthUser;
pub use error::AppError;

pub fn router(state: AppState) -> Router {
    Router::new()
        .merge(routes::feeds(state.clone()))
        .merge(routes::posts(state.clone()))
        .merge(routes::social(state.clone()))
        .merge(routes::accounts())
        .merge(routes::media(&state))
        .fallback(handlers::not_found)
        .layer(from_fn_with_state(
            state.clone(),
            middleware::error_pages::render_error_pages,
        ))
        .layer(DefaultBodyLimit::max(state.upload_max_bytes))
        .with_state(state)
}

pub fn post_url(post_id: Uuid) -> String {
    format!("/posts/{}/", post_id)
}

pub fn profile_url(username: &str) -> String {
    format!("/profile/{}/", username)
}
