use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Redirect, Response};
use axum_extra::extract::cookie::CookieJar;

use crate::http::auth::{login_url, resolve_session};
use crate::http::AppError;
use crate::AppState;

/// Gate for routes that need a logged-in user. Anonymous requests are sent to
/// the login page before the handler or its extractors run.
pub async fn require_login(
    State(state): State<AppState>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    match resolve_session(&state, &jar).await? {
        Some(user) => {
            request.extensions_mut().insert(user);
            Ok(next.run(request).await)
        }
        None => {
            let next_path = request.uri().path_and_query().map(|pq| pq.as_str().to_string());
            tracing::debug!(path = %request.uri().path(), "redirecting anonymous request to login");
            Ok(Redirect::to(&login_url(next_path.as_deref())).into_response())
        }
    }
}
