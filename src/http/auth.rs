use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use uuid::Uuid;

use crate::http::AppError;
use crate::AppState;

pub const SESSION_COOKIE: &str = "sessionid";

/// The logged-in user. On gated routes `require_login` has already resolved
/// it; elsewhere it is read from the session cookie, and `Option<AuthUser>`
/// gives the anonymous case.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: Uuid,
    pub username: String,
}

#[axum::async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        if let Some(user) = parts.extensions.get::<AuthUser>() {
            return Ok(user.clone());
        }

        let jar = CookieJar::from_headers(&parts.headers);
        match resolve_session(state, &jar).await? {
            Some(user) => Ok(user),
            None => Err(AppError::redirect(login_url(
                parts.uri.path_and_query().map(|pq| pq.as_str()),
            ))),
        }
    }
}

/// Looks up the user named by the session cookie, if any.
pub async fn resolve_session(state: &AppState, jar: &CookieJar) -> Result<Option<AuthUser>, AppError> {
    let token = match jar.get(SESSION_COOKIE) {
        Some(cookie) => cookie.value().to_string(),
        None => return Ok(None),
    };

    let user = state
        .auth_service()
        .authenticate(&token)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, "failed to authenticate session");
            AppError::internal("failed to authenticate")
        })?;

    Ok(user.map(|user| AuthUser {
        id: user.id,
        username: user.username,
    }))
}

pub fn login_url(next: Option<&str>) -> String {
    match next {
        Some(next) => {
            let encoded: String = url::form_urlencoded::byte_serialize(next.as_bytes()).collect();
            format!("/auth/login/?next={}", encoded)
        }
        None => "/auth/login/".to_string(),
    }
}

/// Only same-site paths are accepted as post-login destinations.
pub fn safe_next(next: Option<&str>) -> String {
    match next.map(str::trim) {
        Some(next)
            if next.starts_with('/') && !next.starts_with("//") && !next.contains('\\') =>
        {
            next.to_string()
        }
        _ => "/".to_string(),
    }
}

pub fn session_cookie(state: &AppState, token: String) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(state.cookie_secure)
        .max_age(time::Duration::hours(state.session_ttl_hours as i64))
        .build()
}

pub fn expired_session_cookie() -> Cookie<'static> {
    Cookie::build(SESSION_COOKIE).path("/").build()
}
