use axum::body::{to_bytes, Body};
use axum::extract::{Request, State};
use axum::http::{Method, StatusCode};
use axum::middleware::Next;
use axum::response::{Html, IntoResponse, Response};

use crate::http::AuthUser;
use crate::AppState;

const KEY_PREFIX: &str = "index_page";

/// Serves the rendered page from the cache while it is fresh. Misses run the
/// handler and store successful bodies for `index_cache_ttl`; writes elsewhere
/// never invalidate.
pub async fn cache_page(
    State(state): State<AppState>,
    viewer: Option<AuthUser>,
    request: Request,
    next: Next,
) -> Response {
    if request.method() != Method::GET {
        return next.run(request).await;
    }

    let target = request
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| request.uri().path().to_string());
    let key = match &viewer {
        Some(user) => format!("{}:{}:{}", KEY_PREFIX, user.id, target),
        None => format!("{}:anonymous:{}", KEY_PREFIX, target),
    };

    match state.cache.get(&key).await {
        Ok(Some(body)) => {
            tracing::debug!(%key, "page cache hit");
            return Html(body).into_response();
        }
        Ok(None) => {}
        Err(err) => {
            tracing::error!(error = ?err, %key, "failed to read page cache");
            return next.run(request).await;
        }
    }

    let response = next.run(request).await;
    if response.status() != StatusCode::OK {
        return response;
    }

    let (parts, body) = response.into_parts();
    let bytes = match to_bytes(body, usize::MAX).await {
        Ok(bytes) => bytes,
        Err(err) => {
            tracing::error!(error = ?err, "failed to buffer page for caching");
            return (StatusCode::INTERNAL_SERVER_ERROR, "failed to render page").into_response();
        }
    };

    match std::str::from_utf8(&bytes) {
        Ok(text) => {
            if let Err(err) = state
                .cache
                .set(&key, text.to_string(), state.index_cache_ttl)
                .await
            {
                tracing::error!(error = ?err, %key, "failed to store page in cache");
            }
        }
        Err(_) => tracing::debug!(%key, "skipping cache for non-utf8 page"),
    }

    Response::from_parts(parts, Body::from(bytes))
}
