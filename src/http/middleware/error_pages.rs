use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;
use axum_extra::extract::cookie::CookieJar;

use crate::http::auth::resolve_session;
use crate::http::error::{render_error_page, ErrorPageContext};
use crate::AppState;

/// Error pages are rendered without request context; redraw them for a
/// logged-in viewer so the navigation bar matches every other page.
pub async fn render_error_pages(
    State(state): State<AppState>,
    jar: CookieJar,
    request: Request,
    next: Next,
) -> Response {
    let response = next.run(request).await;

    let context = match response.extensions().get::<ErrorPageContext>() {
        Some(context) => context.clone(),
        None => return response,
    };

    match resolve_session(&state, &jar).await {
        Ok(Some(viewer)) => render_error_page(context, Some(viewer)),
        Ok(None) => response,
        Err(_) => {
            tracing::warn!(status = %context.status, "could not resolve viewer for error page");
            response
        }
    }
}
