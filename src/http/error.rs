use askama::Template;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Redirect, Response};

use crate::app::error::ServiceError;
use crate::http::views::{ErrorPage, NotFoundPage};
use crate::http::AuthUser;

#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    message: String,
    location: Option<String>,
}

impl AppError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
            location: None,
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: message.into(),
            location: None,
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
            location: None,
        }
    }

    /// Ends the request with a `303 See Other` instead of an error page.
    pub fn redirect(location: impl Into<String>) -> Self {
        Self {
            status: StatusCode::SEE_OTHER,
            message: String::new(),
            location: Some(location.into()),
        }
    }

    /// Maps a service failure; `action` names what was attempted in the log.
    pub fn service(err: ServiceError, action: &'static str) -> Self {
        match err {
            ServiceError::NotFound(what) => Self::not_found(format!("{} not found", what)),
            ServiceError::NotOwner { post_id } => Self::redirect(super::post_url(post_id)),
            ServiceError::Validation(errors) => {
                tracing::debug!(?errors, "unhandled validation failure while trying to {}", action);
                Self::bad_request("invalid form submission")
            }
            ServiceError::Internal(err) => {
                tracing::error!(error = ?err, "failed to {}", action);
                Self::internal(format!("failed to {}", action))
            }
        }
    }
}

/// Carried on error responses so `render_error_pages` can redraw them with
/// the viewer's navigation bar.
#[derive(Debug, Clone)]
pub struct ErrorPageContext {
    pub status: StatusCode,
    pub message: String,
}

pub fn render_error_page(context: ErrorPageContext, viewer: Option<AuthUser>) -> Response {
    let ErrorPageContext { status, message } = context.clone();
    let rendered = if status == StatusCode::NOT_FOUND {
        NotFoundPage { viewer }.render()
    } else {
        ErrorPage {
            viewer,
            status: status.as_u16(),
            message,
        }
        .render()
    };

    let mut response = match rendered {
        Ok(body) => (status, Html(body)).into_response(),
        Err(err) => {
            tracing::error!(error = ?err, "failed to render error page");
            (status, status.to_string()).into_response()
        }
    };
    response.extensions_mut().insert(context);
    response
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if let Some(location) = self.location {
            return Redirect::to(&location).into_response();
        }

        render_error_page(
            ErrorPageContext {
                status: self.status,
                message: self.message,
            },
            None,
        )
    }
}
