//! HTTP mapping of [`PortalError`].

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use portal_core::error::PortalError;
use serde::Serialize;
use tracing::{error, warn};

/// Error body returned by every endpoint.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: &'static str,
    pub message: String,
}

/// A handler error. Anything convertible into [`PortalError`] converts
/// into this, so handlers can use `?` on every layer's errors.
#[derive(Debug)]
pub struct ApiError(pub PortalError);

impl<E> From<E> for ApiError
where
    E: Into<PortalError>,
{
    fn from(err: E) -> Self {
        ApiError(err.into())
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

pub fn status_for(err: &PortalError) -> StatusCode {
    match err {
        PortalError::Validation { .. } => StatusCode::BAD_REQUEST,
        PortalError::AuthenticationFailed { .. } => StatusCode::UNAUTHORIZED,
        PortalError::AuthorizationDenied { .. } => StatusCode::FORBIDDEN,
        PortalError::NotFound { .. } => StatusCode::NOT_FOUND,
        PortalError::Conflict { .. } | PortalError::ConcurrentModification { .. } => {
            StatusCode::CONFLICT
        }
        PortalError::InvalidState { .. }
        | PortalError::Database(_)
        | PortalError::Storage(_)
        | PortalError::Crypto(_)
        | PortalError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = status_for(&self.0);
        let message = if status.is_server_error() {
            error!(error = %self.0, "Request failed");
            // Infrastructure details stay in the log.
            match &self.0 {
                PortalError::InvalidState { .. } => self.0.to_string(),
                _ => "internal server error".to_string(),
            }
        } else {
            warn!(status = status.as_u16(), error = %self.0, "Request rejected");
            self.0.to_string()
        };

        let body = ErrorBody {
            code: self.0.code(),
            message,
        };
        let mut response = (status, Json(body)).into_response();
        if status == StatusCode::UNAUTHORIZED {
            response.headers_mut().insert(
                axum::http::header::WWW_AUTHENTICATE,
                axum::http::HeaderValue::from_static("Bearer"),
            );
        }
        response
    }
}
