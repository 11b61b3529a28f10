use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use nightwatch_core::DomainError;

/// Wraps [`DomainError`] at the HTTP edge, mapping each kind to the status
/// code in §7 of the specification and a uniform `{"error": "..."}` body.
#[derive(Debug)]
pub struct ApiError(pub DomainError);

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message, retry_after) = match &self.0 {
            DomainError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone(), None),
            DomainError::AuthenticationFailed => {
                (StatusCode::UNAUTHORIZED, "authentication failed".to_owned(), None)
            }
            DomainError::Forbidden => (StatusCode::FORBIDDEN, "forbidden".to_owned(), None),
            DomainError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone(), None),
            DomainError::SlotTaken => (StatusCode::CONFLICT, "slot already taken".to_owned(), None),
            DomainError::TooEarly => (StatusCode::BAD_REQUEST, "too early".to_owned(), None),
            DomainError::TooLate => (StatusCode::BAD_REQUEST, "too late".to_owned(), None),
            DomainError::RateLimited { retry_after_secs } => (
                StatusCode::TOO_MANY_REQUESTS,
                "rate limited".to_owned(),
                Some(*retry_after_secs),
            ),
            DomainError::Internal(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "internal error".to_owned(), None)
            }
        };

        let body = serde_json::json!({ "error": message });
        let mut response = (status, axum::Json(body)).into_response();
        if let Some(retry) = retry_after {
            response
                .headers_mut()
                .insert(axum::http::header::RETRY_AFTER, retry.into());
        }
        response
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
