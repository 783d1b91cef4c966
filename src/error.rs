use axum::Json;
use axum::http::{HeaderValue, StatusCode, header::RETRY_AFTER};
use axum::response::{IntoResponse, Response};

use crate::metrics::BACKEND_ERRORS_TOTAL;
use crate::models::Envelope;
use crate::supabase::BackendError;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("Method Not Allowed")]
    MethodNotAllowed,
    #[error("Too Many Requests")]
    RateLimited { retry_after_secs: u64 },
    #[error(transparent)]
    Backend(#[from] BackendError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            ApiError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Backend(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        match &self {
            ApiError::Backend(BackendError::Api { status, code, message }) => {
                BACKEND_ERRORS_TOTAL.inc();
                tracing::error!(upstream_status = status, code = ?code, "Backend rejected query: {message}");
            }
            ApiError::Backend(e) => {
                BACKEND_ERRORS_TOTAL.inc();
                tracing::error!("Backend error: {e}");
            }
            _ => {}
        }

        let mut response = (status, Json(Envelope::failure(self.to_string()))).into_response();
        if let ApiError::RateLimited { retry_after_secs } = self {
            response
                .headers_mut()
                .insert(RETRY_AFTER, HeaderValue::from(retry_after_secs));
        }
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_limited_sets_retry_after() {
        let response = ApiError::RateLimited { retry_after_secs: 42 }.into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()[RETRY_AFTER], "42");
    }

    #[test]
    fn backend_errors_keep_their_message() {
        let err = ApiError::from(BackendError::Api {
            status: 401,
            code: Some("42501".into()),
            message: "permission denied for table tools".into(),
        });
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.to_string(), "permission denied for table tools");
    }
}
