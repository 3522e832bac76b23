use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use chessmate_protocol::ErrorEnvelope;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ServerError>;

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("question parameter missing")]
    MissingQuestion,
    #[error("request body exceeds the configured limit")]
    BodyTooLarge,
    #[error("rate limit exceeded, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },
    #[error("internal error: {0}")]
    Internal(String),
}

/// Maps each variant to the exact status/body spec.md §6 names. The
/// rate-limited case is the one exception to the JSON error envelope:
/// the spec gives it a plain-text body and a `Retry-After` header.
impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        match self {
            ServerError::MissingQuestion => (
                StatusCode::BAD_REQUEST,
                axum::Json(ErrorEnvelope::new("question parameter missing")),
            )
                .into_response(),
            ServerError::BodyTooLarge => (
                StatusCode::PAYLOAD_TOO_LARGE,
                axum::Json(ErrorEnvelope::new("request body too large")),
            )
                .into_response(),
            ServerError::RateLimited { retry_after_secs } => {
                let mut response = (
                    StatusCode::TOO_MANY_REQUESTS,
                    format!("Rate limit exceeded. Retry after {retry_after_secs} seconds."),
                )
                    .into_response();
                if let Ok(value) = HeaderValue::from_str(&retry_after_secs.to_string()) {
                    response.headers_mut().insert("retry-after", value);
                }
                response
            }
            ServerError::Internal(message) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                axum::Json(ErrorEnvelope::new(message)),
            )
                .into_response(),
        }
    }
}
