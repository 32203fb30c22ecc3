//! HTTP status mapping for [`memory_core::Error`] (§7): this is the one
//! place in the workspace that turns the storage/domain error taxonomy into
//! response bodies, keeping `memory-core`/`memory-storage` free of an HTTP
//! dependency.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use memory_core::Error;
use serde::Serialize;

/// Wraps [`memory_core::Error`] so it can be returned directly from an axum
/// handler via `?`.
#[derive(Debug)]
pub struct ApiError(pub Error);

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        Self(err)
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            Error::Validation(_) => StatusCode::BAD_REQUEST,
            Error::Auth(_) => StatusCode::UNAUTHORIZED,
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::Conflict(_) => StatusCode::CONFLICT,
            Error::Throttled => StatusCode::TOO_MANY_REQUESTS,
            Error::Transient(_) => StatusCode::SERVICE_UNAVAILABLE,
            Error::Storage(_) | Error::Embedding(_) | Error::Summary(_) | Error::Plugin(_) | Error::Serialization(_)
            | Error::Io(_) | Error::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %self.0, "request failed");
        }

        (status, Json(ErrorBody { error: self.0.sanitized_message() })).into_response()
    }
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;
