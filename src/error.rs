use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

/// Errors returned synchronously by the HTTP handlers. Failures during
/// background parsing never surface here; they are stored on the job.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Multipart body could not be read. Keeps the status axum assigned,
    /// e.g. 413 when the body exceeds the upload limit.
    #[error("Invalid upload: {message}")]
    Multipart { status: StatusCode, message: String },

    #[error("Missing form field: {0}")]
    MissingField(&'static str),
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub detail: String,
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Multipart { status, .. } => *status,
            ApiError::MissingField(_) => StatusCode::UNPROCESSABLE_ENTITY,
        }
    }
}

impl From<axum::extract::multipart::MultipartError> for ApiError {
    fn from(err: axum::extract::multipart::MultipartError) -> Self {
        ApiError::Multipart {
            status: err.status(),
            message: err.body_text(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        tracing::warn!(status = status.as_u16(), error = %self, "Request rejected");

        (
            status,
            Json(ErrorBody {
                detail: self.to_string(),
            }),
        )
            .into_response()
    }
}
