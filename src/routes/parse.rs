use axum::extract::{Multipart, State};
use axum::Json;

use crate::app_state::AppState;
use crate::error::ApiError;
use crate::models::job::{JobStatus, SubmitResponse};
use crate::models::upload::Upload;

const FILE_FIELD: &str = "file";

/// POST /parse — accept one document and start parsing it in the background.
///
/// Responds as soon as the job is registered; the outcome is only visible
/// through `GET /status/{job_id}`.
pub async fn parse_document(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<SubmitResponse>, ApiError> {
    let mut upload: Option<Upload> = None;

    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let filename = field.file_name().unwrap_or_default().to_string();
        let content_type = field.content_type().map(str::to_string);
        let bytes = field.bytes().await?;

        tracing::debug!(filename = %filename, bytes = bytes.len(), "File received");

        upload = Some(Upload {
            filename,
            content_type,
            bytes,
        });
    }

    let upload = upload.ok_or(ApiError::MissingField(FILE_FIELD))?;
    let id = state.pipeline.submit(upload);

    Ok(Json(SubmitResponse {
        id,
        status: JobStatus::Processing,
    }))
}
