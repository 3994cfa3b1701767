use axum::extract::{Path, State};
use axum::Json;

use crate::app_state::AppState;
use crate::models::job::JobRecord;

/// GET /status/{job_id} — current state of a parse job.
///
/// Unknown ids are a normal answer (`{"status": "not_found"}`), not an error.
pub async fn get_job_status(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> Json<JobRecord> {
    Json(state.registry.lookup(&job_id))
}
