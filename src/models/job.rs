use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

/// Status of a parse job as reported to pollers.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum JobStatus {
    Processing,
    Completed,
    Error,
    /// Response-only sentinel, never stored.
    NotFound,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Error)
    }
}

/// A parse job as returned by `GET /status/{job_id}`.
///
/// The payload lives inside the variant, so a record can never carry both
/// `data` and `error`, and a processing job carries neither.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum JobRecord {
    Processing,
    Completed { data: String },
    Error { error: String },
    NotFound,
}

impl JobRecord {
    pub fn status(&self) -> JobStatus {
        match self {
            JobRecord::Processing => JobStatus::Processing,
            JobRecord::Completed { .. } => JobStatus::Completed,
            JobRecord::Error { .. } => JobStatus::Error,
            JobRecord::NotFound => JobStatus::NotFound,
        }
    }

    pub fn data(&self) -> Option<&str> {
        match self {
            JobRecord::Completed { data } => Some(data),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            JobRecord::Error { error } => Some(error),
            _ => None,
        }
    }
}

/// Terminal result of one ingestion run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    Completed(String),
    Error(String),
}

impl From<JobOutcome> for JobRecord {
    fn from(outcome: JobOutcome) -> Self {
        match outcome {
            JobOutcome::Completed(data) => JobRecord::Completed { data },
            JobOutcome::Error(error) => JobRecord::Error { error },
        }
    }
}

/// Response after accepting an upload.
#[derive(Debug, Serialize, Deserialize)]
pub struct SubmitResponse {
    pub id: Uuid,
    pub status: JobStatus,
}
