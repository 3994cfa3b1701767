use chrono::{DateTime, Utc};
use dashmap::DashMap;
use uuid::Uuid;

use crate::models::job::{JobOutcome, JobRecord};

#[derive(Debug, Clone)]
struct JobEntry {
    record: JobRecord,
    finished_at: Option<DateTime<Utc>>,
}

/// Process-wide map from job id to job state. Source of truth for polling.
///
/// Each record has a single writer: the pipeline creates it, then the
/// ingestion task for that job performs exactly one terminal update.
#[derive(Debug, Default)]
pub struct JobRegistry {
    jobs: DashMap<Uuid, JobEntry>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a new job in the `processing` state.
    pub fn create(&self, id: Uuid) {
        let entry = JobEntry {
            record: JobRecord::Processing,
            finished_at: None,
        };
        if self.jobs.insert(id, entry).is_some() {
            tracing::warn!(job_id = %id, "Job id reused, previous record replaced");
        }
    }

    /// Move a `processing` job to its terminal state.
    ///
    /// Returns `false` when the job is unknown or already terminal; the
    /// stored record is left untouched in that case.
    pub fn set_result(&self, id: Uuid, outcome: JobOutcome) -> bool {
        let Some(mut entry) = self.jobs.get_mut(&id) else {
            tracing::warn!(job_id = %id, "Result for unknown job dropped");
            return false;
        };

        if entry.record.status().is_terminal() {
            tracing::warn!(
                job_id = %id,
                status = %entry.record.status(),
                "Job already finished, second result ignored"
            );
            return false;
        }

        entry.record = outcome.into();
        entry.finished_at = Some(Utc::now());
        true
    }

    /// Current record for `id`, or `NotFound`.
    pub fn get(&self, id: &Uuid) -> JobRecord {
        self.jobs
            .get(id)
            .map(|entry| entry.record.clone())
            .unwrap_or(JobRecord::NotFound)
    }

    /// Look up a job by its raw path segment. Ids that are not UUIDs cannot
    /// have been issued, so they read as `NotFound`.
    pub fn lookup(&self, raw_id: &str) -> JobRecord {
        match Uuid::parse_str(raw_id) {
            Ok(id) => self.get(&id),
            Err(_) => JobRecord::NotFound,
        }
    }

    /// Remove finished jobs whose terminal update happened before `cutoff`.
    /// Jobs still processing are never evicted.
    ///
    /// The count covers only entries removed by this call, so concurrent
    /// `create`s do not skew it.
    pub fn evict_finished_before(&self, cutoff: DateTime<Utc>) -> usize {
        let mut evicted = 0;
        self.jobs.retain(|_, entry| {
            let expired = matches!(entry.finished_at, Some(finished) if finished < cutoff);
            if expired {
                evicted += 1;
            }
            !expired
        });
        evicted
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }
}
