use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::Instrument;
use uuid::Uuid;

use crate::models::job::JobOutcome;
use crate::models::upload::Upload;

use super::parser::{DocumentParser, ParserError, ResultType};
use super::registry::JobRegistry;
use super::temp_storage::ScopedUpload;

#[derive(Debug, Clone)]
pub struct PipelineSettings {
    /// Parser credential. `None` fails every job with `MissingCredential`.
    pub api_key: Option<String>,
    pub result_type: ResultType,
    pub parse_timeout: Duration,
    pub temp_root: PathBuf,
}

/// Turns one upload into one terminal job outcome.
///
/// `submit` records the job and returns straight away; the parse runs on a
/// spawned task that is the only writer of that job's terminal state.
#[derive(Clone)]
pub struct IngestionPipeline {
    registry: Arc<JobRegistry>,
    parser: Arc<dyn DocumentParser>,
    settings: Arc<PipelineSettings>,
}

impl IngestionPipeline {
    pub fn new(
        registry: Arc<JobRegistry>,
        parser: Arc<dyn DocumentParser>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            registry,
            parser,
            settings: Arc::new(settings),
        }
    }

    pub fn registry(&self) -> &Arc<JobRegistry> {
        &self.registry
    }

    /// Register a new `processing` job for `upload` and schedule its parse.
    pub fn submit(&self, upload: Upload) -> Uuid {
        let job_id = Uuid::new_v4();
        self.registry.create(job_id);

        metrics::counter!("parse_jobs_submitted_total").increment(1);
        metrics::gauge!("parse_jobs_tracked").set(self.registry.len() as f64);

        tracing::info!(
            job_id = %job_id,
            filename = %upload.filename,
            content_type = upload.content_type.as_deref().unwrap_or("unknown"),
            bytes = upload.bytes.len(),
            "Document accepted for parsing"
        );

        self.spawn_supervised(job_id, upload);
        job_id
    }

    /// Run `ingest` on its own task, watched by a supervisor. If the task
    /// dies without recording a result, the supervisor records one.
    fn spawn_supervised(&self, job_id: Uuid, upload: Upload) {
        let span = tracing::info_span!("ingestion_job", job_id = %job_id, filename = %upload.filename);
        let pipeline = self.clone();
        let task = tokio::spawn(
            async move {
                pipeline.ingest(job_id, upload).await;
            }
            .instrument(span),
        );

        let registry = Arc::clone(&self.registry);
        tokio::spawn(async move {
            if let Err(e) = task.await {
                tracing::error!(job_id = %job_id, error = %e, "Ingestion task aborted");
                metrics::counter!("parse_jobs_failed_total").increment(1);
                registry.set_result(
                    job_id,
                    JobOutcome::Error(format!("ingestion task aborted: {e}")),
                );
            }
        });
    }

    /// Parse `upload` and record the terminal state of `job_id`.
    ///
    /// Every failure is captured into the job's `error` field; nothing is
    /// retried and nothing propagates to the caller.
    pub async fn ingest(&self, job_id: Uuid, upload: Upload) -> JobOutcome {
        let start = Instant::now();

        let outcome = match self.run(job_id, &upload).await {
            Ok(data) => {
                tracing::info!(
                    job_id = %job_id,
                    chars = data.len(),
                    duration_ms = start.elapsed().as_millis() as u64,
                    "Document parsed"
                );
                metrics::counter!("parse_jobs_completed_total").increment(1);
                JobOutcome::Completed(data)
            }
            Err(e) => {
                tracing::error!(job_id = %job_id, error = %e, "Document parsing failed");
                metrics::counter!("parse_jobs_failed_total").increment(1);
                JobOutcome::Error(e.to_string())
            }
        };

        metrics::histogram!("parse_processing_seconds").record(start.elapsed().as_secs_f64());
        self.registry.set_result(job_id, outcome.clone());
        outcome
    }

    async fn run(&self, job_id: Uuid, upload: &Upload) -> Result<String, IngestError> {
        let api_key = self
            .settings
            .api_key
            .as_deref()
            .ok_or(IngestError::MissingCredential)?;

        let scoped = ScopedUpload::write(
            &self.settings.temp_root,
            job_id,
            &upload.filename,
            &upload.bytes,
        )
        .await
        .map_err(IngestError::Storage)?;

        tracing::debug!(job_id = %job_id, path = %scoped.path().display(), "Upload staged");

        let parsed = tokio::time::timeout(
            self.settings.parse_timeout,
            self.parser
                .parse(scoped.path(), api_key, self.settings.result_type),
        )
        .await;

        if let Err(e) = scoped.close().await {
            tracing::warn!(job_id = %job_id, error = %e, "Failed to remove staged upload");
        }

        match parsed {
            Ok(result) => result.map_err(IngestError::Parser),
            Err(_) => Err(IngestError::Timeout(self.settings.parse_timeout)),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("LLAMA_CLOUD_API_KEY not found in environment")]
    MissingCredential,

    #[error("Failed to stage upload: {0}")]
    Storage(#[source] std::io::Error),

    #[error(transparent)]
    Parser(#[from] ParserError),

    #[error("Document parsing timed out after {}s", .0.as_secs())]
    Timeout(Duration),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::job::{JobRecord, JobStatus};
    use async_trait::async_trait;
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};

    enum Behavior {
        Echo(&'static str),
        Contents,
        Fail,
        Hang,
        Panic,
    }

    struct StubParser {
        behavior: Behavior,
        calls: AtomicUsize,
    }

    impl StubParser {
        fn new(behavior: Behavior) -> Arc<Self> {
            Arc::new(Self {
                behavior,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl DocumentParser for StubParser {
        async fn parse(
            &self,
            file: &Path,
            _api_key: &str,
            _result_type: ResultType,
        ) -> Result<String, ParserError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            assert!(file.exists(), "staged file must exist while parsing");
            match self.behavior {
                Behavior::Echo(text) => Ok(text.to_string()),
                Behavior::Contents => Ok(tokio::fs::read_to_string(file).await?),
                Behavior::Fail => Err(ParserError::Api {
                    status: 500,
                    body: "parser exploded".to_string(),
                }),
                Behavior::Hang => {
                    std::future::pending::<()>().await;
                    unreachable!()
                }
                Behavior::Panic => panic!("parser bug"),
            }
        }
    }

    fn pipeline(
        parser: Arc<StubParser>,
        api_key: Option<&str>,
        temp_root: &Path,
    ) -> IngestionPipeline {
        IngestionPipeline::new(
            Arc::new(JobRegistry::new()),
            parser,
            PipelineSettings {
                api_key: api_key.map(str::to_string),
                result_type: ResultType::Markdown,
                parse_timeout: Duration::from_secs(5),
                temp_root: temp_root.to_path_buf(),
            },
        )
    }

    async fn wait_for_terminal(registry: &JobRegistry, id: Uuid) -> JobRecord {
        for _ in 0..500 {
            let record = registry.get(&id);
            if record.status().is_terminal() {
                return record;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("job {id} never finished");
    }

    fn dir_is_empty(path: &Path) -> bool {
        std::fs::read_dir(path).unwrap().next().is_none()
    }

    #[tokio::test]
    async fn test_submit_is_processing_immediately() {
        let root = tempfile::tempdir().unwrap();
        let pipeline = pipeline(StubParser::new(Behavior::Hang), Some("key"), root.path());

        let id = pipeline.submit(Upload::new("a.pdf", "bytes"));

        assert_eq!(pipeline.registry().get(&id), JobRecord::Processing);
    }

    #[tokio::test]
    async fn test_successful_parse_records_data_and_cleans_up() {
        let root = tempfile::tempdir().unwrap();
        let parser = StubParser::new(Behavior::Echo("# Page 1\n\nHello"));
        let pipeline = pipeline(parser.clone(), Some("key"), root.path());

        let id = pipeline.submit(Upload::new("one-page.pdf", "%PDF-1.4"));
        let record = wait_for_terminal(pipeline.registry(), id).await;

        assert_eq!(
            record,
            JobRecord::Completed {
                data: "# Page 1\n\nHello".to_string()
            }
        );
        assert_eq!(parser.calls.load(Ordering::SeqCst), 1);
        assert!(dir_is_empty(root.path()));
    }

    #[tokio::test]
    async fn test_missing_credential_fails_without_calling_parser() {
        let root = tempfile::tempdir().unwrap();
        let parser = StubParser::new(Behavior::Echo("unused"));
        let pipeline = pipeline(parser.clone(), None, root.path());

        let id = pipeline.submit(Upload::new("doc.txt", "text"));
        let record = wait_for_terminal(pipeline.registry(), id).await;

        assert_eq!(record.status(), JobStatus::Error);
        assert!(record.error().unwrap().contains("LLAMA_CLOUD_API_KEY"));
        assert!(record.data().is_none());
        assert_eq!(parser.calls.load(Ordering::SeqCst), 0);
        assert!(dir_is_empty(root.path()));
    }

    #[tokio::test]
    async fn test_parser_failure_records_error_and_cleans_up() {
        let root = tempfile::tempdir().unwrap();
        let pipeline = pipeline(StubParser::new(Behavior::Fail), Some("key"), root.path());

        let outcome = pipeline
            .ingest(Uuid::new_v4(), Upload::new("doc.pdf", "x"))
            .await;

        match outcome {
            JobOutcome::Error(message) => assert!(message.contains("parser exploded")),
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert!(dir_is_empty(root.path()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_hung_parser_times_out() {
        let root = tempfile::tempdir().unwrap();
        let pipeline = pipeline(StubParser::new(Behavior::Hang), Some("key"), root.path());
        let id = Uuid::new_v4();
        pipeline.registry().create(id);

        let outcome = pipeline.ingest(id, Upload::new("slow.pdf", "x")).await;

        assert_eq!(
            outcome,
            JobOutcome::Error("Document parsing timed out after 5s".to_string())
        );
        assert_eq!(pipeline.registry().get(&id).status(), JobStatus::Error);
        assert!(dir_is_empty(root.path()));
    }

    #[tokio::test]
    async fn test_panicking_task_is_recorded_by_supervisor() {
        let root = tempfile::tempdir().unwrap();
        let pipeline = pipeline(StubParser::new(Behavior::Panic), Some("key"), root.path());

        let id = pipeline.submit(Upload::new("boom.pdf", "x"));
        let record = wait_for_terminal(pipeline.registry(), id).await;

        assert!(record.error().unwrap().starts_with("ingestion task aborted"));
        assert!(dir_is_empty(root.path()));
    }

    #[tokio::test]
    async fn test_same_filename_jobs_do_not_collide() {
        let root = tempfile::tempdir().unwrap();
        let pipeline = pipeline(StubParser::new(Behavior::Contents), Some("key"), root.path());

        let first = pipeline.submit(Upload::new("same.txt", "first document"));
        let second = pipeline.submit(Upload::new("same.txt", "second document"));

        let (first, second) = tokio::join!(
            wait_for_terminal(pipeline.registry(), first),
            wait_for_terminal(pipeline.registry(), second)
        );

        assert_eq!(first.data(), Some("first document"));
        assert_eq!(second.data(), Some("second document"));
        assert!(dir_is_empty(root.path()));
    }
}
