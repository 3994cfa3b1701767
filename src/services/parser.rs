use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Output representation requested from the parser.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ResultType {
    #[default]
    Markdown,
    Text,
}

/// Remote document parsing capability. Takes a file on disk and returns its
/// structured text.
#[async_trait]
pub trait DocumentParser: Send + Sync {
    async fn parse(
        &self,
        file: &Path,
        api_key: &str,
        result_type: ResultType,
    ) -> Result<String, ParserError>;
}

#[derive(Debug, Clone)]
pub struct ParserSettings {
    pub base_url: String,
    pub poll_interval: Duration,
}

/// Client for the LlamaParse REST API.
pub struct LlamaParseClient {
    http: Client,
    settings: ParserSettings,
}

#[derive(Debug, Deserialize)]
struct ParsingJob {
    id: String,
    status: RemoteJobStatus,
    #[serde(default)]
    error_message: Option<String>,
}

/// Job state as reported by LlamaParse. Statuses this client does not know
/// are kept verbatim in `Unknown` and treated as a failure.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, EnumString)]
#[serde(from = "String")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
enum RemoteJobStatus {
    Pending,
    Success,
    Error,
    PartialSuccess,
    #[strum(serialize = "CANCELED", serialize = "CANCELLED")]
    Canceled,
    #[strum(default)]
    Unknown(String),
}

impl From<String> for RemoteJobStatus {
    fn from(raw: String) -> Self {
        raw.parse().unwrap_or(RemoteJobStatus::Unknown(raw))
    }
}

#[derive(Debug, Deserialize)]
struct ParsingResult {
    #[serde(alias = "text")]
    markdown: String,
}

impl LlamaParseClient {
    pub fn new(settings: ParserSettings) -> Self {
        Self {
            http: Client::new(),
            settings,
        }
    }

    async fn upload(&self, file: &Path, api_key: &str, result_type: ResultType) -> Result<ParsingJob, ParserError> {
        let bytes = tokio::fs::read(file).await.map_err(ParserError::Io)?;
        let filename = file
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("upload")
            .to_string();

        let form = Form::new()
            .part("file", Part::bytes(bytes).file_name(filename))
            .text("result_type", result_type.to_string());

        let response = self
            .http
            .post(format!("{}/api/parsing/upload", self.settings.base_url))
            .bearer_auth(api_key)
            .multipart(form)
            .send()
            .await
            .map_err(ParserError::Http)?;

        check_status(response).await?.json().await.map_err(ParserError::Http)
    }

    async fn job(&self, job_id: &str, api_key: &str) -> Result<ParsingJob, ParserError> {
        let response = self
            .http
            .get(format!("{}/api/parsing/job/{}", self.settings.base_url, job_id))
            .bearer_auth(api_key)
            .send()
            .await
            .map_err(ParserError::Http)?;

        check_status(response).await?.json().await.map_err(ParserError::Http)
    }

    async fn result(&self, job_id: &str, api_key: &str, result_type: ResultType) -> Result<String, ParserError> {
        let response = self
            .http
            .get(format!(
                "{}/api/parsing/job/{}/result/{}",
                self.settings.base_url, job_id, result_type
            ))
            .bearer_auth(api_key)
            .send()
            .await
            .map_err(ParserError::Http)?;

        let result: ParsingResult = check_status(response).await?.json().await.map_err(ParserError::Http)?;
        Ok(result.markdown)
    }
}

#[async_trait]
impl DocumentParser for LlamaParseClient {
    /// Upload the file, wait for the remote job to finish and fetch its result.
    async fn parse(
        &self,
        file: &Path,
        api_key: &str,
        result_type: ResultType,
    ) -> Result<String, ParserError> {
        let mut job = self.upload(file, api_key, result_type).await?;
        tracing::debug!(remote_job_id = %job.id, file = %file.display(), "Uploaded document to LlamaParse");

        loop {
            let fallback = match &job.status {
                RemoteJobStatus::Success | RemoteJobStatus::PartialSuccess => break,
                RemoteJobStatus::Pending => {
                    tokio::time::sleep(self.settings.poll_interval).await;
                    job = self.job(&job.id, api_key).await?;
                    continue;
                }
                RemoteJobStatus::Unknown(raw) => {
                    tracing::warn!(remote_job_id = %job.id, status = %raw, "Unrecognized LlamaParse job status");
                    format!("unrecognized job status {raw}")
                }
                failed => format!("{failed:?}").to_uppercase(),
            };
            return Err(ParserError::JobFailed {
                job_id: job.id,
                message: job.error_message.unwrap_or(fallback),
            });
        }

        self.result(&job.id, api_key, result_type).await
    }
}

async fn check_status(response: Response) -> Result<Response, ParserError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(ParserError::Api {
        status: status.as_u16(),
        body,
    })
}

#[derive(Debug, thiserror::Error)]
pub enum ParserError {
    #[error("HTTP request to parser failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Failed to read upload for parsing: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parser API returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("Parsing job {job_id} failed: {message}")]
    JobFailed { job_id: String, message: String },
}
