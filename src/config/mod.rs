use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::services::parser::{ParserSettings, ResultType};
use crate::services::pipeline::PipelineSettings;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Interface to listen on.
    #[serde(default = "default_bind_host")]
    pub bind_host: String,

    /// Listening port.
    #[serde(default = "default_port")]
    pub port: u16,

    /// LlamaParse API key. Absence is not fatal: each job fails on its own.
    pub llama_cloud_api_key: Option<String>,

    /// LlamaParse API base URL
    #[serde(default = "default_llama_cloud_base_url")]
    pub llama_cloud_base_url: String,

    /// Output representation requested from the parser
    #[serde(default)]
    pub parse_result_type: ResultType,

    /// Deadline for a single parser call, in seconds
    #[serde(default = "default_parse_timeout_secs")]
    pub parse_timeout_secs: u64,

    /// Interval between remote job status polls, in milliseconds
    #[serde(default = "default_parse_poll_interval_ms")]
    pub parse_poll_interval_ms: u64,

    /// How long finished jobs stay queryable, in seconds. 0 keeps them forever.
    #[serde(default = "default_job_retention_secs")]
    pub job_retention_secs: u64,

    /// Cadence of the retention sweep, in seconds
    #[serde(default = "default_job_sweep_interval_secs")]
    pub job_sweep_interval_secs: u64,

    /// Root directory for per-job temporary files. Defaults to the OS temp dir.
    pub upload_temp_dir: Option<PathBuf>,

    /// Maximum accepted request body size in bytes
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

fn default_bind_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_llama_cloud_base_url() -> String {
    "https://api.cloud.llamaindex.ai".to_string()
}

fn default_parse_timeout_secs() -> u64 {
    600
}

fn default_parse_poll_interval_ms() -> u64 {
    1000
}

fn default_job_retention_secs() -> u64 {
    3600
}

fn default_job_sweep_interval_secs() -> u64 {
    60
}

fn default_max_upload_bytes() -> usize {
    50 * 1024 * 1024
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        let config: Self = envy::from_env()?;
        config.job_retention()?;
        Ok(config)
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.bind_host, self.port)
    }

    pub fn parser_settings(&self) -> ParserSettings {
        ParserSettings {
            base_url: self.llama_cloud_base_url.trim_end_matches('/').to_string(),
            poll_interval: Duration::from_millis(self.parse_poll_interval_ms),
        }
    }

    pub fn pipeline_settings(&self) -> PipelineSettings {
        PipelineSettings {
            api_key: self
                .llama_cloud_api_key
                .clone()
                .filter(|key| !key.trim().is_empty()),
            result_type: self.parse_result_type,
            parse_timeout: Duration::from_secs(self.parse_timeout_secs),
            temp_root: self
                .upload_temp_dir
                .clone()
                .unwrap_or_else(std::env::temp_dir),
        }
    }

    /// `None` when retention is disabled. Values too large to subtract from
    /// the current time are rejected.
    pub fn job_retention(&self) -> Result<Option<chrono::Duration>, ConfigError> {
        let secs = self.job_retention_secs;
        if secs == 0 {
            return Ok(None);
        }
        i64::try_from(secs)
            .ok()
            .and_then(chrono::Duration::try_seconds)
            .filter(|retention| chrono::Utc::now().checked_sub_signed(*retention).is_some())
            .map(Some)
            .ok_or(ConfigError::RetentionOutOfRange(secs))
    }

    pub fn job_sweep_interval(&self) -> Duration {
        Duration::from_secs(self.job_sweep_interval_secs.max(1))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error(transparent)]
    Env(#[from] envy::Error),

    #[error("JOB_RETENTION_SECS={0} is out of range")]
    RetentionOutOfRange(u64),
}
