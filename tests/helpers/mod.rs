//! Test helper utilities for E2E testing

use reqwest::multipart;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::sleep;
use uuid::Uuid;

/// Response from POST /parse
#[derive(Debug, Serialize, Deserialize)]
pub struct SubmitResponse {
    pub id: Uuid,
    pub status: String,
}

/// Response from GET /status/{job_id}
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobStatusResponse {
    pub status: String,
    pub data: Option<String>,
    pub error: Option<String>,
}

/// Upload a document to the parse endpoint
pub async fn upload_document(
    client: &reqwest::Client,
    base_url: &str,
    filename: &str,
    contents: &[u8],
) -> Result<SubmitResponse, Box<dyn std::error::Error>> {
    let form = multipart::Form::new().part(
        "file",
        multipart::Part::bytes(contents.to_vec())
            .file_name(filename.to_string())
            .mime_str("application/octet-stream")?,
    );

    let response = client
        .post(format!("{}/parse", base_url))
        .multipart(form)
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        let error_text = response.text().await?;
        return Err(format!("Upload failed with status {}: {}", status, error_text).into());
    }

    Ok(response.json::<SubmitResponse>().await?)
}

/// Fetch the current status of a job
pub async fn get_job_status(
    client: &reqwest::Client,
    base_url: &str,
    job_id: &str,
) -> Result<JobStatusResponse, Box<dyn std::error::Error>> {
    let response = client
        .get(format!("{}/status/{}", base_url, job_id))
        .send()
        .await?;

    if !response.status().is_success() {
        let error_text = response.text().await?;
        return Err(format!("Status check failed: {}", error_text).into());
    }

    Ok(response.json::<JobStatusResponse>().await?)
}

/// Poll job status until it leaves "processing" (with timeout)
pub async fn poll_job_status(
    client: &reqwest::Client,
    base_url: &str,
    job_id: &str,
    timeout_secs: u64,
) -> Result<JobStatusResponse, Box<dyn std::error::Error>> {
    let max_attempts = timeout_secs * 2; // Poll every 500ms

    for attempt in 0..max_attempts {
        let status_response = get_job_status(client, base_url, job_id).await?;

        match status_response.status.as_str() {
            "completed" | "error" => return Ok(status_response),
            "processing" => {
                if attempt % 10 == 0 && attempt > 0 {
                    println!("  ... still waiting (attempt {}/{})", attempt, max_attempts);
                }
                sleep(Duration::from_millis(500)).await;
            }
            other => {
                return Err(format!("Unexpected job status: {}", other).into());
            }
        }
    }

    Err(format!("Job did not complete within {} seconds", timeout_secs).into())
}

/// Wait for the background parse to finish
pub async fn wait_for_job_completion(
    client: &reqwest::Client,
    base_url: &str,
    job_id: &str,
) -> Result<JobStatusResponse, Box<dyn std::error::Error>> {
    poll_job_status(client, base_url, job_id, 180).await
}
