use anyhow::Context;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tokio::time::sleep;

use super::TranscriptionBackend;
use crate::{Result, TranscriptorError};

const POLL_INTERVAL: Duration = Duration::from_secs(3);
const MAX_POLLS: u32 = 2400;

#[derive(Debug, Deserialize)]
struct UploadResponse {
    upload_url: String,
}

#[derive(Debug, Serialize)]
struct TranscriptRequest<'a> {
    audio_url: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    language_code: Option<&'a str>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    language_detection: bool,
}

#[derive(Debug, Deserialize)]
struct TranscriptJob {
    id: String,
    status: JobStatus,
    text: Option<String>,
    error: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
enum JobStatus {
    Queued,
    Processing,
    Completed,
    Error,
}

/// AssemblyAI: upload the whole file, then poll the transcript job
pub struct AssemblyAiClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    language: Option<String>,
}

impl AssemblyAiClient {
    pub fn new(api_key: String, base_url: Option<String>, language: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            base_url: base_url.unwrap_or_else(|| "https://api.assemblyai.com/v2".to_string()),
            language,
        }
    }

    async fn upload(&self, audio: &Path) -> Result<String> {
        let bytes = tokio::fs::read(audio)
            .await
            .with_context(|| format!("Failed to read {}", audio.display()))?;

        tracing::debug!("Uploading {} bytes to AssemblyAI", bytes.len());

        let response = self
            .client
            .post(format!("{}/upload", self.base_url))
            .header("authorization", &self.api_key)
            .body(bytes)
            .send()
            .await
            .context("AssemblyAI upload failed")?
            .error_for_status()
            .context("AssemblyAI rejected the upload")?;

        let upload: UploadResponse = response.json().await.context("Invalid upload response")?;
        Ok(upload.upload_url)
    }

    async fn start(&self, upload_url: &str) -> Result<TranscriptJob> {
        let request = TranscriptRequest {
            audio_url: upload_url,
            language_code: self.language.as_deref(),
            language_detection: self.language.is_none(),
        };

        let job = self
            .client
            .post(format!("{}/transcript", self.base_url))
            .header("authorization", &self.api_key)
            .json(&request)
            .send()
            .await
            .context("Failed to start AssemblyAI transcript")?
            .error_for_status()?
            .json()
            .await
            .context("Invalid transcript response")?;

        Ok(job)
    }

    async fn poll(&self, id: &str) -> Result<TranscriptJob> {
        let job = self
            .client
            .get(format!("{}/transcript/{}", self.base_url, id))
            .header("authorization", &self.api_key)
            .send()
            .await
            .context("Failed to get AssemblyAI transcript status")?
            .error_for_status()?
            .json()
            .await
            .context("Invalid transcript response")?;

        Ok(job)
    }

    /// Wait for the transcript job to finish
    async fn wait_for_completion(&self, mut job: TranscriptJob) -> Result<String> {
        let start_time = std::time::Instant::now();

        for check_count in 1..=MAX_POLLS {
            match job.status {
                JobStatus::Completed => {
                    tracing::debug!(
                        "AssemblyAI transcript {} completed after {}s",
                        job.id,
                        start_time.elapsed().as_secs()
                    );
                    return Ok(job.text.unwrap_or_default().trim().to_string());
                }
                JobStatus::Error => {
                    let reason = job.error.unwrap_or_else(|| "Unknown error".to_string());
                    return Err(TranscriptorError::TranscriptionFailed(reason).into());
                }
                JobStatus::Queued | JobStatus::Processing => {
                    tracing::trace!(
                        "AssemblyAI transcript {} still {:?} (check #{})",
                        job.id,
                        job.status,
                        check_count
                    );
                    sleep(POLL_INTERVAL).await;
                    job = self.poll(&job.id).await?;
                }
            }
        }

        anyhow::bail!("AssemblyAI transcript {} did not finish in time", job.id)
    }
}

#[async_trait]
impl TranscriptionBackend for AssemblyAiClient {
    fn name(&self) -> &'static str {
        "assemblyai"
    }

    async fn transcribe(&self, audio: &Path) -> Result<String> {
        let upload_url = self.upload(audio).await?;
        let job = self.start(&upload_url).await?;
        tracing::info!("Started AssemblyAI transcript {} for {}", job.id, audio.display());
        self.wait_for_completion(job).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_serialization() {
        let request = TranscriptRequest {
            audio_url: "https://cdn/x",
            language_code: None,
            language_detection: true,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["audio_url"], "https://cdn/x");
        assert_eq!(json["language_detection"], true);
        assert!(json.get("language_code").is_none());

        let request = TranscriptRequest {
            audio_url: "https://cdn/x",
            language_code: Some("de"),
            language_detection: false,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["language_code"], "de");
        assert!(json.get("language_detection").is_none());
    }

    #[test]
    fn test_job_status_parsing() {
        let job: TranscriptJob =
            serde_json::from_str(r#"{"id":"t1","status":"error","text":null,"error":"bad audio"}"#).unwrap();
        assert_eq!(job.status, JobStatus::Error);
        assert_eq!(job.error.as_deref(), Some("bad audio"));
    }

    #[tokio::test]
    async fn test_completed_job_returns_trimmed_text() {
        let client = AssemblyAiClient::new("key".into(), None, None);
        let job = TranscriptJob {
            id: "t1".into(),
            status: JobStatus::Completed,
            text: Some(" hello there \n".into()),
            error: None,
        };
        assert_eq!(client.wait_for_completion(job).await.unwrap(), "hello there");
    }

    #[tokio::test]
    async fn test_errored_job_is_a_transcription_failure() {
        let client = AssemblyAiClient::new("key".into(), None, None);
        let job = TranscriptJob {
            id: "t1".into(),
            status: JobStatus::Error,
            text: None,
            error: Some("file does not appear to contain audio".into()),
        };
        let err = client.wait_for_completion(job).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<TranscriptorError>(),
            Some(TranscriptorError::TranscriptionFailed(_))
        ));
    }
}
