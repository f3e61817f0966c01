use anyhow::Context;
use async_trait::async_trait;
use reqwest::multipart;
use std::path::Path;
use std::time::Duration;

use super::TranscriptionBackend;
use crate::Result;

/// OpenAI Whisper transcription API
pub struct WhisperClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    language: Option<String>,
}

impl WhisperClient {
    pub fn new(
        api_key: String,
        base_url: Option<String>,
        model: Option<String>,
        language: Option<String>,
    ) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(600))
            .build()
            .unwrap_or_default();

        Self {
            client,
            api_key,
            base_url: base_url.unwrap_or_else(|| "https://api.openai.com/v1".to_string()),
            model: model.unwrap_or_else(|| "whisper-1".to_string()),
            language,
        }
    }
}

/// MIME type the API expects for a file extension
fn mime_for(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()) {
        Some("m4a") | Some("mp4") => "audio/mp4",
        Some("wav") => "audio/wav",
        Some("ogg") => "audio/ogg",
        Some("webm") => "audio/webm",
        Some("flac") => "audio/flac",
        _ => "audio/mpeg",
    }
}

#[async_trait]
impl TranscriptionBackend for WhisperClient {
    fn name(&self) -> &'static str {
        "openai-whisper"
    }

    async fn transcribe(&self, audio: &Path) -> Result<String> {
        let url = format!("{}/audio/transcriptions", self.base_url);

        let bytes = tokio::fs::read(audio)
            .await
            .with_context(|| format!("Failed to read {}", audio.display()))?;
        let filename = audio
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "audio.mp3".to_string());

        let file_part = multipart::Part::bytes(bytes)
            .file_name(filename)
            .mime_str(mime_for(audio))?;

        let mut form = multipart::Form::new()
            .text("model", self.model.clone())
            .text("response_format", "text")
            .part("file", file_part);
        if let Some(language) = &self.language {
            form = form.text("language", language.clone());
        }

        tracing::debug!(model = %self.model, file = %audio.display(), "Sending audio to OpenAI Whisper API");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .await
            .context("Whisper request failed")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            anyhow::bail!("Whisper API returned {}: {}", status, body.trim());
        }

        let transcript = response
            .text()
            .await
            .context("Failed to read Whisper response")?;

        tracing::debug!(chars = transcript.len(), "Whisper transcription completed");

        Ok(transcript.trim().to_string())
    }
}
