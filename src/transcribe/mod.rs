use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

pub mod assembler;
pub mod assemblyai;
pub mod retry;
pub mod whisper;

pub use assembler::{assemble, Assembly};
pub use assemblyai::AssemblyAiClient;
pub use retry::RetryPolicy;
pub use whisper::WhisperClient;

use crate::config::{BackendKind, Config};
use crate::Result;

/// Remote speech-to-text service
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TranscriptionBackend: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &'static str;

    /// Transcribe the audio file at `audio`
    async fn transcribe(&self, audio: &Path) -> Result<String>;
}

/// How a batch talks to its backend, chosen once at startup
#[derive(Clone)]
pub enum TranscriptionStrategy {
    /// Payload-limited service: audio is split first and every piece is retried
    Chunked {
        backend: Arc<dyn TranscriptionBackend>,
        retry: RetryPolicy,
    },
    /// Unlimited service: one call with the whole file, no retry
    Whole { backend: Arc<dyn TranscriptionBackend> },
}

impl TranscriptionStrategy {
    /// Build the configured backend with its API key
    pub fn from_config(config: &Config, api_key: String) -> Self {
        match config.backend {
            BackendKind::Whisper => Self::Chunked {
                backend: Arc::new(WhisperClient::new(
                    api_key,
                    None,
                    Some(config.transcription.whisper_model.clone()),
                    config.transcription.language.clone(),
                )),
                retry: RetryPolicy::new(
                    config.transcription.max_attempts,
                    Duration::from_secs(config.transcription.retry_delay_secs),
                ),
            },
            BackendKind::AssemblyAi => Self::Whole {
                backend: Arc::new(AssemblyAiClient::new(
                    api_key,
                    None,
                    config.transcription.language.clone(),
                )),
            },
        }
    }

    /// Whether audio must be split before transcription
    pub fn requires_segmentation(&self) -> bool {
        matches!(self, Self::Chunked { .. })
    }

    pub fn backend_name(&self) -> &'static str {
        match self {
            Self::Chunked { backend, .. } | Self::Whole { backend } => backend.name(),
        }
    }

    /// Transcribe one segment; failures yield empty text and a warning
    pub async fn transcribe(&self, audio: &Path) -> String {
        let outcome = match self {
            Self::Chunked { backend, retry } => {
                let label = format!("{} transcription of {}", backend.name(), audio.display());
                retry.run(&label, |_| backend.transcribe(audio)).await
            }
            Self::Whole { backend } => backend.transcribe(audio).await,
        };

        match outcome {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(
                    "{} gave no transcript for {}: {:#}",
                    self.backend_name(),
                    audio.display(),
                    e
                );
                String::new()
            }
        }
    }
}
