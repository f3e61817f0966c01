use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::process::Stdio;
use tokio::io::AsyncRead;
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use url::Url;

pub mod youtube;

pub use youtube::YtDlp;

use crate::utils::{drain_stderr, sanitize_filename};
use crate::Result;

/// Identity of a resolved video
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoMetadata {
    /// Platform video id
    pub id: String,

    /// Title, restricted to filesystem-safe characters
    pub title: String,

    /// Channel or uploader name, restricted to filesystem-safe characters
    pub author: String,
}

impl VideoMetadata {
    /// Build metadata from raw upstream values, sanitizing title and author
    pub fn new(id: impl Into<String>, title: &str, author: &str) -> Self {
        Self {
            id: id.into(),
            title: sanitize_filename(title),
            author: sanitize_filename(author),
        }
    }

    /// Shared stem of the audio and transcript filenames
    pub fn file_stem(&self) -> String {
        format!("{} - {}", self.title, self.author)
    }
}

/// Resolves a video reference into its identity
#[async_trait]
pub trait MetadataResolver: Send + Sync {
    async fn resolve(&self, reference: &str) -> Result<VideoMetadata>;
}

/// Opens an audio-only byte stream for a video reference
#[async_trait]
pub trait MediaSource: Send + Sync {
    async fn open_audio(&self, reference: &str) -> Result<AudioStream>;
}

/// Audio bytes being produced by a source, optionally backed by a child process
pub struct AudioStream {
    reader: Box<dyn AsyncRead + Send + Unpin>,
    producer: Option<Producer>,
}

struct Producer {
    child: Child,
    program: &'static str,
    stderr: JoinHandle<Vec<u8>>,
}

impl AudioStream {
    /// Wrap an in-memory or already-open reader
    pub fn from_reader(reader: impl AsyncRead + Send + Unpin + 'static) -> Self {
        Self {
            reader: Box::new(reader),
            producer: None,
        }
    }

    /// Spawn `command` and stream its stdout
    pub fn spawn(mut command: Command, program: &'static str) -> Result<Self> {
        let mut child = command
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| anyhow::anyhow!("Failed to start {}: {}", program, e))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| anyhow::anyhow!("{} stdout was not captured", program))?;

        let stderr = drain_stderr(&mut child);

        Ok(Self {
            reader: Box::new(stdout),
            producer: Some(Producer {
                child,
                program,
                stderr,
            }),
        })
    }

    pub fn reader(&mut self) -> &mut (dyn AsyncRead + Send + Unpin) {
        self.reader.as_mut()
    }

    /// Wait for the producing process, failing if it exited unsuccessfully
    pub async fn finish(self) -> Result<()> {
        drop(self.reader);

        if let Some(mut producer) = self.producer {
            let status = producer.child.wait().await?;
            let stderr = producer.stderr.await.unwrap_or_default();
            if !status.success() {
                let error = String::from_utf8_lossy(&stderr);
                anyhow::bail!("{} failed: {}", producer.program, error.trim());
            }
        }

        Ok(())
    }
}

/// Validate and normalize URLs
pub fn validate_url(url: &str) -> Result<Url> {
    let parsed = Url::parse(url)
        .map_err(|_| anyhow::anyhow!("Invalid URL format: {}", url))?;

    if !matches!(parsed.scheme(), "http" | "https") {
        anyhow::bail!("URL must use HTTP or HTTPS protocol");
    }

    Ok(parsed)
}
