use async_trait::async_trait;
use serde_json::Value;
use std::process::Stdio;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::process::Command;

use super::{validate_url, AudioStream, MediaSource, MetadataResolver, VideoMetadata};
use crate::Result;

/// YouTube metadata and audio via yt-dlp
pub struct YtDlp {
    yt_dlp_path: String,
    proxies: Vec<String>,
    next_proxy: AtomicUsize,
}

impl YtDlp {
    pub fn new(proxies: Vec<String>) -> Self {
        Self {
            yt_dlp_path: "yt-dlp".to_string(),
            proxies,
            next_proxy: AtomicUsize::new(0),
        }
    }

    /// Round-robin over the configured proxies
    fn proxy(&self) -> Option<&str> {
        if self.proxies.is_empty() {
            return None;
        }
        let index = self.next_proxy.fetch_add(1, Ordering::Relaxed) % self.proxies.len();
        Some(&self.proxies[index])
    }

    fn command(&self) -> Command {
        let mut command = Command::new(&self.yt_dlp_path);
        command.args(["--no-playlist", "--no-warnings"]);
        if let Some(proxy) = self.proxy() {
            command.args(["--proxy", proxy]);
        }
        command
    }

    /// Get video information using yt-dlp
    async fn get_video_info(&self, url: &str) -> Result<Value> {
        tracing::debug!("Extracting video info for: {}", url);

        let output = self
            .command()
            .args(["--dump-json", url])
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await?;

        if !output.status.success() {
            let error = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!("yt-dlp failed: {}", error.trim());
        }

        let info: Value = serde_json::from_slice(&output.stdout)?;
        Ok(info)
    }
}

/// Pull id, title and author out of a yt-dlp info document
pub fn metadata_from_info(info: &Value) -> Result<VideoMetadata> {
    let id = info["id"]
        .as_str()
        .ok_or_else(|| anyhow::anyhow!("yt-dlp output has no video id"))?;
    let title = info["title"].as_str().unwrap_or(id);
    let author = info["uploader"]
        .as_str()
        .or_else(|| info["channel"].as_str())
        .unwrap_or("Unknown");

    Ok(VideoMetadata::new(id, title, author))
}

#[async_trait]
impl MetadataResolver for YtDlp {
    async fn resolve(&self, reference: &str) -> Result<VideoMetadata> {
        validate_url(reference)?;
        let info = self.get_video_info(reference).await?;
        metadata_from_info(&info)
    }
}

#[async_trait]
impl MediaSource for YtDlp {
    async fn open_audio(&self, reference: &str) -> Result<AudioStream> {
        tracing::debug!("Streaming audio for: {}", reference);

        let mut command = self.command();
        command.args([
            // Prioritize smaller audio-only formats
            "--format",
            "bestaudio[acodec^=mp4a]/bestaudio/worst",
            "--quiet",
            "--output",
            "-",
            reference,
        ]);

        AudioStream::spawn(command, "yt-dlp")
    }
}

impl Default for YtDlp {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}
