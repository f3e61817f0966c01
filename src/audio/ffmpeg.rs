use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use tokio::io::{AsyncRead, AsyncWriteExt};
use tokio::process::Command;

use super::Transcoder;
use crate::utils::drain_stderr;
use crate::Result;

/// Encoder and splitter backed by the ffmpeg binary
pub struct FfmpegTranscoder {
    ffmpeg_path: String,
    format: String,
    bitrate_kbps: u32,
}

impl FfmpegTranscoder {
    pub fn new(format: impl Into<String>, bitrate_kbps: u32) -> Self {
        Self {
            ffmpeg_path: "ffmpeg".to_string(),
            format: format.into(),
            bitrate_kbps,
        }
    }

    /// Use a specific ffmpeg binary instead of the one on PATH
    pub fn with_program(mut self, path: impl Into<String>) -> Self {
        self.ffmpeg_path = path.into();
        self
    }

    fn command(&self) -> Command {
        let mut command = Command::new(&self.ffmpeg_path);
        command.args(["-nostdin", "-hide_banner", "-loglevel", "error"]);
        command
    }
}

#[async_trait]
impl Transcoder for FfmpegTranscoder {
    async fn encode(&self, input: &mut (dyn AsyncRead + Send + Unpin), output: &Path) -> Result<()> {
        tracing::debug!("Encoding audio stream to {}", output.display());

        let bitrate = format!("{}k", self.bitrate_kbps);
        let mut child = Command::new(&self.ffmpeg_path)
            .args(["-hide_banner", "-loglevel", "error", "-i", "pipe:0"])
            .args(["-vn", "-b:a", &bitrate, "-f", &self.format, "-y"])
            .arg(output)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| anyhow::anyhow!("Failed to start ffmpeg: {}", e))?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| anyhow::anyhow!("ffmpeg stdin was not captured"))?;
        let stderr = drain_stderr(&mut child);

        // ffmpeg closing its input early is reported through its exit status below
        let copied = tokio::io::copy(input, &mut stdin).await;
        let _ = stdin.shutdown().await;
        drop(stdin);

        let status = child.wait().await?;
        let stderr = stderr.await.unwrap_or_default();
        if !status.success() {
            let error = String::from_utf8_lossy(&stderr);
            anyhow::bail!("ffmpeg encode failed: {}", error.trim());
        }

        let bytes = copied?;
        tracing::debug!("Fed {} bytes to ffmpeg", bytes);
        Ok(())
    }

    async fn segment(&self, input: &Path, dir: &Path, segment_seconds: f64, pattern: &str) -> Result<()> {
        tracing::debug!(
            "Splitting {} into {:.0}s pieces under {}",
            input.display(),
            segment_seconds,
            dir.display()
        );

        let output = self
            .command()
            .arg("-i")
            .arg(input)
            .args(["-f", "segment", "-segment_time"])
            .arg(format!("{:.3}", segment_seconds))
            .args(["-c", "copy", "-reset_timestamps", "1", "-y"])
            .arg(dir.join(pattern))
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .await?;

        if !output.status.success() {
            let error = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!("ffmpeg segment failed: {}", error.trim());
        }

        Ok(())
    }
}
