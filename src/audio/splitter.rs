use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::{AudioArtifact, Transcoder};
use crate::output::remove_dir_if_exists;
use crate::utils::{first_integer, format_duration};
use crate::{Result, TranscriptorError};

const CHUNK_PREFIX: &str = "chunk_";

/// One ordered piece of an audio artifact
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub index: u64,
    pub path: PathBuf,
}

/// Cuts artifacts larger than the upload ceiling into ordered segments
pub struct SegmentSplitter {
    transcoder: Arc<dyn Transcoder>,
    ceiling_bytes: u64,
    bitrate_kbps: u32,
    extension: String,
}

impl SegmentSplitter {
    pub fn new(
        transcoder: Arc<dyn Transcoder>,
        ceiling_bytes: u64,
        bitrate_kbps: u32,
        extension: impl Into<String>,
    ) -> Self {
        Self {
            transcoder,
            ceiling_bytes: ceiling_bytes.max(1),
            bitrate_kbps: bitrate_kbps.max(1),
            extension: extension.into(),
        }
    }

    /// Number of pieces needed to keep each under the ceiling
    pub fn segment_count(&self, size: u64) -> u64 {
        size.div_ceil(self.ceiling_bytes)
    }

    /// Playback length that fills the ceiling at the configured bitrate.
    /// Variable-bitrate sources may land above or below the ceiling.
    pub fn segment_seconds(&self) -> f64 {
        (self.ceiling_bytes as f64 * 8.0) / (self.bitrate_kbps as f64 * 1000.0)
    }

    /// Split `artifact` into `work_dir`, or return it whole if it already fits
    pub async fn split(&self, artifact: &AudioArtifact, work_dir: &Path) -> Result<Vec<Segment>> {
        let count = self.segment_count(artifact.size);
        if count <= 1 {
            return Ok(vec![Segment {
                index: 0,
                path: artifact.path.clone(),
            }]);
        }

        let seconds = self.segment_seconds();
        tracing::info!(
            "Splitting {} into ~{} chunks of {}",
            artifact.path.display(),
            count,
            format_duration(seconds)
        );

        // Chunks left by an earlier, interrupted run must not leak into this one
        remove_dir_if_exists(work_dir).await?;
        tokio::fs::create_dir_all(work_dir).await?;
        let pattern = format!("{}%03d.{}", CHUNK_PREFIX, self.extension);
        self.transcoder
            .segment(&artifact.path, work_dir, seconds, &pattern)
            .await?;

        let segments = collect_segments(work_dir, &self.extension).await?;
        if segments.is_empty() {
            return Err(TranscriptorError::SplitFailed(format!(
                "no chunks were produced for {} (expected {})",
                artifact.path.display(),
                count
            ))
            .into());
        }

        tracing::debug!("Produced {} chunks in {}", segments.len(), work_dir.display());
        Ok(segments)
    }
}

/// Chunk files in `dir`, ordered by the number embedded in their names
pub async fn collect_segments(dir: &Path, extension: &str) -> Result<Vec<Segment>> {
    let mut segments = Vec::new();
    let mut entries = tokio::fs::read_dir(dir).await?;

    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if !name.starts_with(CHUNK_PREFIX) || !path.extension().is_some_and(|e| e == extension) {
            continue;
        }
        if let Some(index) = first_integer(name) {
            segments.push(Segment { index, path });
        }
    }

    segments.sort_by_key(|s| s.index);
    Ok(segments)
}
