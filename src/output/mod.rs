use anyhow::Context;
use std::path::{Path, PathBuf};

use crate::extractors::VideoMetadata;
use crate::Result;

/// Where a job's transcript and temporary chunks live
#[derive(Debug, Clone)]
pub struct OutputLayout {
    pub chunk_dir: PathBuf,
    pub transcript_dir: PathBuf,
}

impl OutputLayout {
    pub fn new(chunk_dir: impl Into<PathBuf>, transcript_dir: impl Into<PathBuf>) -> Self {
        Self {
            chunk_dir: chunk_dir.into(),
            transcript_dir: transcript_dir.into(),
        }
    }

    /// `{title} - {author}.txt` inside the transcript directory
    pub fn transcript_path(&self, meta: &VideoMetadata) -> PathBuf {
        self.transcript_dir.join(format!("{}.txt", meta.file_stem()))
    }

    /// `{title}-{id}` inside the chunk directory
    pub fn chunk_dir_for(&self, meta: &VideoMetadata) -> PathBuf {
        self.chunk_dir.join(format!("{}-{}", meta.title, meta.id))
    }
}

/// Write a transcript so that the final path only ever holds complete content
pub async fn save_transcript(path: &Path, text: &str) -> Result<()> {
    let mut partial = path.as_os_str().to_owned();
    partial.push(".part");
    let partial = PathBuf::from(partial);

    tokio::fs::write(&partial, text)
        .await
        .with_context(|| format!("Failed to write {}", partial.display()))?;
    tokio::fs::rename(&partial, path)
        .await
        .with_context(|| format!("Failed to move transcript into {}", path.display()))?;

    Ok(())
}

/// Remove a directory tree, treating "already gone" as success
pub async fn remove_dir_if_exists(dir: &Path) -> Result<()> {
    match tokio::fs::remove_dir_all(dir).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e).with_context(|| format!("Failed to remove {}", dir.display())),
    }
}
