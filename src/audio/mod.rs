use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::AsyncRead;

pub mod ffmpeg;
pub mod splitter;

pub use ffmpeg::FfmpegTranscoder;
pub use splitter::{Segment, SegmentSplitter};

use crate::extractors::MediaSource;
use crate::utils::format_file_size;
use crate::Result;

/// A locally stored audio file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioArtifact {
    pub path: PathBuf,
    pub size: u64,
}

impl AudioArtifact {
    /// Describe an existing file on disk
    pub async fn from_path(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let size = tokio::fs::metadata(&path).await?.len();
        Ok(Self { path, size })
    }
}

/// Audio encoder and splitter
#[async_trait]
pub trait Transcoder: Send + Sync {
    /// Encode an audio stream into `output`
    async fn encode(&self, input: &mut (dyn AsyncRead + Send + Unpin), output: &Path) -> Result<()>;

    /// Cut `input` into fixed-duration pieces named `pattern` (a `%03d` style template) inside `dir`
    async fn segment(&self, input: &Path, dir: &Path, segment_seconds: f64, pattern: &str) -> Result<()>;
}

/// Downloads audio into the audio directory, reusing what is already there
pub struct AudioAcquirer {
    source: Arc<dyn MediaSource>,
    transcoder: Arc<dyn Transcoder>,
    audio_dir: PathBuf,
    extension: String,
}

impl AudioAcquirer {
    pub fn new(
        source: Arc<dyn MediaSource>,
        transcoder: Arc<dyn Transcoder>,
        audio_dir: impl Into<PathBuf>,
        extension: impl Into<String>,
    ) -> Self {
        Self {
            source,
            transcoder,
            audio_dir: audio_dir.into(),
            extension: extension.into(),
        }
    }

    /// Canonical location of the audio for a title/author pair
    pub fn artifact_path(&self, title: &str, author: &str) -> PathBuf {
        self.audio_dir
            .join(format!("{} - {}.{}", title, author, self.extension))
    }

    /// Return the cached artifact if present, otherwise stream and encode it
    pub async fn acquire(&self, reference: &str, title: &str, author: &str) -> Result<AudioArtifact> {
        let path = self.artifact_path(title, author);

        if tokio::fs::try_exists(&path).await? {
            let artifact = AudioArtifact::from_path(path).await?;
            tracing::info!(
                "Reusing existing audio {} ({})",
                artifact.path.display(),
                format_file_size(artifact.size)
            );
            return Ok(artifact);
        }

        tracing::info!("Downloading audio to: {}", path.display());

        if let Err(e) = self.download(reference, &path).await {
            // A leftover file would be taken for a finished download on the next run
            if let Err(remove_err) = tokio::fs::remove_file(&path).await {
                if remove_err.kind() != std::io::ErrorKind::NotFound {
                    tracing::warn!("Could not remove partial audio {}: {}", path.display(), remove_err);
                }
            }
            return Err(e);
        }

        let artifact = AudioArtifact::from_path(path).await?;
        tracing::info!(
            "Downloaded {} ({})",
            artifact.path.display(),
            format_file_size(artifact.size)
        );
        Ok(artifact)
    }

    async fn download(&self, reference: &str, path: &Path) -> Result<()> {
        let mut stream = self.source.open_audio(reference).await?;
        let encoded = self.transcoder.encode(stream.reader(), path).await;
        let finished = stream.finish().await;
        encoded?;
        finished
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! In-memory stand-ins for yt-dlp and ffmpeg

    use super::*;
    use crate::extractors::AudioStream;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::io::AsyncReadExt;

    /// Serves fixed bytes per reference
    #[derive(Default)]
    pub struct FakeSource {
        pub audio: HashMap<String, Vec<u8>>,
        pub opened: AtomicUsize,
    }

    impl FakeSource {
        pub fn with(audio: &[(&str, Vec<u8>)]) -> Self {
            Self {
                audio: audio.iter().map(|(r, b)| (r.to_string(), b.clone())).collect(),
                opened: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl MediaSource for FakeSource {
        async fn open_audio(&self, reference: &str) -> Result<AudioStream> {
            self.opened.fetch_add(1, Ordering::SeqCst);
            let bytes = self
                .audio
                .get(reference)
                .cloned()
                .ok_or_else(|| anyhow::anyhow!("stream unavailable for {}", reference))?;
            Ok(AudioStream::from_reader(std::io::Cursor::new(bytes)))
        }
    }

    /// Copies bytes on encode and cuts fixed-size pieces on segment
    pub struct FakeTranscoder {
        pub bytes_per_segment: usize,
        pub fail_encode: bool,
        pub produce_nothing: bool,
        pub encoded: AtomicUsize,
        pub segmented: AtomicUsize,
    }

    impl FakeTranscoder {
        pub fn new(bytes_per_segment: usize) -> Self {
            Self {
                bytes_per_segment,
                fail_encode: false,
                produce_nothing: false,
                encoded: AtomicUsize::new(0),
                segmented: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl Transcoder for FakeTranscoder {
        async fn encode(&self, input: &mut (dyn AsyncRead + Send + Unpin), output: &Path) -> Result<()> {
            self.encoded.fetch_add(1, Ordering::SeqCst);
            let mut bytes = Vec::new();
            input.read_to_end(&mut bytes).await?;
            tokio::fs::write(output, &bytes[..bytes.len() / 2]).await?;
            if self.fail_encode {
                anyhow::bail!("encoder crashed");
            }
            tokio::fs::write(output, bytes).await?;
            Ok(())
        }

        async fn segment(&self, input: &Path, dir: &Path, _segment_seconds: f64, pattern: &str) -> Result<()> {
            self.segmented.fetch_add(1, Ordering::SeqCst);
            if self.produce_nothing {
                return Ok(());
            }
            let bytes = tokio::fs::read(input).await?;
            for (index, piece) in bytes.chunks(self.bytes_per_segment).enumerate() {
                let name = pattern.replace("%03d", &format!("{:03}", index));
                tokio::fs::write(dir.join(name), piece).await?;
            }
            Ok(())
        }
    }
}
