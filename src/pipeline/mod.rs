use std::path::PathBuf;
use std::sync::Arc;

pub mod progress;
pub mod scheduler;

pub use progress::BatchProgress;
pub use scheduler::{run_batch, BatchReport, JobReport};

use crate::audio::{AudioAcquirer, FfmpegTranscoder, SegmentSplitter};
use crate::config::Config;
use crate::extractors::{MetadataResolver, VideoMetadata, YtDlp};
use crate::output::{remove_dir_if_exists, save_transcript, OutputLayout};
use crate::transcribe::{assemble, TranscriptionStrategy};
use crate::TranscriptorError;

/// One video being processed
#[derive(Debug, Clone)]
pub struct Job {
    pub reference: String,
    pub metadata: VideoMetadata,
}

/// Progress of a single job through the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Init,
    Resolved,
    Skipped,
    Acquiring,
    Acquired,
    Splitting,
    Split,
    Transcribing,
    Transcribed,
    Persisted,
    CleanedUp,
    Failed,
}

/// How a job ended
#[derive(Debug)]
pub enum JobOutcome {
    /// A transcript already existed, nothing was done
    Skipped { transcript: PathBuf },
    /// A transcript was written
    Completed {
        transcript: PathBuf,
        segments: usize,
        empty_segments: usize,
    },
    /// A stage failed; no transcript was written
    Failed(TranscriptorError),
}

impl JobOutcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, JobOutcome::Failed(_))
    }
}

/// Runs the resolve, acquire, split, transcribe, persist and cleanup stages for one video
pub struct JobPipeline {
    resolver: Arc<dyn MetadataResolver>,
    acquirer: AudioAcquirer,
    splitter: SegmentSplitter,
    strategy: TranscriptionStrategy,
    layout: OutputLayout,
    keep_audio: bool,
}

impl JobPipeline {
    pub fn new(
        resolver: Arc<dyn MetadataResolver>,
        acquirer: AudioAcquirer,
        splitter: SegmentSplitter,
        strategy: TranscriptionStrategy,
        layout: OutputLayout,
        keep_audio: bool,
    ) -> Self {
        Self {
            resolver,
            acquirer,
            splitter,
            strategy,
            layout,
            keep_audio,
        }
    }

    /// Wire yt-dlp, ffmpeg and the configured backend together
    pub fn from_config(config: &Config, strategy: TranscriptionStrategy) -> Self {
        let ytdlp = Arc::new(YtDlp::new(config.proxies.clone()));
        let transcoder = Arc::new(FfmpegTranscoder::new(
            config.audio.format.clone(),
            config.audio.bitrate_kbps,
        ));

        Self::new(
            ytdlp.clone(),
            AudioAcquirer::new(
                ytdlp,
                transcoder.clone(),
                config.paths.audio_dir.clone(),
                config.audio.format.clone(),
            ),
            SegmentSplitter::new(
                transcoder,
                config.ceiling_bytes(),
                config.audio.bitrate_kbps,
                config.audio.format.clone(),
            ),
            strategy,
            OutputLayout::new(config.paths.chunk_dir.clone(), config.paths.transcript_dir.clone()),
            config.keep_audio,
        )
    }

    /// Process one reference; failures are logged and returned, never propagated
    pub async fn run(&self, reference: &str) -> JobOutcome {
        let mut state = JobState::Init;
        match self.execute(reference, &mut state).await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!(reference, stage = ?state, "Job failed: {}", e);
                advance(&mut state, JobState::Failed, reference);
                JobOutcome::Failed(e)
            }
        }
    }

    async fn execute(&self, reference: &str, state: &mut JobState) -> Result<JobOutcome, TranscriptorError> {
        let metadata = self
            .resolver
            .resolve(reference)
            .await
            .map_err(|e| TranscriptorError::ResolutionFailed(format!("{}: {:#}", reference, e)))?;
        let job = Job {
            reference: reference.to_string(),
            metadata,
        };
        advance(state, JobState::Resolved, reference);

        let transcript = self.layout.transcript_path(&job.metadata);
        let exists = tokio::fs::try_exists(&transcript).await.map_err(|e| {
            TranscriptorError::PersistFailed(format!("cannot check {}: {}", transcript.display(), e))
        })?;
        if exists {
            tracing::info!(
                video_id = %job.metadata.id,
                "Transcript already exists, skipping {}",
                transcript.display()
            );
            advance(state, JobState::Skipped, reference);
            return Ok(JobOutcome::Skipped { transcript });
        }

        advance(state, JobState::Acquiring, reference);
        let artifact = self
            .acquirer
            .acquire(&job.reference, &job.metadata.title, &job.metadata.author)
            .await
            .map_err(|e| TranscriptorError::AcquisitionFailed(format!("{}: {:#}", job.metadata.title, e)))?;
        advance(state, JobState::Acquired, reference);

        let work_dir = self.layout.chunk_dir_for(&job.metadata);
        let segments = if self.strategy.requires_segmentation() {
            advance(state, JobState::Splitting, reference);
            let segments = self
                .splitter
                .split(&artifact, &work_dir)
                .await
                .map_err(|e| match e.downcast::<TranscriptorError>() {
                    Ok(split) => split,
                    Err(e) => TranscriptorError::SplitFailed(format!("{}: {:#}", job.metadata.title, e)),
                })?;
            advance(state, JobState::Split, reference);
            segments
        } else {
            vec![crate::audio::Segment {
                index: 0,
                path: artifact.path.clone(),
            }]
        };

        advance(state, JobState::Transcribing, reference);
        tracing::info!(
            video_id = %job.metadata.id,
            "Transcribing {} in {} segment(s) with {}",
            job.metadata.title,
            segments.len(),
            self.strategy.backend_name()
        );
        let assembly = assemble(&segments, |path| self.strategy.transcribe(path)).await;
        if assembly.empty_segments > 0 {
            tracing::warn!(
                video_id = %job.metadata.id,
                "{} of {} segment(s) produced no text for {}",
                assembly.empty_segments,
                segments.len(),
                job.metadata.title
            );
        }
        advance(state, JobState::Transcribed, reference);

        save_transcript(&transcript, &assembly.text)
            .await
            .map_err(|e| TranscriptorError::PersistFailed(format!("{:#}", e)))?;
        advance(state, JobState::Persisted, reference);
        tracing::info!(video_id = %job.metadata.id, "Saved transcript to {}", transcript.display());

        self.cleanup(&work_dir, &artifact.path).await;
        advance(state, JobState::CleanedUp, reference);

        Ok(JobOutcome::Completed {
            transcript,
            segments: segments.len(),
            empty_segments: assembly.empty_segments,
        })
    }

    /// Drop the chunk directory and, unless audio is kept, the artifact
    async fn cleanup(&self, work_dir: &std::path::Path, artifact: &std::path::Path) {
        if let Err(e) = remove_dir_if_exists(work_dir).await {
            tracing::warn!("{:#}", e);
        }
        if !self.keep_audio {
            if let Err(e) = tokio::fs::remove_file(artifact).await {
                tracing::warn!("Failed to remove {}: {}", artifact.display(), e);
            }
        }
    }
}

fn advance(state: &mut JobState, next: JobState, reference: &str) {
    tracing::debug!(reference, "{:?} -> {:?}", state, next);
    *state = next;
}


#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;
    use crate::audio::testing::{FakeSource, FakeTranscoder};
    use std::sync::atomic::Ordering;

    fn scenario() -> Harness {
        Harness::new(
            FakeResolver::with(&[("A", "Video A", "Alice"), ("B", "Video B", "Bob")]),
            FakeSource::with(&[
                ("A", marked_audio(b"a", 10)),
                ("B", marked_audio(b"123", 60)),
            ]),
            FakeBackend::with(&[
                (b'a', Some("hello")),
                (b'1', Some("one")),
                (b'2', Some("")),
                (b'3', Some("three")),
            ]),
        )
    }

    #[tokio::test]
    async fn test_small_and_large_videos() {
        let harness = scenario();
        let pipeline = harness.pipeline(true, true);

        let a = pipeline.run("A").await;
        let b = pipeline.run("B").await;

        assert!(matches!(a, JobOutcome::Completed { segments: 1, empty_segments: 0, .. }));
        assert!(matches!(b, JobOutcome::Completed { segments: 3, empty_segments: 1, .. }));
        assert_eq!(harness.transcript("Video A", "Alice").as_deref(), Some("hello"));
        assert_eq!(harness.transcript("Video B", "Bob").as_deref(), Some("one three"));
        assert_eq!(harness.transcoder.segmented.load(Ordering::SeqCst), 1);
        // chunk directory is removed, audio is kept
        assert!(!harness.dir("chunks").join("Video B-id-B").exists());
        assert!(harness.dir("audio").join("Video B - Bob.mp3").exists());
    }

    #[tokio::test]
    async fn test_second_run_skips_all_work() {
        let harness = scenario();
        let pipeline = harness.pipeline(true, true);
        pipeline.run("A").await;
        pipeline.run("B").await;
        let first = harness.transcript("Video B", "Bob");

        let opened = harness.source.opened.load(Ordering::SeqCst);
        let encoded = harness.transcoder.encoded.load(Ordering::SeqCst);
        let segmented = harness.transcoder.segmented.load(Ordering::SeqCst);
        let transcribed = harness.backend.calls.load(Ordering::SeqCst);

        assert!(matches!(pipeline.run("A").await, JobOutcome::Skipped { .. }));
        assert!(matches!(pipeline.run("B").await, JobOutcome::Skipped { .. }));

        assert_eq!(harness.transcript("Video B", "Bob"), first);
        assert_eq!(harness.source.opened.load(Ordering::SeqCst), opened);
        assert_eq!(harness.transcoder.encoded.load(Ordering::SeqCst), encoded);
        assert_eq!(harness.transcoder.segmented.load(Ordering::SeqCst), segmented);
        assert_eq!(harness.backend.calls.load(Ordering::SeqCst), transcribed);
    }

    #[tokio::test]
    async fn test_unreadable_transcript_location_fails_job() {
        let harness = scenario();
        let pipeline = harness.pipeline(true, true);
        fs_err::remove_dir(harness.dir("transcripts")).unwrap();
        fs_err::write(harness.dir("transcripts"), b"not a directory").unwrap();

        let outcome = pipeline.run("A").await;

        assert!(matches!(
            outcome,
            JobOutcome::Failed(TranscriptorError::PersistFailed(ref msg)) if msg.contains("cannot check")
        ));
        assert_eq!(harness.source.opened.load(Ordering::SeqCst), 0);
        assert_eq!(harness.backend.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_cached_audio_is_reused_when_transcript_missing() {
        let harness = scenario();
        let pipeline = harness.pipeline(true, true);
        pipeline.run("A").await;
        fs_err::remove_file(harness.dir("transcripts").join("Video A - Alice.txt")).unwrap();

        assert!(matches!(pipeline.run("A").await, JobOutcome::Completed { .. }));
        assert_eq!(harness.source.opened.load(Ordering::SeqCst), 1);
        assert_eq!(harness.transcript("Video A", "Alice").as_deref(), Some("hello"));
    }

    #[tokio::test]
    async fn test_resolution_failure_fails_job() {
        let harness = scenario();
        let pipeline = harness.pipeline(true, true);

        let outcome = pipeline.run("missing").await;
        assert!(matches!(outcome, JobOutcome::Failed(TranscriptorError::ResolutionFailed(_))));
        assert_eq!(harness.source.opened.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_acquisition_failure_writes_nothing() {
        let harness = Harness::new(
            FakeResolver::with(&[("C", "Video C", "Carol")]),
            FakeSource::default(),
            FakeBackend::with(&[]),
        );
        let pipeline = harness.pipeline(true, true);

        let outcome = pipeline.run("C").await;
        assert!(matches!(outcome, JobOutcome::Failed(TranscriptorError::AcquisitionFailed(_))));
        assert_eq!(harness.transcript("Video C", "Carol"), None);
    }

    #[tokio::test]
    async fn test_split_failure_writes_nothing() {
        let mut harness = scenario();
        harness.transcoder = Arc::new(FakeTranscoder {
            produce_nothing: true,
            ..FakeTranscoder::new(25)
        });
        let pipeline = harness.pipeline(true, true);

        let outcome = pipeline.run("B").await;
        assert!(matches!(outcome, JobOutcome::Failed(TranscriptorError::SplitFailed(_))));
        assert_eq!(harness.transcript("Video B", "Bob"), None);
        assert_eq!(harness.backend.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_whole_file_backend_never_splits() {
        let harness = scenario();
        let pipeline = harness.pipeline(false, true);

        let outcome = pipeline.run("B").await;
        assert!(matches!(outcome, JobOutcome::Completed { segments: 1, .. }));
        assert_eq!(harness.transcoder.segmented.load(Ordering::SeqCst), 0);
        assert_eq!(harness.backend.calls.load(Ordering::SeqCst), 1);
        // the whole file starts with marker '1'
        assert_eq!(harness.transcript("Video B", "Bob").as_deref(), Some("one"));
    }

    #[tokio::test]
    async fn test_silent_video_saves_empty_transcript() {
        let harness = Harness::new(
            FakeResolver::with(&[("S", "Silence", "Nobody")]),
            FakeSource::with(&[("S", marked_audio(b"xy", 50))]),
            FakeBackend::with(&[]),
        );
        let pipeline = harness.pipeline(true, true);

        let outcome = pipeline.run("S").await;
        assert!(matches!(outcome, JobOutcome::Completed { segments: 2, empty_segments: 2, .. }));
        assert_eq!(harness.transcript("Silence", "Nobody").as_deref(), Some(""));
        // three attempts per segment
        assert_eq!(harness.backend.calls.load(Ordering::SeqCst), 6);
    }

    #[tokio::test]
    async fn test_audio_removed_when_not_kept() {
        let harness = scenario();
        let pipeline = harness.pipeline(true, false);

        pipeline.run("B").await;
        assert!(!harness.dir("audio").join("Video B - Bob.mp3").exists());
        assert_eq!(harness.transcript("Video B", "Bob").as_deref(), Some("one three"));
    }
}
