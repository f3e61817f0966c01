//! Batch Transcriptor - A Rust CLI tool for turning lists of videos into text transcripts
//!
//! This library resolves video metadata, acquires an audio-only encoding, splits it when
//! the transcription API enforces a payload ceiling, and transcribes every segment through
//! a pluggable speech-to-text backend. Many videos are processed concurrently under a
//! fixed concurrency limit without one failure affecting the rest.

pub mod audio;
pub mod cli;
pub mod config;
pub mod extractors;
pub mod output;
pub mod pipeline;
pub mod transcribe;
pub mod utils;

pub use cli::{Cli, Commands, LogFormat};
pub use config::{BackendKind, Config};
pub use extractors::{MediaSource, MetadataResolver, VideoMetadata};
pub use pipeline::{run_batch, BatchReport, JobOutcome, JobPipeline};
pub use transcribe::{TranscriptionBackend, TranscriptionStrategy};

/// Result type used throughout the library
pub type Result<T> = anyhow::Result<T>;

/// Error types specific to the transcriptor
#[derive(thiserror::Error, Debug)]
pub enum TranscriptorError {
    #[error("Metadata resolution failed: {0}")]
    ResolutionFailed(String),

    #[error("Audio acquisition failed: {0}")]
    AcquisitionFailed(String),

    #[error("Audio split failed: {0}")]
    SplitFailed(String),

    #[error("Transcription failed: {0}")]
    TranscriptionFailed(String),

    #[error("Saving transcript failed: {0}")]
    PersistFailed(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Missing credential: environment variable {0} is not set")]
    MissingCredential(&'static str),
}
