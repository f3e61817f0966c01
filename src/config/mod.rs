use anyhow::{Context, Result};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::TranscriptorError;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Video URLs to transcribe, in order
    pub videos: Vec<String>,

    /// Proxies handed to yt-dlp, rotated between invocations
    pub proxies: Vec<String>,

    /// Transcription backend used for the whole batch
    pub backend: BackendKind,

    /// Maximum number of videos processed at once
    pub concurrency: usize,

    /// Keep audio files after a successful transcription
    pub keep_audio: bool,

    /// Working directories
    pub paths: PathsConfig,

    /// Audio encoding settings
    pub audio: AudioConfig,

    /// Transcription settings
    pub transcription: TranscriptionConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
pub enum BackendKind {
    /// OpenAI Whisper API (25 MB upload limit, audio is split into chunks)
    #[serde(rename = "whisper")]
    #[value(name = "whisper")]
    Whisper,

    /// AssemblyAI (no upload limit, whole file in one request)
    #[serde(rename = "assemblyai")]
    #[value(name = "assemblyai")]
    AssemblyAi,
}

impl BackendKind {
    /// Environment variable holding the API key for this backend
    pub fn credential_var(&self) -> &'static str {
        match self {
            BackendKind::Whisper => "OPENAI_API_KEY",
            BackendKind::AssemblyAi => "ASSEMBLYAI_API_KEY",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            BackendKind::Whisper => "OpenAI Whisper (chunked uploads, retried)",
            BackendKind::AssemblyAi => "AssemblyAI (whole file, single request)",
        }
    }
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendKind::Whisper => write!(f, "whisper"),
            BackendKind::AssemblyAi => write!(f, "assemblyai"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Downloaded audio, doubles as a cache across runs
    pub audio_dir: PathBuf,

    /// Per-video chunk subdirectories
    pub chunk_dir: PathBuf,

    /// Final transcripts
    pub transcript_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Container/codec extension produced by the encoder
    pub format: String,

    /// Constant bitrate of the encoded audio
    pub bitrate_kbps: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscriptionConfig {
    /// Upload ceiling for the chunked backend, in megabytes
    pub max_chunk_mb: u64,

    /// Attempts per chunk before giving up on it
    pub max_attempts: u32,

    /// Delay between attempts
    pub retry_delay_secs: u64,

    /// Whisper model name
    pub whisper_model: String,

    /// Optional language hint (ISO 639-1)
    pub language: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            videos: Vec::new(),
            proxies: Vec::new(),
            backend: BackendKind::Whisper,
            concurrency: 3,
            keep_audio: true,
            paths: PathsConfig::default(),
            audio: AudioConfig::default(),
            transcription: TranscriptionConfig::default(),
        }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            audio_dir: PathBuf::from("audio"),
            chunk_dir: PathBuf::from("chunks"),
            transcript_dir: PathBuf::from("transcripts"),
        }
    }
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            format: "mp3".to_string(),
            bitrate_kbps: 64,
        }
    }
}

impl Default for TranscriptionConfig {
    fn default() -> Self {
        Self {
            max_chunk_mb: 25,
            max_attempts: 3,
            retry_delay_secs: 5,
            whisper_model: "whisper-1".to_string(),
            language: None,
        }
    }
}

impl Config {
    /// Load configuration from an explicit file, or from the default location
    /// (creating it with defaults when absent)
    pub async fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load_from(path);
        }

        let config_path = Self::config_path()?;

        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            let config = Self::default();
            config.save(&config_path).await?;
            tracing::info!("Created default configuration at {}", config_path.display());
            Ok(config)
        }
    }

    /// Parse and validate a configuration file
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs_err::read_to_string(path)
            .context("Failed to read config file")?;

        let config: Config = serde_yaml::from_str(&content)
            .context("Failed to parse config file")?;

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub async fn save(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs_err::create_dir_all(parent)?;
            }
        }

        let content = serde_yaml::to_string(self)
            .context("Failed to serialize config")?;

        fs_err::write(config_path, content)
            .context("Failed to write config file")?;

        Ok(())
    }

    /// Get configuration file path
    pub fn config_path() -> Result<PathBuf> {
        // First try current directory for easy testing
        let local_config = PathBuf::from("config.yaml");
        if local_config.exists() {
            return Ok(local_config);
        }

        let config_dir = dirs::config_dir()
            .context("Could not determine config directory")?;

        Ok(config_dir.join("batch-transcriptor").join("config.yaml"))
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.concurrency == 0 {
            return Err(TranscriptorError::ConfigError("concurrency must be at least 1".into()).into());
        }
        if self.transcription.max_chunk_mb == 0 {
            return Err(TranscriptorError::ConfigError("max_chunk_mb must be at least 1".into()).into());
        }
        if self.transcription.max_attempts == 0 {
            return Err(TranscriptorError::ConfigError("max_attempts must be at least 1".into()).into());
        }
        if self.audio.bitrate_kbps == 0 {
            return Err(TranscriptorError::ConfigError("bitrate_kbps must be at least 1".into()).into());
        }
        for proxy in &self.proxies {
            url::Url::parse(proxy)
                .map_err(|_| TranscriptorError::ConfigError(format!("invalid proxy URL: {}", proxy)))?;
        }

        Ok(())
    }

    /// Read the API key of the selected backend from the environment
    pub fn api_key(&self) -> Result<String, TranscriptorError> {
        let var = self.backend.credential_var();
        match std::env::var(var) {
            Ok(key) if !key.trim().is_empty() => Ok(key),
            _ => Err(TranscriptorError::MissingCredential(var)),
        }
    }

    /// Upload ceiling in bytes
    pub fn ceiling_bytes(&self) -> u64 {
        self.transcription.max_chunk_mb * 1024 * 1024
    }

    /// Create the audio, chunk and transcript directories if missing
    pub fn ensure_directories(&self) -> Result<()> {
        for dir in [&self.paths.audio_dir, &self.paths.chunk_dir, &self.paths.transcript_dir] {
            fs_err::create_dir_all(dir)
                .with_context(|| format!("Failed to create directory {}", dir.display()))?;
        }
        Ok(())
    }

    /// Display current configuration
    pub fn display(&self) {
        println!("Current Configuration:");
        println!("  Backend: {} ({})", self.backend, self.backend.description());
        println!("  Videos: {}", self.videos.len());
        println!("  Proxies: {}", self.proxies.len());
        println!("  Concurrency: {}", self.concurrency);
        println!("  Keep Audio: {}", self.keep_audio);
        println!("  Audio: {} @ {} kbps", self.audio.format, self.audio.bitrate_kbps);
        println!("  Chunk Limit: {} MB", self.transcription.max_chunk_mb);
        println!(
            "  Retries: {} attempts, {}s apart",
            self.transcription.max_attempts, self.transcription.retry_delay_secs
        );
        println!("  Audio Dir: {}", self.paths.audio_dir.display());
        println!("  Chunk Dir: {}", self.paths.chunk_dir.display());
        println!("  Transcript Dir: {}", self.paths.transcript_dir.display());
    }
}
