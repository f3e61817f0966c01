use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::config::BackendKind;

#[derive(Parser)]
#[command(
    name = "transcriptor",
    about = "Batch Transcriptor - Turn a list of YouTube videos into text transcripts",
    version,
    long_about = "A CLI tool that downloads the audio of many videos in parallel, splits it when the speech-to-text API has a size limit, and saves one transcript per video. Supports OpenAI Whisper and AssemblyAI."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable progress indicators
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Log output format
    #[arg(long, value_enum, default_value = "text", global = true)]
    pub log_format: LogFormat,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Transcribe every configured video (plus any given on the command line)
    Run {
        /// Extra video URLs appended to the configured list
        #[arg(value_name = "URL")]
        references: Vec<String>,

        /// Configuration file (defaults to ./config.yaml or the user config directory)
        #[arg(short, long, value_name = "FILE", env = "TRANSCRIPTOR_CONFIG")]
        config: Option<PathBuf>,

        /// Override the configured transcription backend
        #[arg(short, long, value_enum)]
        backend: Option<BackendKind>,

        /// Override the number of videos processed at once
        #[arg(long, value_name = "COUNT")]
        concurrency: Option<usize>,
    },

    /// Show the configuration file and its current values
    Config {
        /// Configuration file (defaults to ./config.yaml or the user config directory)
        #[arg(short, long, value_name = "FILE", env = "TRANSCRIPTOR_CONFIG")]
        config: Option<PathBuf>,

        /// Show current configuration
        #[arg(short, long)]
        show: bool,
    },

    /// List supported transcription backends
    Backends,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogFormat {
    /// Human readable lines
    Text,
    /// One JSON object per line
    Json,
}

impl std::fmt::Display for LogFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogFormat::Text => write!(f, "text"),
            LogFormat::Json => write!(f, "json"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_run_parses_overrides() {
        let cli = Cli::try_parse_from([
            "transcriptor",
            "run",
            "https://youtu.be/abc",
            "--backend",
            "assemblyai",
            "--concurrency",
            "5",
        ])
        .unwrap();

        match cli.command {
            Commands::Run {
                references,
                backend,
                concurrency,
                ..
            } => {
                assert_eq!(references, vec!["https://youtu.be/abc".to_string()]);
                assert_eq!(backend, Some(BackendKind::AssemblyAi));
                assert_eq!(concurrency, Some(5));
            }
            _ => panic!("expected run command"),
        }
    }
}
