use anyhow::Result;
use clap::Parser;
use console::style;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use batch_transcriptor::cli::{Cli, Commands, LogFormat};
use batch_transcriptor::config::{BackendKind, Config};
use batch_transcriptor::pipeline::{run_batch, BatchProgress, BatchReport, JobOutcome, JobPipeline};
use batch_transcriptor::transcribe::TranscriptionStrategy;
use batch_transcriptor::utils;

fn init_tracing(verbose: bool, format: LogFormat) {
    let default_filter = if verbose {
        "batch_transcriptor=debug,transcriptor=debug"
    } else {
        "batch_transcriptor=info,transcriptor=info"
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_filter.into());

    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Text => registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init(),
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.log_format);

    match cli.command {
        Commands::Run {
            references,
            config,
            backend,
            concurrency,
        } => {
            let mut config = Config::load(config.as_deref()).await?;
            config.videos.extend(references);
            if let Some(backend) = backend {
                config.backend = backend;
            }
            if let Some(concurrency) = concurrency {
                config.concurrency = concurrency;
            }
            config.validate()?;

            // Credentials are checked before anything touches the network
            let api_key = config.api_key()?;

            // Check for required external dependencies (non-fatal)
            let missing_deps = utils::check_dependencies().await;
            if !missing_deps.is_empty() {
                eprintln!("{}  Dependency check warnings:", style("⚠️").yellow());
                for dep in missing_deps {
                    eprintln!("   • {}", dep);
                }
                eprintln!("   (Continuing anyway - tools may be available)");
            }

            if config.videos.is_empty() {
                println!("No videos configured. Add URLs under `videos:` in the config file or pass them as arguments.");
                return Ok(());
            }

            config.ensure_directories()?;

            let strategy = TranscriptionStrategy::from_config(&config, api_key);
            let pipeline = Arc::new(JobPipeline::from_config(&config, strategy));
            let progress = if cli.quiet {
                BatchProgress::hidden()
            } else {
                BatchProgress::new(config.videos.len())
            };

            tracing::info!("Starting batch with the {} backend", config.backend);
            let started = std::time::Instant::now();
            let report = run_batch(pipeline, config.videos.clone(), config.concurrency, progress).await;

            print_summary(&report, started.elapsed().as_secs_f64());
        }
        Commands::Config { config, show } => {
            let path = match config {
                Some(path) => path,
                None => Config::config_path()?,
            };
            let loaded = Config::load(Some(&path)).await;
            match loaded {
                Ok(loaded) if show => loaded.display(),
                Ok(_) => println!("Configuration file: {}", path.display()),
                Err(e) if !path.exists() => {
                    println!("No configuration file at {} ({})", path.display(), e);
                    println!("Run `transcriptor run` once to create one with defaults.");
                }
                Err(e) => return Err(e),
            }
        }
        Commands::Backends => {
            println!("Supported transcription backends:");
            for backend in [BackendKind::Whisper, BackendKind::AssemblyAi] {
                println!(
                    "  • {} - {} (needs {})",
                    backend,
                    backend.description(),
                    backend.credential_var()
                );
            }
        }
    }

    Ok(())
}

fn print_summary(report: &BatchReport, elapsed: f64) {
    for job in &report.jobs {
        match &job.outcome {
            JobOutcome::Completed {
                transcript,
                segments,
                empty_segments,
            } => {
                let note = if *empty_segments > 0 {
                    format!(" ({} of {} segments empty)", empty_segments, segments)
                } else {
                    String::new()
                };
                println!("{} {} -> {}{}", style("✓").green(), job.reference, transcript.display(), note);
            }
            JobOutcome::Skipped { transcript } => {
                println!("{} {} (already at {})", style("-").dim(), job.reference, transcript.display());
            }
            JobOutcome::Failed(e) => {
                println!("{} {}: {}", style("✗").red(), job.reference, e);
            }
        }
    }

    println!(
        "Finished in {}: {} completed, {} skipped, {} failed",
        utils::format_duration(elapsed),
        report.completed(),
        report.skipped(),
        report.failed()
    );
}
