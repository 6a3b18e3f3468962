//! cloudsub command line entry point

use anyhow::{Context, Result};
use clap::Parser;
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info, Level};
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::{
    filter::filter_fn, fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer,
};

use cloudsub::auth::{ServiceAccountAuth, ServiceAccountKey, TokenSource};
use cloudsub::cli::Args;
use cloudsub::config::Config;
use cloudsub::media::FfmpegExtractor;
use cloudsub::pipeline::Pipeline;
use cloudsub::recognition::google::GoogleSpeechClient;
use cloudsub::storage::GcsStorage;

const DEFAULT_CONFIG_FILE: &str = "cloudsub.toml";
/// Events under this target are written to the log file only
const FILE_ONLY_TARGET: &str = "cloudsub::file_only";

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    if let Err(e) = setup_logging(args.verbose) {
        eprintln!("Warning: failed to set up file logging: {:#}", e);
    }

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(target: FILE_ONLY_TARGET, "{:#}", e);
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<()> {
    info!("Starting cloudsub");

    // Load configuration
    let config = match &args.config {
        Some(config_path) => Config::from_file(config_path)?,
        None => {
            if Path::new(DEFAULT_CONFIG_FILE).exists() {
                info!("Found {} in current directory, loading...", DEFAULT_CONFIG_FILE);
                Config::from_file(DEFAULT_CONFIG_FILE)?
            } else {
                Config::default()
            }
        }
    };

    let key = ServiceAccountKey::from_file(&args.credentials).with_context(|| {
        format!("Cannot load credentials from {}", args.credentials.display())
    })?;

    let client = reqwest::Client::builder()
        .user_agent(concat!("cloudsub/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("Failed to build HTTP client")?;
    let auth = ServiceAccountAuth::new(key, client.clone())?;
    info!("Authenticating as {}", auth.client_email());
    let auth: Arc<dyn TokenSource> = Arc::new(auth);

    let extractor = FfmpegExtractor::new(config.media.clone());
    let store = GcsStorage::new(config.storage.clone(), client.clone(), auth.clone());
    let recognizer = GoogleSpeechClient::new(
        config.recognition.clone(),
        config.segmentation.clone(),
        config.media.sample_rate,
        config.media.channels,
        client,
        auth,
    );

    let job = args.job_config();
    let pipeline = Pipeline::new(Box::new(extractor), Box::new(store), Box::new(recognizer))
        .with_progress(!args.no_progress);

    let output = pipeline.run(&job).await?;
    println!("Subtitles saved to {}", output.display());
    Ok(())
}

fn setup_logging(verbose: bool) -> Result<()> {
    // Create log directory
    let log_dir = std::env::current_dir()?.join(".cloudsub").join("log");
    std::fs::create_dir_all(&log_dir)?;

    // Set up file appender with daily rotation
    let file_appender = rolling::daily(&log_dir, "cloudsub.log");
    let (non_blocking_file, guard) = non_blocking(file_appender);
    // Keep the guard alive for the duration of the program
    std::mem::forget(guard);

    let log_level = if verbose { Level::DEBUG } else { Level::INFO };

    // Console output stays short so it does not fight with the spinners
    let console_layer = fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_filter(filter_fn(|metadata| shown_on_console(metadata.target())));

    let file_layer = fmt::layer()
        .with_writer(non_blocking_file)
        .with_target(false)
        .with_thread_ids(true)
        .with_thread_names(true)
        .with_file(true)
        .with_line_number(true)
        .with_ansi(false); // No ANSI colors in file

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(log_level.into()))
        .with(console_layer)
        .with(file_layer)
        .try_init()?;

    Ok(())
}

fn shown_on_console(target: &str) -> bool {
    target != FILE_ONLY_TARGET
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_final_error_is_not_echoed_on_console() {
        assert!(!shown_on_console(FILE_ONLY_TARGET));
        assert!(shown_on_console("cloudsub::pipeline"));
        assert!(shown_on_console("cloudsub"));
    }
}
