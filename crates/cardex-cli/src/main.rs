mod cli;
mod logging;

use std::path::{Path, PathBuf};
use std::process;
use std::time::Duration;

use cardex::{
    load_config, CardError, CardService, ConfigError, RawImage, SetupError, Submission,
};
use clap::Parser;
use serde::Serialize;
use serde_json::json;
use thiserror::Error;
use tracing::{debug, info};

use crate::cli::{Cli, Commands, SubmitArgs};

#[derive(Debug, Error)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Setup failed: {0}")]
    Setup(#[from] SetupError),

    #[error("{0}")]
    Card(#[from] CardError),

    #[error("Failed to read image '{path}': {source}")]
    ReadImage {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to encode output: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Card {id} was stored as failed ({kind}): {message}")]
    ProcessingFailed {
        id: String,
        kind: String,
        message: String,
    },
}

fn print_json<T: Serialize>(value: &T) -> Result<(), CliError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

async fn read_images(paths: &[PathBuf]) -> Result<Vec<RawImage>, CliError> {
    let mut images = Vec::with_capacity(paths.len());
    for path in paths {
        let data = tokio::fs::read(path)
            .await
            .map_err(|source| CliError::ReadImage {
                path: path.clone(),
                source,
            })?;
        let content_type = mime_guess::from_path(path)
            .first_or_octet_stream()
            .essence_str()
            .to_string();
        debug!(file = %path.display(), content_type = %content_type, bytes = data.len(), "Read image");
        images.push(RawImage::new(file_name_of(path), content_type, data));
    }
    Ok(images)
}

/// Prints the stored card, then turns a recorded extraction failure into a
/// non-zero exit.
fn report_outcome(outcome: cardex::Outcome) -> Result<(), CliError> {
    print_json(&outcome.card)?;
    match outcome.failure {
        None => Ok(()),
        Some(failure) => Err(CliError::ProcessingFailed {
            id: outcome.card.id,
            kind: failure.kind().to_string(),
            message: failure.to_string(),
        }),
    }
}

async fn submit(
    service: &CardService,
    args: SubmitArgs,
    max_image_bytes: u64,
) -> Result<(), CliError> {
    let images = read_images(&args.files).await?;
    cardex::validate_upload(&images, max_image_bytes)?;

    let submission = Submission::new(images)
        .with_observation(args.observation)
        .with_user(args.user);
    let outcome = service.submit(submission).await?;
    report_outcome(outcome)
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let config = load_config(&cli.config)?;
    logging::init(&config.logging, cli.verbose);
    info!(config = %cli.config.display(), "Configuration loaded");

    let service = CardService::from_config(&config)?;

    match cli.command {
        Commands::Submit(args) => submit(&service, args, config.upload.max_image_bytes).await,
        Commands::Retry(args) => report_outcome(service.retry(&args.id).await?),
        Commands::Get(args) => {
            if args.images {
                print_json(&service.get_with_images(&args.id).await?)
            } else {
                print_json(&service.get(&args.id).await?)
            }
        }
        Commands::List(args) => {
            let cards = match args.status {
                Some(status) => service.list_by_status(status).await?,
                None => service.list_all().await?,
            };
            print_json(&cards)
        }
        Commands::Observe(args) => print_json(&service.update_observation(&args.id, args.text).await?),
        Commands::Urls(args) => {
            let urls = service
                .image_urls(&args.id, Duration::from_secs(args.ttl_secs))
                .await?;
            print_json(&urls)
        }
    }
}

fn error_json(err: &CliError) -> serde_json::Value {
    match err {
        CliError::Card(card_err) => json!({ "error": card_err.kind(), "message": card_err.to_string() }),
        CliError::ProcessingFailed { id, kind, message } => {
            json!({ "error": kind, "id": id, "message": message })
        }
        other => json!({ "error": "cli", "message": other.to_string() }),
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(err) = run(cli).await {
        eprintln!("Error: {err}");
        if let Ok(body) = serde_json::to_string(&error_json(&err)) {
            eprintln!("{body}");
        }
        process::exit(1);
    }
}
