use std::{process::ExitCode, sync::Arc};

use anyhow::{Context, anyhow};
use clap::Parser;
use folder_to_s3::{
    FolderUpload, RunOutcome, UploadConfig,
    cli::Cli,
    client::S3ClientBuilder,
    error::EXIT_FATAL,
    folder::exit_status,
    util::progress::{ProgressFactory, ProgressReporter},
};
use tracing_subscriber::EnvFilter;

fn init_tracing() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stdout)
        .try_init()
        .map_err(|e| anyhow!(e))
        .context("failed to install the tracing subscriber")
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    if let Err(err) = init_tracing() {
        eprintln!("{err:#}");
        return ExitCode::from(EXIT_FATAL);
    }

    let config = match UploadConfig::try_from(&cli) {
        Ok(config) => config,
        Err(err) => {
            tracing::error!("{}", err);
            return ExitCode::from(err.exit_code());
        }
    };
    let store = S3ClientBuilder::new(config.region.as_str())
        .with_endpoint_url(cli.endpoint_url.clone())
        .with_path_style(cli.path_style)
        .build_store()
        .await;
    let progress: ProgressFactory = if cli.no_progress {
        ProgressReporter::quiet_for_file
    } else {
        ProgressReporter::for_file
    };

    let upload = FolderUpload::new(config, Arc::new(store)).with_progress(progress);
    let result = upload.run().await;
    println!();
    match &result {
        Ok(RunOutcome::Completed { uploaded }) => {
            tracing::info!("Uploaded {} files", uploaded);
        }
        Ok(RunOutcome::Aborted {
            cause,
            uploaded,
            skipped,
        }) => {
            tracing::warn!(
                "Upload aborted ({}); {} uploaded files removed, {} never started",
                cause,
                uploaded,
                skipped
            );
        }
        Err(err) => tracing::error!("{}", err),
    }
    ExitCode::from(exit_status(&result))
}
