use std::{path::PathBuf, time::Duration};

use anyhow::{Context, Result};
use clap::Parser;
use client_core::{ClientSettings, LocalFile, Workflow};
use tracing_subscriber::EnvFilter;

/// Uploads an image and prints the backend's prediction for it.
#[derive(Parser, Debug)]
struct Args {
    /// Image to upload; its file name becomes the object key.
    file: PathBuf,
    #[arg(long)]
    server_url: Option<String>,
    #[arg(long)]
    bucket: Option<String>,
    /// Fetch attempts for the prediction after a successful upload.
    #[arg(long)]
    fetch_attempts: Option<u32>,
    /// Seconds to wait for the prediction before giving up.
    #[arg(long, default_value_t = 30)]
    wait_secs: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();
    let args = Args::parse();

    let mut settings = ClientSettings::load().context("failed to load client settings")?;
    if let Some(server_url) = args.server_url {
        settings.server_url = server_url;
    }
    if let Some(bucket) = args.bucket {
        settings.bucket = bucket;
    }
    if let Some(attempts) = args.fetch_attempts {
        settings.fetch_attempts = attempts;
    }

    let file = LocalFile::from_path(&args.file)?;
    let workflow = Workflow::connect(&settings)?;
    workflow.select_file(file);

    let upload = workflow.upload().await;
    if let Some(status) = workflow.status_line() {
        println!("{status}");
    }
    if let Err(err) = upload {
        anyhow::bail!("upload failed: {err}");
    }

    let state = tokio::time::timeout(
        Duration::from_secs(args.wait_secs),
        workflow.settled(workflow.generation()),
    )
    .await
    .context("timed out waiting for a prediction")?;

    println!("{}", state.prediction_line());
    if let Some(err) = &state.last_error {
        eprintln!("prediction fetch failed: {err}");
    }
    if let Some(key) = &state.object_key {
        if key.as_str() != selected_name(&workflow) {
            eprintln!("note: prediction was computed for '{key}'");
        }
    }
    Ok(())
}

fn selected_name(workflow: &Workflow) -> String {
    workflow
        .selected_file()
        .map(|file| file.name.clone())
        .unwrap_or_default()
}
