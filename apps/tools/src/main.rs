use std::{fs, path::PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use shared::{
    domain::{BucketName, ObjectKey, DEFAULT_BUCKET, DEFAULT_CONTENT_TYPE},
    protocol::StoredObjectSummary,
};
use storage::Storage;

#[derive(Parser, Debug)]
struct Cli {
    #[arg(long, default_value = "sqlite://./data/objects.db")]
    database_url: String,
    #[arg(long, default_value = DEFAULT_BUCKET)]
    bucket: String,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Lists objects, most recent first.
    List,
    /// Shows the object the prediction endpoint would classify.
    Latest,
    /// Stores a file directly, bypassing the HTTP server.
    Put {
        path: PathBuf,
        #[arg(long)]
        key: Option<String>,
        #[arg(long)]
        content_type: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let storage = Storage::new(&cli.database_url).await?;
    let bucket = BucketName::new(cli.bucket);

    match cli.command {
        Command::List => {
            let objects = storage.list_objects(&bucket).await?;
            if objects.is_empty() {
                println!("bucket '{bucket}' is empty");
            }
            for object in &objects {
                print_summary(object);
            }
        }
        Command::Latest => match storage.latest_object(&bucket).await? {
            Some(object) => print_summary(&object.summary),
            None => println!("bucket '{bucket}' is empty"),
        },
        Command::Put {
            path,
            key,
            content_type,
        } => {
            let body =
                fs::read(&path).with_context(|| format!("failed to read '{}'", path.display()))?;
            let key = match key {
                Some(key) => key,
                None => path
                    .file_name()
                    .and_then(|name| name.to_str())
                    .map(str::to_string)
                    .with_context(|| format!("'{}' has no file name", path.display()))?,
            };
            let content_type = content_type.unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string());
            let summary = storage
                .put_object(&bucket, &ObjectKey::new(key), &content_type, &body)
                .await?;
            print_summary(&summary);
        }
    }

    Ok(())
}

fn print_summary(object: &StoredObjectSummary) {
    println!(
        "rev={} {}/{} {} bytes {} stored_at={}",
        object.revision,
        object.bucket,
        object.key,
        object.size_bytes,
        object.content_type,
        object.stored_at.to_rfc3339()
    );
}
