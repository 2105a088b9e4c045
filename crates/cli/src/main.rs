//! Command-line front end for the stash write path.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use figment::Figment;
use figment::providers::{Env, Format, Toml};
use stash_core::{FILES_DOC_TYPE, FileRecord, StashConfig, UploadRequest};
use stash_files::{FileUploader, VerifyStatus, parse_declared_digest};
use stash_metadata::DocumentStoreExt;
use std::path::{Path, PathBuf};
use tokio::io::AsyncRead;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// stash - personal cloud file storage
#[derive(Parser, Debug)]
#[command(name = "stash")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, env = "STASH_CONFIG", default_value = "stash.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Upload a file and print its record
    Upload {
        /// File to upload, or `-` to read stdin
        file: PathBuf,
        /// Stored file name (defaults to the source file name)
        #[arg(long)]
        name: Option<String>,
        /// Parent folder identifier
        #[arg(long, default_value = "")]
        folder: String,
        /// Tag to attach (repeatable)
        #[arg(long = "tag")]
        tags: Vec<String>,
        /// Mark the file executable
        #[arg(long, default_value_t = false)]
        executable: bool,
        /// Expected MD5 of the content, hex or base64
        #[arg(long, default_value = "")]
        md5: String,
    },
    /// Check stored content against its record
    Verify {
        /// File record identifier (with or without the doctype prefix)
        id: String,
    },
    /// Print a file record
    Show {
        /// File record identifier (with or without the doctype prefix)
        id: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = load_config(&cli.config)?;
    let uploader = build_uploader(&config).await?;

    match cli.command {
        Commands::Upload {
            file,
            name,
            folder,
            tags,
            executable,
            md5,
        } => {
            let name = upload_name(&file, name)?;
            let request = UploadRequest::file(name)
                .in_folder(folder)
                .with_tags(tags)
                .executable(executable)
                .with_declared_digest(parse_declared_digest(&md5)?);

            let body = open_body(&file).await?;
            let record = uploader
                .create_file_and_upload(&request, body)
                .await
                .with_context(|| format!("failed to upload {}", file.display()))?;
            print_record(&record)?;
        }
        Commands::Verify { id } => {
            let record = load_record(&uploader, &id).await?;
            let report = uploader
                .verify(&record)
                .await
                .context("failed to read stored content")?;
            match report.status {
                VerifyStatus::Intact => println!("{}: ok", report.id),
                VerifyStatus::NotFound => {
                    anyhow::bail!("{}: content missing at {}", report.id, report.path)
                }
                VerifyStatus::Corrupted {
                    expected,
                    actual,
                    expected_size,
                    actual_size,
                } => anyhow::bail!(
                    "{}: content corrupted (md5 {actual}, expected {expected}; \
                     {actual_size} bytes, expected {expected_size})",
                    report.id
                ),
            }
        }
        Commands::Show { id } => {
            let record = load_record(&uploader, &id).await?;
            print_record(&record)?;
        }
    }

    Ok(())
}

/// Load configuration from an optional TOML file overlaid with `STASH_` env vars.
fn load_config(path: &Path) -> Result<StashConfig> {
    let mut figment = Figment::new();

    if path.exists() {
        tracing::debug!(config_path = %path.display(), "Loading configuration from file");
        figment = figment.merge(Toml::file(path));
    } else {
        tracing::debug!(config_path = %path.display(), "No config file, using defaults");
    }

    let config: StashConfig = figment
        .merge(Env::prefixed("STASH_").ignore(&["config"]).split("__"))
        .extract()
        .context("failed to load configuration")?;
    config.validate().context("invalid configuration")?;
    Ok(config)
}

async fn build_uploader(config: &StashConfig) -> Result<FileUploader> {
    let content = stash_storage::from_config(&config.storage)
        .await
        .context("failed to initialize content store")?;
    content
        .health_check()
        .await
        .context("content store health check failed")?;

    let documents = stash_metadata::from_config(&config.metadata)
        .await
        .context("failed to initialize document store")?;

    tracing::debug!(
        backend = content.backend_name(),
        namespace = %config.upload.namespace,
        "Stores ready"
    );
    Ok(FileUploader::new(content, documents, &config.upload))
}

fn upload_name(file: &Path, name: Option<String>) -> Result<String> {
    if let Some(name) = name {
        return Ok(name);
    }
    if file == Path::new("-") {
        anyhow::bail!("--name is required when reading from stdin");
    }
    file.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .with_context(|| format!("cannot derive a file name from {}", file.display()))
}

async fn open_body(file: &Path) -> Result<Box<dyn AsyncRead + Unpin + Send>> {
    if file == Path::new("-") {
        return Ok(Box::new(tokio::io::stdin()));
    }
    let f = tokio::fs::File::open(file)
        .await
        .with_context(|| format!("failed to open {}", file.display()))?;
    Ok(Box::new(f))
}

fn qualified_id(id: &str) -> String {
    if id.contains('/') {
        id.to_string()
    } else {
        format!("{FILES_DOC_TYPE}/{id}")
    }
}

async fn load_record(uploader: &FileUploader, id: &str) -> Result<FileRecord> {
    let id = qualified_id(id);
    uploader
        .document_store()
        .get_doc::<FileRecord>(FILES_DOC_TYPE, &id)
        .await
        .with_context(|| format!("failed to load {id}"))?
        .with_context(|| format!("no file record {id}"))
}

fn print_record(record: &FileRecord) -> Result<()> {
    let json = serde_json::to_string_pretty(record).context("failed to encode record")?;
    println!("{json}");
    Ok(())
}
