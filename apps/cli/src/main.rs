//! Sluice command-line uploader.

mod app;
mod config;

use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "sluice")]
#[command(about = "Upload a file to object storage in parallel parts")]
#[command(version)]
pub struct Cli {
    /// File to upload
    pub file: PathBuf,

    /// Object name (defaults to the file name)
    #[arg(long)]
    pub name: Option<String>,

    /// MIME type of the file
    #[arg(long, default_value = "application/octet-stream")]
    pub content_type: String,

    /// Coordinator base URL (overrides config)
    #[arg(long)]
    pub coordinator: Option<String>,

    /// Owner id (overrides config)
    #[arg(long)]
    pub owner: Option<String>,

    /// Part size in MiB (overrides config)
    #[arg(long)]
    pub chunk_size_mb: Option<u64>,

    /// Parts in flight at once (overrides config)
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// Config file path (default: $SLUICE_CONFIG or the platform config dir)
    #[arg(long)]
    pub config: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let path = cli.config.clone().unwrap_or_else(config::config_path);
    let mut config = config::Config::load(&path)?;
    app::apply_overrides(&mut config, &cli);
    tracing::info!(
        path = %path.display(),
        coordinator = %config.coordinator_url,
        "configuration loaded"
    );

    let rt = tokio::runtime::Runtime::new()?;
    let location = rt.block_on(app::run(config, cli))?;

    println!("{location}");
    Ok(())
}
