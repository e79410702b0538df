// Command-line entry point for Kaizen Graph.

use anyhow::{Context, Result};
use clap::Parser;
use kaizen_graph::api::server;
use kaizen_graph::application::DeriveUsecase;
use kaizen_graph::config::EngineConfig;
use kaizen_graph::infrastructure::concurrency::init_thread_pool;
use kaizen_graph::infrastructure::{JsonExporter, SnapshotLoader};
use kaizen_graph::ports::dot_exporter::DotExporter;
use kaizen_graph::ports::{DerivationExporter, ExportFormat};
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Snapshot JSON file (can specify multiple)
    #[arg(short, long, required = false)]
    input: Vec<String>,

    /// Folder(s) scanned recursively for snapshot *.json files
    #[arg(short = 'd', long, required = false)]
    folder: Vec<String>,

    /// Output file path
    #[arg(short, long, required_unless_present = "serve")]
    output: Option<String>,

    /// Output format (json, dot)
    #[arg(short, long, default_value = "json")]
    format: String,

    /// Engine configuration (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Run the derivation server on this port instead of a one-shot export
    #[arg(long)]
    serve: Option<u16>,

    /// Debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().without_time())
        .init();

    if let Err(e) = run(cli) {
        error!("{:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = EngineConfig::load_or_default(cli.config.as_deref())
        .context("Failed to load engine configuration")?;

    if let Some(port) = cli.serve {
        return server::start_server(port, config);
    }

    if cli.input.is_empty() && cli.folder.is_empty() {
        anyhow::bail!("Please provide at least one --input <file> or --folder <dir>");
    }
    let output = cli
        .output
        .context("--output is required unless --serve is given")?;

    if let Err(e) = init_thread_pool() {
        info!("thread pool already initialized: {}", e);
    }

    let format = ExportFormat::parse(&cli.format)?;
    let exporter: &dyn DerivationExporter = match format {
        ExportFormat::Json => &JsonExporter,
        ExportFormat::Dot => &DotExporter,
    };
    let source = SnapshotLoader::new(cli.input, cli.folder);

    let usecase = DeriveUsecase {
        source: &source,
        exporter,
        config,
    };

    let count = usecase
        .run(&output)
        .with_context(|| format!("Failed to derive snapshots into {}", output))?;

    info!(
        "Derivation completed! {} snapshot(s) written to {} (format: {})",
        count, output, format
    );
    Ok(())
}
