//! CLI entry point for the media exporter.

use std::io::{self, IsTerminal, Read};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use media_export::{ExportConfig, Exporter, HttpClient, LocalDisk};
use tracing::{debug, info, warn};

mod cli;

use cli::Args;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    // Priority: RUST_LOG env var > quiet flag > verbose flag > default (info)
    let default_level = if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    debug!(?args, "CLI arguments parsed");

    let base_config = match &args.config {
        Some(path) => ExportConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => ExportConfig::default(),
    };
    let config = args.apply(base_config);

    let input_text = if let Some(path) = args.input_path() {
        tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("failed to read {}", path.display()))?
    } else {
        if io::stdin().is_terminal() {
            info!("No input provided. Pipe an exported JSON document via stdin or pass a path.");
            info!("Example: media-export --source airtable base.json");
            return Ok(ExitCode::SUCCESS);
        }
        let mut buffer = String::new();
        io::stdin()
            .read_to_string(&mut buffer)
            .context("failed to read document from stdin")?;
        buffer
    };

    let document: serde_json::Value =
        serde_json::from_str(&input_text).context("input is not valid JSON")?;

    let client = HttpClient::new().context("failed to build HTTP client")?;
    let exporter = Exporter::new(config, Arc::new(client), Arc::new(LocalDisk))?;

    info!(source = ?exporter.config().source, "Export starting");
    let report = exporter.run(&document).await?;

    info!(
        downloaded = report.summary.downloaded,
        skipped = report.summary.skipped,
        failed = report.summary.failed,
        total = report.summary.total(),
        path = %report.data_path.display(),
        "Export complete"
    );

    if report.summary.failed > 0 {
        warn!(
            failed = report.summary.failed,
            "some media could not be downloaded; their references point at missing files"
        );
        return Ok(ExitCode::from(1));
    }
    Ok(ExitCode::SUCCESS)
}
