use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use colored::*;
use log::debug;

use velosync_cli::config::ConfigManager;
use velosync_cli::{build_processor, server};
use velosync_core::RunSummary;

#[derive(Parser)]
#[command(name = "velosync")]
#[command(author, version, about = "Transfer Zwift activities to Garmin Connect", long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    /// Use a specific config file instead of the default location
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Transfer the most recent activity
    Latest,

    /// Transfer the N most recent activities
    Last {
        /// How many activities to transfer, newest first
        count: usize,
    },

    /// Transfer every activity recorded after a date
    Since {
        /// Cutoff date, activities starting strictly later are transferred
        #[arg(value_name = "YYYY-MM-DD")]
        date: NaiveDate,
    },

    /// Run the HTTP trigger endpoint (GET /sync_latest)
    Serve {
        /// Port to listen on
        #[arg(long, default_value_t = 8080)]
        port: u16,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(if cli.debug { "debug" } else { "info" }),
    )
    .init();

    match run(cli).await {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("{}: {e:#}", "Error".red());
            std::process::exit(1);
        }
    }
}

async fn run(cli: Cli) -> Result<bool> {
    let manager = match cli.config {
        Some(path) => ConfigManager::with_path(path),
        None => ConfigManager::new(),
    };
    let config = manager.load()?;
    debug!("Scratch directory: {}", config.paths.scratch_dir.display());

    let processor = build_processor(&config)?;

    let summary = match cli.command {
        Commands::Latest => processor.process_latest_activity().await,
        Commands::Last { count } => processor.process_last_activities(count).await,
        Commands::Since { date } => processor.process_activities_since(date).await,
        Commands::Serve { port } => {
            // The listener loop only returns by error.
            server::serve(Arc::new(processor), port).await?;
            return Ok(true);
        }
    };

    report(&summary);
    Ok(summary.is_success())
}

fn report(summary: &RunSummary) {
    if summary.is_success() {
        println!(
            "{} {} transferred, {} already present ({} selected)",
            "✓".green(),
            summary.transferred,
            summary.duplicates,
            summary.selected
        );
    } else {
        let detail = summary.failure.as_deref().unwrap_or("unknown failure");
        println!(
            "{} transfer failed after {} of {}: {detail}",
            "✗".red(),
            summary.transferred + summary.duplicates,
            summary.selected
        );
    }
}
