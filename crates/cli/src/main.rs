//! BrainVibe CLI - brainvibe command

use anyhow::Result;
use bv_core::TrackOverrides;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod cmd;

/// BrainVibe - learn from the code you write
#[derive(Parser)]
#[command(name = "brainvibe")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Track file changes and send them for analysis
    Track {
        /// Project directory (default: current directory)
        #[arg(short, long)]
        path: Option<PathBuf>,

        /// Ceiling interval in milliseconds (default: 120000)
        #[arg(short, long)]
        interval: Option<u64>,

        /// Custom ignore file (default: .brainvibeignore)
        #[arg(long)]
        ignore_file: Option<PathBuf>,

        /// Override the API base URL from the project config
        #[arg(long)]
        api_url: Option<String>,

        /// Analyze the current working tree once and exit
        #[arg(long)]
        one_shot: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Track {
            path,
            interval,
            ignore_file,
            api_url,
            one_shot,
        } => {
            let overrides = TrackOverrides {
                ceiling_ms: interval,
                ignore_file,
                api_url,
            };
            cmd::track::run(path, overrides, one_shot).await
        }
    }
}
