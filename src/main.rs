mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use overhead::config::Config;
use overhead::log_format::TargetFirstFormat;
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "overhead")]
#[command(about = "Log and classify the aircraft flying overhead")]
#[command(version = overhead::actions::version())]
struct Cli {
    /// TOML configuration file; environment variables override its values
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Poll the feed, merge events, sweep labels, and serve the API
    Run,
    /// Serve the read-only API without ingesting
    Serve,
    /// Recompute stored classification labels once and exit
    Reclassify {
        /// Recompute every event, not just those without a settled label
        #[arg(long)]
        all: bool,
    },
    /// Load the OpenFlights airports table
    LoadAirports {
        /// Read a local airports.dat instead of downloading it
        #[arg(long)]
        file: Option<PathBuf>,
    },
    /// Create or upgrade the database schema
    Migrate,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .event_format(TargetFirstFormat)
        .init();
}

async fn dispatch(cli: Cli) -> Result<()> {
    let config = Config::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Run => commands::handle_run(&config).await,
        Commands::Serve => commands::handle_serve(&config).await,
        Commands::Reclassify { all } => commands::handle_reclassify(&config, all).await,
        Commands::LoadAirports { file } => {
            commands::handle_load_airports(&config, file.as_deref()).await
        }
        Commands::Migrate => commands::handle_migrate(&config).await,
    }
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();
    info!("overhead {}", overhead::actions::version());

    if let Err(e) = dispatch(cli).await {
        error!("{:#}", e);
        std::process::exit(1);
    }
}
