mod api;
mod cache;
mod cli;
mod config;
mod error;
mod models;
mod services;
mod utils;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use crate::config::AppConfig;
use crate::models::Position;

#[derive(Parser)]
#[command(name = "fpl-scout")]
#[command(about = "Fantasy football player rankings and squad builder")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Refresh cached player and fixture data
    Fetch {
        /// Refetch even if the cache is fresh
        #[arg(short, long)]
        force: bool,
    },
    /// Print the ranked player table
    Rank {
        #[arg(short, long)]
        position: Option<Position>,
        #[arg(short, long, default_value = "25")]
        top: usize,
        /// Blend in past-season performance
        #[arg(long)]
        history: bool,
        /// Write the printed rows to a CSV file
        #[arg(short, long)]
        export: Option<PathBuf>,
    },
    /// Build a squad and split it into starters and bench.
    ///
    /// By default a player is only admitted if the remaining open slots can
    /// still be filled at the cheapest available prices; pass --no-reserve for
    /// the plain "fits the remaining budget" rule.
    Squad {
        /// Budget in tenths (1000 = 100.0)
        #[arg(short, long)]
        budget: Option<u32>,
        /// Player to favour; repeatable
        #[arg(long = "pin")]
        pins: Vec<String>,
        /// What to do with doubtful players
        #[arg(short, long, value_enum, default_value = "ignore")]
        availability: cli::AvailabilityMode,
        /// Shorthand for --availability prompt
        #[arg(short, long)]
        interactive: bool,
        /// Admit any player whose price fits the remaining budget, without reserving for open slots
        #[arg(long)]
        no_reserve: bool,
        #[arg(long)]
        history: bool,
        #[arg(short, long)]
        export: Option<PathBuf>,
    },
    /// Show one player's score breakdown
    Player {
        #[arg(short, long)]
        name: String,
        #[arg(long)]
        history: bool,
    },
    /// Start the API server
    Serve {
        #[arg(short, long, default_value = "3000")]
        port: u16,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenv::dotenv().ok();

    // Initialize tracing; logs go to stderr so tables stay clean
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let config = AppConfig::from_env()?;
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Fetch { force }) => {
            tracing::info!("Fetching data (force: {})", force);
            cli::fetch_data(&config, force).await?;
        }
        Some(Commands::Rank {
            position,
            top,
            history,
            export,
        }) => {
            cli::show_rankings(
                &config,
                cli::RankOptions {
                    position,
                    top,
                    history,
                    export,
                },
            )
            .await?;
        }
        Some(Commands::Squad {
            budget,
            pins,
            availability,
            interactive,
            no_reserve,
            history,
            export,
        }) => {
            let availability = if interactive {
                cli::AvailabilityMode::Prompt
            } else {
                availability
            };
            cli::build_squad(
                &config,
                cli::SquadOptions {
                    budget,
                    pins,
                    availability,
                    no_reserve,
                    history,
                    export,
                },
            )
            .await?;
        }
        Some(Commands::Player { name, history }) => {
            tracing::info!("Querying player: {}", name);
            cli::show_player(&config, &name, history).await?;
        }
        Some(Commands::Serve { port }) => {
            tracing::info!("Starting FPL Scout API server on port {}", port);
            api::serve(config, port).await?;
        }
        None => {
            // Default to serving
            tracing::info!("Starting FPL Scout API server on port 3000");
            api::serve(config, 3000).await?;
        }
    }

    Ok(())
}
