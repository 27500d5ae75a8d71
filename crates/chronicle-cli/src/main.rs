//! Chronicle CLI - Command-line interface for the Chronicle content audit pipeline.

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

use commands::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing on stderr
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "chronicle=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Replay(args) => commands::replay::execute(args).await,
        Commands::Classify(args) => commands::classify::run(&args),
        Commands::Config(args) => commands::config::run(&args),
        Commands::Version => {
            println!("chronicle {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}
