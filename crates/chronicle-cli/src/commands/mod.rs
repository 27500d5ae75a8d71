//! CLI commands and argument parsing.

pub mod classify;
pub mod config;
pub mod replay;

use std::path::Path;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use chronicle_audit::AuditConfig;

/// Chronicle - Content lifecycle audit pipeline
#[derive(Parser)]
#[command(name = "chronicle")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands.
#[derive(Subcommand)]
pub enum Commands {
    /// Replay newline-delimited JSON events through the audit pipelines
    Replay(replay::ReplayArgs),

    /// Show which pipelines accept each path
    Classify(classify::ClassifyArgs),

    /// Print the default configuration or validate a configuration file
    Config(config::ConfigArgs),

    /// Print version information
    Version,
}

/// Loads the configuration file, or the built-in defaults when none is given.
pub fn load_config(path: Option<&Path>) -> Result<AuditConfig> {
    match path {
        Some(path) => {
            info!(path = %path.display(), "Loading configuration");
            AuditConfig::from_file(path)
                .with_context(|| format!("Failed to load configuration from {}", path.display()))
        }
        None => Ok(AuditConfig::default()),
    }
}
