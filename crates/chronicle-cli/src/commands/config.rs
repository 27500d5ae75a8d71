//! Config command implementation.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use tracing::info;

use chronicle_audit::{AuditConfig, ConfigError};

/// Arguments for the config command.
#[derive(Args)]
pub struct ConfigArgs {
    /// Validate this configuration file instead of printing the defaults
    #[arg(long, value_name = "FILE")]
    pub validate: Option<PathBuf>,
}

/// Runs the config command.
pub fn run(args: &ConfigArgs) -> Result<()> {
    let Some(path) = &args.validate else {
        print!("{}", AuditConfig::default().to_yaml()?);
        return Ok(());
    };

    info!(path = %path.display(), "Validating configuration");

    println!("Chronicle Config Validator");
    println!("==========================");
    println!("Path: {}", path.display());
    println!();

    match AuditConfig::from_file(path) {
        Ok(config) => {
            for pipeline in &config.pipelines {
                println!(
                    "✓ {} (prefix {}, window {}ms)",
                    pipeline.name, pipeline.rule.required_prefix, pipeline.debounce_window_ms
                );
            }
            println!("\n✓ Configuration is valid");
            Ok(())
        }
        Err(ConfigError::Invalid(errors)) => {
            for error in errors.iter() {
                println!("✗ {}: {}", error.field, error.message);
            }
            anyhow::bail!("{} validation errors", errors.len())
        }
        Err(e) => Err(e.into()),
    }
}
