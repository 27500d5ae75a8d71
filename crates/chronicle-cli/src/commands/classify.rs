//! Classify command implementation.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;

use chronicle_audit::AuditConfig;

/// Arguments for the classify command.
#[derive(Args)]
pub struct ClassifyArgs {
    /// Repository paths to classify
    #[arg(required = true)]
    pub paths: Vec<String>,

    /// Configuration file (defaults to the asset and page pipelines)
    #[arg(short, long, env = "CHRONICLE_CONFIG")]
    pub config: Option<PathBuf>,
}

/// Runs the classify command.
pub fn run(args: &ClassifyArgs) -> Result<()> {
    let config = super::load_config(args.config.as_deref())?;

    for path in &args.paths {
        println!("{path}");
        for (name, accepted) in classify(&config, path) {
            let mark = if accepted { "✓" } else { "✗" };
            println!("  {mark} {name}");
        }
    }
    Ok(())
}

/// Returns each pipeline's verdict on `path`, in configuration order.
fn classify<'a>(config: &'a AuditConfig, path: &str) -> Vec<(&'a str, bool)> {
    config
        .pipelines
        .iter()
        .map(|pipeline| (pipeline.name.as_str(), pipeline.rule.accept(path)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_default_pipelines() {
        let config = AuditConfig::default();

        assert_eq!(
            classify(&config, "/content/dam/app/photo.jpg"),
            vec![("assets", true), ("pages", true)]
        );
        assert_eq!(
            classify(&config, "/content/dam/app/folder"),
            vec![("assets", false), ("pages", true)]
        );
        assert_eq!(
            classify(&config, "/content/site/en/jcr:content"),
            vec![("assets", false), ("pages", false)]
        );
    }
}
