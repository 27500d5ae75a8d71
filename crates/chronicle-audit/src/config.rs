//! Runtime configuration.
//!
//! Configuration is loaded from YAML. Every field has a default, so an empty
//! document yields the standard asset and page pipelines writing to the
//! tracing sink.
//!
//! ```yaml
//! line_format: text
//! sweep_interval_secs: 60
//! sinks:
//!   - type: tracing
//!   - type: file
//!     path: /var/log/chronicle/audit.log
//! pipelines:
//!   - name: assets
//!     rule:
//!       required_prefix: /content/dam/
//!       excluded_substrings: [/jcr:content, /renditions, /metadata, /related]
//!       require_file_extension: true
//!     labels:
//!       created: ASSET CREATED
//!     debounce_window_ms: 2000
//! ```

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chronicle_core::{Validate, ValidationError, ValidationErrors};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::format::LineFormat;
use crate::logger::{LoggerError, SinkConfig};
use crate::pipeline::PipelineConfig;

/// Default interval between debounce store sweeps.
pub const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 60;

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("Failed to read config file {path}: {source}")]
    Io {
        /// File path.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The document is not valid YAML for this schema.
    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),

    /// The document parsed but failed validation.
    #[error("Invalid config: {0}")]
    Invalid(#[from] ValidationErrors),

    /// A configured sink could not be opened.
    #[error("Failed to open sink: {0}")]
    Sink(#[from] LoggerError),
}

/// Top-level audit configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditConfig {
    /// Rendering of emitted lines.
    pub line_format: LineFormat,

    /// Seconds between debounce store sweeps.
    pub sweep_interval_secs: u64,

    /// Output sinks. Every pipeline writes to all of them.
    pub sinks: Vec<SinkConfig>,

    /// Pipeline instances.
    pub pipelines: Vec<PipelineConfig>,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            line_format: LineFormat::Text,
            sweep_interval_secs: DEFAULT_SWEEP_INTERVAL_SECS,
            sinks: vec![SinkConfig::Tracing],
            pipelines: vec![PipelineConfig::assets(), PipelineConfig::pages()],
        }
    }
}

impl AuditConfig {
    /// Parses and validates a YAML document.
    ///
    /// # Errors
    ///
    /// Returns an error if the document does not parse or fails validation.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a YAML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, does not parse or fails
    /// validation.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&yaml)
    }

    /// Serializes the configuration to YAML.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Returns the sweep interval.
    #[must_use]
    pub const fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

impl Validate for AuditConfig {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if self.sweep_interval_secs == 0 {
            errors.add(ValidationError::range(
                "sweep_interval_secs",
                "must be greater than 0",
            ));
        }

        if self.pipelines.is_empty() {
            errors.add(ValidationError::empty("pipelines"));
        }

        let mut names = HashSet::new();
        for (index, pipeline) in self.pipelines.iter().enumerate() {
            let field = format!("pipelines[{index}]");
            if !names.insert(pipeline.name.as_str()) {
                errors.add(ValidationError::constraint(
                    format!("{field}.name"),
                    format!("duplicate pipeline name '{}'", pipeline.name),
                ));
            }
            if let Err(nested) = pipeline.validate() {
                errors.merge_nested(&field, nested);
            }
        }

        for (index, sink) in self.sinks.iter().enumerate() {
            if let SinkConfig::File { path } = sink {
                if path.as_os_str().is_empty() {
                    errors.add(ValidationError::required(format!("sinks[{index}].path")));
                }
            }
        }

        errors.into_result()
    }
}
