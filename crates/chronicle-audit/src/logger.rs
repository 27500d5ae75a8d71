//! Audit line sinks.
//!
//! A sink receives fully formatted audit lines. Delivery is fire-and-forget
//! from the pipeline's point of view: a failing sink is reported through
//! `tracing` and counted, never propagated back to the event source.

use std::fmt::Debug;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{error, info};

/// Destination for formatted audit lines.
pub trait AuditSink: Send + Sync + Debug {
    /// Writes one audit line.
    ///
    /// # Errors
    ///
    /// Returns an error if the line cannot be written.
    fn log(&self, line: &str) -> Result<(), LoggerError>;

    /// Flushes any buffered lines.
    ///
    /// # Errors
    ///
    /// Returns an error if the flush operation fails.
    fn flush(&self) -> Result<(), LoggerError>;

    /// Returns the sink name for identification.
    fn name(&self) -> &'static str;
}

/// Errors that can occur while writing audit lines.
#[derive(Debug, thiserror::Error)]
pub enum LoggerError {
    /// Serialization error
    #[error("Failed to serialize audit record: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A file sink could not be opened
    #[error("Failed to open audit file {path}: {source}")]
    Open {
        /// Path of the audit file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Sink-specific error
    #[error("Sink error: {0}")]
    Sink(String),
}

/// Sink configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SinkConfig {
    /// Emit lines as `tracing` events.
    Tracing,
    /// Write lines to standard output.
    Stdout,
    /// Append lines to a file.
    File {
        /// Path of the audit file.
        path: PathBuf,
    },
}

/// Creates a single sink from a list of sink configurations.
///
/// An empty list yields a [`TracingSink`]; several entries are combined in a
/// [`MultiSink`].
///
/// # Errors
///
/// Returns an error if a file sink cannot be opened.
pub fn create_sink(configs: &[SinkConfig]) -> Result<Arc<dyn AuditSink>, LoggerError> {
    let mut sinks: Vec<Arc<dyn AuditSink>> = Vec::with_capacity(configs.len());

    for config in configs {
        let sink: Arc<dyn AuditSink> = match config {
            SinkConfig::Tracing => Arc::new(TracingSink::new()),
            SinkConfig::Stdout => Arc::new(StdoutSink::new()),
            SinkConfig::File { path } => Arc::new(FileSink::open(path)?),
        };
        sinks.push(sink);
    }

    Ok(match sinks.len() {
        0 => Arc::new(TracingSink::new()),
        1 => sinks.remove(0),
        _ => Arc::new(MultiSink::new(sinks)),
    })
}

/// Sink that emits each line as an `info` level `tracing` event.
#[derive(Debug, Default)]
pub struct TracingSink;

impl TracingSink {
    /// Creates a new tracing sink.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl AuditSink for TracingSink {
    fn log(&self, line: &str) -> Result<(), LoggerError> {
        info!(target: "chronicle::audit", "{line}");
        Ok(())
    }

    fn flush(&self) -> Result<(), LoggerError> {
        Ok(())
    }

    fn name(&self) -> &'static str {
        "tracing"
    }
}

/// Sink that writes each line to standard output.
#[derive(Debug, Default)]
pub struct StdoutSink;

impl StdoutSink {
    /// Creates a new stdout sink.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl AuditSink for StdoutSink {
    fn log(&self, line: &str) -> Result<(), LoggerError> {
        let mut out = std::io::stdout().lock();
        writeln!(out, "{line}")?;
        Ok(())
    }

    fn flush(&self) -> Result<(), LoggerError> {
        std::io::stdout().lock().flush()?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "stdout"
    }
}

/// Sink that appends lines to a file.
#[derive(Debug)]
pub struct FileSink {
    path: PathBuf,
    writer: Mutex<BufWriter<File>>,
}

impl FileSink {
    /// Opens (or creates) the file in append mode.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, LoggerError> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|source| LoggerError::Open {
                path: path.clone(),
                source,
            })?;

        Ok(Self {
            path,
            writer: Mutex::new(BufWriter::new(file)),
        })
    }

    /// Returns the file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl AuditSink for FileSink {
    fn log(&self, line: &str) -> Result<(), LoggerError> {
        let mut writer = self.writer.lock();
        writeln!(writer, "{line}")?;
        Ok(())
    }

    fn flush(&self) -> Result<(), LoggerError> {
        self.writer.lock().flush()?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "file"
    }
}

/// Sink that forwards each line to several sinks.
///
/// A failing sink does not stop delivery to the others; the first error is
/// returned after every sink has been tried.
#[derive(Debug)]
pub struct MultiSink {
    sinks: Vec<Arc<dyn AuditSink>>,
}

impl MultiSink {
    /// Creates a fan-out over the given sinks.
    #[must_use]
    pub fn new(sinks: Vec<Arc<dyn AuditSink>>) -> Self {
        Self { sinks }
    }

    /// Returns the number of wrapped sinks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    /// Returns true if no sinks are wrapped.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }

    fn for_each(&self, op: impl Fn(&dyn AuditSink) -> Result<(), LoggerError>) -> Result<(), LoggerError> {
        let mut first_error = None;
        for sink in &self.sinks {
            if let Err(e) = op(sink.as_ref()) {
                error!(sink = sink.name(), error = %e, "Audit sink failed");
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}

impl AuditSink for MultiSink {
    fn log(&self, line: &str) -> Result<(), LoggerError> {
        self.for_each(|sink| sink.log(line))
    }

    fn flush(&self) -> Result<(), LoggerError> {
        self.for_each(|sink| sink.flush())
    }

    fn name(&self) -> &'static str {
        "multi"
    }
}

/// In-memory sink for testing.
#[derive(Debug, Default)]
pub struct InMemorySink {
    lines: Mutex<Vec<String>>,
}

impl InMemorySink {
    /// Creates a new in-memory sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all logged lines.
    #[must_use]
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().clone()
    }

    /// Clears all logged lines.
    pub fn clear(&self) {
        self.lines.lock().clear();
    }
}

impl AuditSink for InMemorySink {
    fn log(&self, line: &str) -> Result<(), LoggerError> {
        self.lines.lock().push(line.to_string());
        Ok(())
    }

    fn flush(&self) -> Result<(), LoggerError> {
        Ok(())
    }

    fn name(&self) -> &'static str {
        "in_memory"
    }
}
