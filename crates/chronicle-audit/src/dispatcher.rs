//! Fan-out of events to every configured pipeline.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Local};
use chronicle_core::RawEvent;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::config::{AuditConfig, ConfigError, DEFAULT_SWEEP_INTERVAL_SECS};
use crate::logger::{create_sink, AuditSink, LoggerError};
use crate::outcome::Outcome;
use crate::pipeline::{AuditPipeline, StatsSnapshot};

/// Delivers each event to every pipeline instance.
///
/// Pipelines are independent: an event may be emitted by one and dropped by
/// another, and each keeps its own debounce store.
#[derive(Debug)]
pub struct AuditDispatcher {
    pipelines: Vec<Arc<AuditPipeline>>,
    sink: Option<Arc<dyn AuditSink>>,
    sweep_interval: Duration,
}

impl AuditDispatcher {
    /// Creates a dispatcher over already built pipelines.
    #[must_use]
    pub fn new(pipelines: Vec<AuditPipeline>) -> Self {
        Self {
            pipelines: pipelines.into_iter().map(Arc::new).collect(),
            sink: None,
            sweep_interval: Duration::from_secs(DEFAULT_SWEEP_INTERVAL_SECS),
        }
    }

    /// Builds the pipelines described by a configuration.
    ///
    /// All pipelines share one sink built from `config.sinks`.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or a sink cannot be
    /// opened.
    pub fn from_config(config: &AuditConfig) -> Result<Self, ConfigError> {
        let sink = create_sink(&config.sinks)?;
        Self::with_sink(config, sink)
    }

    /// Builds the pipelines described by a configuration, writing to `sink`.
    ///
    /// `config.sinks` is ignored.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn with_sink(config: &AuditConfig, sink: Arc<dyn AuditSink>) -> Result<Self, ConfigError> {
        use chronicle_core::Validate;
        config.validate()?;

        let pipelines = config
            .pipelines
            .iter()
            .map(|pipeline| {
                info!(
                    pipeline = %pipeline.name,
                    prefix = %pipeline.rule.required_prefix,
                    window_ms = pipeline.debounce_window_ms,
                    "Configured audit pipeline"
                );
                Arc::new(
                    AuditPipeline::new(pipeline.clone(), Arc::clone(&sink))
                        .with_line_format(config.line_format),
                )
            })
            .collect();

        Ok(Self {
            pipelines,
            sink: Some(sink),
            sweep_interval: config.sweep_interval(),
        })
    }

    /// Returns the pipelines in configuration order.
    #[must_use]
    pub fn pipelines(&self) -> &[Arc<AuditPipeline>] {
        &self.pipelines
    }

    /// Returns the pipeline with the given name.
    #[must_use]
    pub fn pipeline(&self, name: &str) -> Option<&Arc<AuditPipeline>> {
        self.pipelines.iter().find(|pipeline| pipeline.name() == name)
    }

    /// Handles an event observed now.
    pub fn dispatch(&self, event: &RawEvent) -> Vec<Outcome> {
        self.dispatch_at(event, Local::now())
    }

    /// Handles an event observed at `now`, returning one outcome per
    /// pipeline in configuration order.
    pub fn dispatch_at(&self, event: &RawEvent, now: DateTime<Local>) -> Vec<Outcome> {
        self.pipelines
            .iter()
            .map(|pipeline| pipeline.handle_at(event, now))
            .collect()
    }

    /// Spawns one debounce sweeper per pipeline on the current runtime.
    ///
    /// Each sweeper expires entries against its store's newest timestamp, so
    /// sweeping is safe while dispatching past or synthetic times. The
    /// sweepers run until their handles are aborted.
    #[must_use]
    pub fn spawn_sweepers(&self) -> Vec<JoinHandle<()>> {
        self.pipelines
            .iter()
            .map(|pipeline| {
                let store = Arc::clone(pipeline.store());
                let window = pipeline.config().debounce_window();
                tokio::spawn(store.run_sweeper(self.sweep_interval, window))
            })
            .collect()
    }

    /// Returns the counters summed over all pipelines.
    #[must_use]
    pub fn stats(&self) -> StatsSnapshot {
        self.pipelines
            .iter()
            .fold(StatsSnapshot::default(), |mut total, pipeline| {
                total.accumulate(&pipeline.stats());
                total
            })
    }

    /// Flushes the shared sink, if the dispatcher was built from a
    /// configuration.
    ///
    /// # Errors
    ///
    /// Returns the sink's flush error.
    pub fn flush(&self) -> Result<(), LoggerError> {
        match &self.sink {
            Some(sink) => sink.flush().inspect_err(|e| {
                warn!(sink = sink.name(), error = %e, "Failed to flush audit sink");
            }),
            None => Ok(()),
        }
    }
}
