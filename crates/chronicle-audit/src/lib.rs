//! Audit pipelines for the Chronicle content lifecycle auditor.
//!
//! The repository event bus fires several low-level events for one user
//! action (saving a page touches many nodes, publishing fires both a resource
//! and a replication event). This crate turns that stream into one audit
//! line per logical action:
//!
//! - [`Normalizer`] extracts subject path, action and acting user
//! - [`ClassificationRule`](chronicle_core::ClassificationRule) decides which
//!   paths a pipeline audits
//! - [`DebounceStore`] suppresses repeats of the same action on the same path
//!   within a window
//! - [`AuditSink`] receives the formatted lines
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use chronicle_audit::{AuditConfig, AuditDispatcher, InMemorySink};
//! use chronicle_core::RawEvent;
//!
//! let sink = Arc::new(InMemorySink::new());
//! let dispatcher = AuditDispatcher::with_sink(&AuditConfig::default(), sink.clone()).unwrap();
//!
//! let event = RawEvent::new("org/apache/sling/api/resource/Resource/CHANGED")
//!     .with_property("path", "/content/site/en/home")
//!     .with_property("userid", "bob");
//!
//! dispatcher.dispatch(&event);
//! dispatcher.dispatch(&event);
//!
//! let lines = sink.lines();
//! assert_eq!(lines.len(), 1);
//! assert!(lines[0].starts_with("PAGE MODIFIED | User: bob | Path: /content/site/en/home"));
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod debounce;
pub mod dispatcher;
pub mod format;
mod logger;
pub mod normalizer;
mod outcome;
pub mod pipeline;

pub use config::{AuditConfig, ConfigError};
pub use debounce::{DebounceEntry, DebounceKey, DebounceStore};
pub use dispatcher::AuditDispatcher;
pub use format::{AuditLine, AuditRecord, LineFormat, MessageLabels};
pub use logger::{
    create_sink, AuditSink, FileSink, InMemorySink, LoggerError, MultiSink, SinkConfig, StdoutSink,
    TracingSink,
};
pub use normalizer::{NormalizedEvent, Normalization, Normalizer, SYSTEM_USER};
pub use outcome::{DropReason, Outcome};
pub use pipeline::{AuditPipeline, PipelineConfig, PipelineStats, StatsSnapshot};
