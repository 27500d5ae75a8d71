//! Replay command implementation.

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use clap::Args;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use chronicle_audit::{AuditDispatcher, SinkConfig, StatsSnapshot};
use chronicle_core::RawEvent;

/// Arguments for the replay command.
#[derive(Args)]
pub struct ReplayArgs {
    /// File of newline-delimited JSON events, or `-` for standard input
    pub input: PathBuf,

    /// Configuration file (defaults to the asset and page pipelines)
    #[arg(short, long, env = "CHRONICLE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Milliseconds between consecutive events that carry no `offset_ms`
    /// (0 uses the wall clock)
    #[arg(long, default_value_t = 0)]
    pub spacing_ms: u64,

    /// Print the summary as JSON
    #[arg(long)]
    pub json: bool,
}

/// One input line: a raw event with an optional replay offset.
#[derive(Debug, Deserialize)]
struct ReplayRecord {
    #[serde(flatten)]
    event: RawEvent,

    /// Milliseconds after the start of the replay at which the event occurs.
    #[serde(default)]
    offset_ms: Option<u64>,
}

/// Result of replaying an input stream.
#[derive(Debug, Default, Serialize)]
pub struct ReplaySummary {
    /// Non-blank input lines.
    pub events: u64,
    /// Lines that were not valid events.
    pub malformed: u64,
    /// Counters per pipeline.
    pub pipelines: Vec<(String, StatsSnapshot)>,
}

/// Runs the replay command.
pub async fn execute(args: ReplayArgs) -> Result<()> {
    let mut config = super::load_config(args.config.as_deref())?;
    if args.config.is_none() {
        config.sinks = vec![SinkConfig::Stdout];
    }

    let dispatcher = Arc::new(AuditDispatcher::from_config(&config).context("Failed to build pipelines")?);
    let sweepers = dispatcher.spawn_sweepers();

    info!(input = %args.input.display(), pipelines = dispatcher.pipelines().len(), "Replaying events");

    let input = args.input.clone();
    let spacing_ms = args.spacing_ms;
    let worker = Arc::clone(&dispatcher);
    let summary = tokio::task::spawn_blocking(move || {
        let reader = open_input(&input)?;
        replay(reader, &worker, Local::now(), spacing_ms)
    })
    .await
    .context("Replay task failed")??;

    for handle in sweepers {
        handle.abort();
    }
    dispatcher.flush().context("Failed to flush audit sink")?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print_summary(&summary);
    }
    Ok(())
}

fn open_input(path: &Path) -> Result<Box<dyn BufRead + Send>> {
    if path == Path::new("-") {
        return Ok(Box::new(BufReader::new(io::stdin())));
    }
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    Ok(Box::new(BufReader::new(file)))
}

/// Feeds every event in `reader` to the dispatcher.
///
/// Events are timed at `start + offset_ms` when they carry an offset,
/// otherwise at `start + index * spacing_ms`, or at the wall clock when
/// `spacing_ms` is zero.
pub fn replay(
    reader: impl BufRead,
    dispatcher: &AuditDispatcher,
    start: DateTime<Local>,
    spacing_ms: u64,
) -> Result<ReplaySummary> {
    let mut summary = ReplaySummary::default();

    for (index, line) in reader.lines().enumerate() {
        let line = line.context("Failed to read input")?;
        if line.trim().is_empty() {
            continue;
        }

        let position = summary.events;
        summary.events += 1;

        let record: ReplayRecord = match serde_json::from_str(&line) {
            Ok(record) => record,
            Err(e) => {
                warn!(line = index + 1, error = %e, "Skipping malformed event");
                summary.malformed += 1;
                continue;
            }
        };

        let at = match (record.offset_ms, spacing_ms) {
            (Some(offset), _) => start + millis(offset),
            (None, 0) => Local::now(),
            (None, spacing) => start + millis(position.saturating_mul(spacing)),
        };
        dispatcher.dispatch_at(&record.event, at);
    }

    summary.pipelines = dispatcher
        .pipelines()
        .iter()
        .map(|pipeline| (pipeline.name().to_string(), pipeline.stats()))
        .collect();
    Ok(summary)
}

fn millis(value: u64) -> chrono::Duration {
    chrono::Duration::milliseconds(i64::try_from(value).unwrap_or(i64::MAX))
}

fn print_summary(summary: &ReplaySummary) {
    println!();
    println!("Chronicle Replay Summary");
    println!("========================");
    println!("Events:    {}", summary.events);
    println!("Malformed: {}", summary.malformed);

    for (name, stats) in &summary.pipelines {
        println!();
        println!("Pipeline: {name}");
        println!("  Emitted:     {}", stats.emitted);
        println!("  Dropped:     {}", stats.dropped());
        println!("    duplicate:       {}", stats.duplicate);
        println!("    unclassified:    {}", stats.unclassified);
        println!("    no path:         {}", stats.no_path);
        println!("    unknown topic:   {}", stats.unknown_topic);
        println!(
            "    replication:     {}",
            stats.undecodable_replication + stats.unhandled_replication_type + stats.rejected_replication_path
        );
        if stats.sink_errors > 0 {
            println!("  ⚠ Sink errors: {}", stats.sink_errors);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use chronicle_audit::{AuditConfig, InMemorySink};

    fn dispatcher(sink: &Arc<InMemorySink>) -> AuditDispatcher {
        AuditDispatcher::with_sink(&AuditConfig::default(), sink.clone()).unwrap()
    }

    fn start() -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 5, 1, 10, 30, 0).unwrap()
    }

    const ADDED: &str = r#"{"topic":"org/apache/sling/api/resource/Resource/ADDED","properties":{"path":"/content/dam/app/photo.jpg","userid":"alice"}}"#;

    #[test]
    fn test_replay_debounces_spaced_events() {
        let sink = Arc::new(InMemorySink::new());
        let input = format!("{ADDED}\n{ADDED}\n\n{ADDED}\n");

        let summary = replay(input.as_bytes(), &dispatcher(&sink), start(), 1000).unwrap();

        assert_eq!(summary.events, 3);
        assert_eq!(summary.malformed, 0);
        // t=0 and t=2000 emit, t=1000 is suppressed, in both pipelines
        assert_eq!(sink.lines().len(), 4);
        assert_eq!(summary.pipelines[0].0, "assets");
        assert_eq!(summary.pipelines[0].1.emitted, 2);
        assert_eq!(summary.pipelines[0].1.duplicate, 1);
    }

    #[test]
    fn test_replay_uses_offsets() {
        let sink = Arc::new(InMemorySink::new());
        let input = r#"{"topic":"org/apache/sling/api/resource/Resource/CHANGED","offset_ms":0,"properties":{"path":"/content/site/en"}}
{"topic":"org/apache/sling/api/resource/Resource/CHANGED","offset_ms":5000,"properties":{"path":"/content/site/en"}}"#;

        replay(input.as_bytes(), &dispatcher(&sink), start(), 0).unwrap();

        let lines = sink.lines();
        assert_eq!(lines.len(), 2);
        assert!(lines[1].ends_with("Time: 2024-05-01 10:30:05"));
    }

    #[test]
    fn test_replay_skips_malformed_lines() {
        let sink = Arc::new(InMemorySink::new());
        let input = format!("not json\n{{\"properties\":{{}}}}\n{ADDED}\n");

        let summary = replay(input.as_bytes(), &dispatcher(&sink), start(), 0).unwrap();

        assert_eq!(summary.events, 3);
        assert_eq!(summary.malformed, 2);
        assert_eq!(sink.lines().len(), 2);
    }

    #[test]
    fn test_open_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = open_input(&dir.path().join("missing.ndjson")).err().unwrap();
        assert!(err.to_string().contains("Failed to open"));
    }
}
