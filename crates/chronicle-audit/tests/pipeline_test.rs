//! End-to-end tests for the asset and page audit pipelines.
//!
//! Events are fed through the public API exactly as the event bus adapter
//! would, and the lines reaching the sink are checked.

use std::sync::Arc;

use chrono::{DateTime, Local, TimeZone};
use chronicle_audit::{
    AuditConfig, AuditDispatcher, AuditPipeline, DebounceKey, DropReason, InMemorySink, LineFormat,
    PipelineConfig, SinkConfig,
};
use chronicle_core::event::{
    PATHS_PROPERTY, PATH_PROPERTY, REPLICATION_TOPIC, REPLICATION_TYPE_PROPERTY,
    REPLICATION_USER_PROPERTY, RESOURCE_ADDED_TOPIC, RESOURCE_CHANGED_TOPIC, RESOURCE_REMOVED_TOPIC,
    USER_ID_PROPERTY,
};
use chronicle_core::{ActionKind, RawEvent};

const PHOTO: &str = "/content/dam/app/photo.jpg";

fn base_time() -> DateTime<Local> {
    Local.with_ymd_and_hms(2024, 5, 1, 10, 30, 0).unwrap()
}

fn at(millis: i64) -> DateTime<Local> {
    base_time() + chrono::Duration::milliseconds(millis)
}

fn assets(sink: &Arc<InMemorySink>) -> AuditPipeline {
    AuditPipeline::new(PipelineConfig::assets(), sink.clone())
}

fn pages(sink: &Arc<InMemorySink>) -> AuditPipeline {
    AuditPipeline::new(PipelineConfig::pages(), sink.clone())
}

fn resource(topic: &str, path: &str) -> RawEvent {
    RawEvent::new(topic).with_property(PATH_PROPERTY, path)
}

fn replication(kind: &str, path: &str) -> RawEvent {
    RawEvent::new(REPLICATION_TOPIC)
        .with_property(REPLICATION_TYPE_PROPERTY, kind)
        .with_property(PATHS_PROPERTY, vec![path])
}

// =============================================================================
// Asset Pipeline
// =============================================================================

#[test]
fn test_asset_created() {
    let sink = Arc::new(InMemorySink::new());
    let pipeline = assets(&sink);
    let event = resource(RESOURCE_ADDED_TOPIC, PHOTO).with_property(USER_ID_PROPERTY, "alice");

    let outcome = pipeline.handle_at(&event, base_time());

    assert!(outcome.is_emitted());
    assert_eq!(
        sink.lines(),
        vec!["ASSET CREATED | User: alice | Path: /content/dam/app/photo.jpg | Time: 2024-05-01 10:30:00"]
    );
}

#[test]
fn test_rendition_change_is_not_audited() {
    let sink = Arc::new(InMemorySink::new());
    let pipeline = assets(&sink);
    let event = resource(
        RESOURCE_CHANGED_TOPIC,
        "/content/dam/app/photo.jpg/jcr:content/renditions/thumb.png",
    );

    let outcome = pipeline.handle_at(&event, base_time());

    assert_eq!(outcome.drop_reason(), Some(DropReason::Unclassified));
    assert!(sink.lines().is_empty());
}

#[test]
fn test_asset_published_by_replication() {
    let sink = Arc::new(InMemorySink::new());
    let pipeline = assets(&sink);
    let event = replication("ACTIVATE", PHOTO).with_property(USER_ID_PROPERTY, "carol");

    let outcome = pipeline.handle_at(&event, base_time());

    let line = outcome.line().expect("replication should emit");
    assert_eq!(line.action_kind, ActionKind::Activated);
    assert_eq!(
        line.text,
        "ASSET PUBLISHED | User: carol | Path: /content/dam/app/photo.jpg | Time: 2024-05-01 10:30:00"
    );
}

#[test]
fn test_repeat_within_window_is_suppressed() {
    let sink = Arc::new(InMemorySink::new());
    let pipeline = assets(&sink);
    let event = resource(RESOURCE_ADDED_TOPIC, PHOTO);

    assert!(pipeline.handle_at(&event, at(0)).is_emitted());
    assert_eq!(
        pipeline.handle_at(&event, at(500)).drop_reason(),
        Some(DropReason::Duplicate)
    );
    assert_eq!(sink.lines().len(), 1);
}

#[test]
fn test_repeat_after_window_is_emitted() {
    let sink = Arc::new(InMemorySink::new());
    let pipeline = assets(&sink);
    let event = resource(RESOURCE_ADDED_TOPIC, PHOTO);

    assert!(pipeline.handle_at(&event, at(0)).is_emitted());
    assert!(!pipeline.handle_at(&event, at(1999)).is_emitted());
    assert!(pipeline.handle_at(&event, at(2000)).is_emitted());
    assert_eq!(sink.lines().len(), 2);
}

#[test]
fn test_folder_fails_extension_rule() {
    let sink = Arc::new(InMemorySink::new());
    let pipeline = assets(&sink);

    let outcome = pipeline.handle_at(&resource(RESOURCE_ADDED_TOPIC, "/content/dam/app/folder"), base_time());

    assert_eq!(outcome.drop_reason(), Some(DropReason::Unclassified));
}

#[test]
fn test_missing_user_is_system() {
    let sink = Arc::new(InMemorySink::new());
    let pipeline = assets(&sink);

    pipeline.handle_at(&resource(RESOURCE_REMOVED_TOPIC, PHOTO), base_time());

    assert_eq!(
        sink.lines(),
        vec!["ASSET DELETED | User: system | Path: /content/dam/app/photo.jpg | Time: 2024-05-01 10:30:00"]
    );
}

#[test]
fn test_different_actions_are_debounced_separately() {
    let sink = Arc::new(InMemorySink::new());
    let pipeline = assets(&sink);

    assert!(pipeline.handle_at(&resource(RESOURCE_ADDED_TOPIC, PHOTO), at(0)).is_emitted());
    assert!(pipeline.handle_at(&resource(RESOURCE_CHANGED_TOPIC, PHOTO), at(10)).is_emitted());
    assert!(pipeline.handle_at(&replication("ACTIVATE", PHOTO), at(20)).is_emitted());
    assert_eq!(pipeline.store().len(), 3);
}

// =============================================================================
// Replication Handling
// =============================================================================

#[test]
fn test_replication_user_falls_back_to_action_user() {
    let sink = Arc::new(InMemorySink::new());
    let pipeline = pages(&sink);
    let event = replication("DEACTIVATE", "/content/site/en").with_property(REPLICATION_USER_PROPERTY, "erin");

    let line = pipeline.handle_at(&event, base_time()).line().cloned().unwrap();

    assert_eq!(line.user_id, "erin");
    assert!(line.text.starts_with("PAGE UNPUBLISHED | User: erin"));
}

#[test]
fn test_unhandled_replication_type() {
    let sink = Arc::new(InMemorySink::new());
    let pipeline = pages(&sink);

    let outcome = pipeline.handle_at(&replication("DELETE", "/content/site/en"), base_time());

    assert_eq!(outcome.drop_reason(), Some(DropReason::UnhandledReplicationType));
    assert!(pipeline.store().is_empty());
}

#[test]
fn test_undecodable_replication() {
    let sink = Arc::new(InMemorySink::new());
    let pipeline = pages(&sink);
    let event = RawEvent::new(REPLICATION_TOPIC).with_property(PATH_PROPERTY, "/content/site/en");

    let outcome = pipeline.handle_at(&event, base_time());

    assert_eq!(outcome.drop_reason(), Some(DropReason::UndecodableReplication));
    assert!(pipeline.store().is_empty());
}

#[test]
fn test_replication_of_unaudited_path_leaves_no_entry() {
    let sink = Arc::new(InMemorySink::new());
    let pipeline = pages(&sink);
    let event = replication("ACTIVATE", "/etc/tags/marketing");

    let outcome = pipeline.handle_at(&event, base_time());

    assert_eq!(outcome.drop_reason(), Some(DropReason::Unclassified));
    assert!(pipeline.store().is_empty());
}

#[test]
fn test_replication_action_path_is_classified_again() {
    let sink = Arc::new(InMemorySink::new());
    let pipeline = assets(&sink);
    let event = RawEvent::new(REPLICATION_TOPIC)
        .with_property(REPLICATION_TYPE_PROPERTY, "ACTIVATE")
        .with_property(PATH_PROPERTY, PHOTO)
        .with_property(PATHS_PROPERTY, vec!["/content/dam/app/folder"]);

    let outcome = pipeline.handle_at(&event, base_time());

    assert_eq!(outcome.drop_reason(), Some(DropReason::RejectedReplicationPath));
    assert!(sink.lines().is_empty());
    assert!(pipeline.store().is_empty());
    assert_eq!(pipeline.stats().rejected_replication_path, 1);
}

#[test]
fn test_replication_does_not_suppress_resource_change() {
    let sink = Arc::new(InMemorySink::new());
    let pipeline = pages(&sink);

    assert!(pipeline.handle_at(&replication("ACTIVATE", "/content/site/en"), at(0)).is_emitted());
    assert!(pipeline
        .handle_at(&resource(RESOURCE_CHANGED_TOPIC, "/content/site/en"), at(50))
        .is_emitted());
    assert!(pipeline
        .store()
        .last_emitted(&DebounceKey::new("/content/site/en", ActionKind::Activated))
        .is_some());
}

// =============================================================================
// Page Pipeline
// =============================================================================

#[test]
fn test_page_exclusions() {
    let sink = Arc::new(InMemorySink::new());
    let pipeline = pages(&sink);

    for path in [
        "/content/site/en/jcr:content",
        "/content/site/en/_jcr_content",
        "/content/site/tags/marketing",
        "/content/dam/app/photo.jpg/metadata",
        "/etc/designs/site",
    ] {
        let outcome = pipeline.handle_at(&resource(RESOURCE_CHANGED_TOPIC, path), base_time());
        assert_eq!(outcome.drop_reason(), Some(DropReason::Unclassified), "{path}");
    }
    assert!(sink.lines().is_empty());
}

#[test]
fn test_page_modified() {
    let sink = Arc::new(InMemorySink::new());
    let pipeline = pages(&sink);
    let event = resource(RESOURCE_CHANGED_TOPIC, "/content/site/en/home").with_property(USER_ID_PROPERTY, "bob");

    pipeline.handle_at(&event, base_time());

    assert_eq!(
        sink.lines(),
        vec!["PAGE MODIFIED | User: bob | Path: /content/site/en/home | Time: 2024-05-01 10:30:00"]
    );
}

#[test]
fn test_events_without_path_or_topic() {
    let sink = Arc::new(InMemorySink::new());
    let pipeline = pages(&sink);

    let no_path = RawEvent::new(RESOURCE_ADDED_TOPIC).with_property(PATHS_PROPERTY, Vec::<String>::new());
    let unknown = resource("org/apache/sling/api/resource/Resource/MOVED", "/content/site/en");

    assert_eq!(pipeline.handle_at(&no_path, base_time()).drop_reason(), Some(DropReason::NoPath));
    assert_eq!(
        pipeline.handle_at(&unknown, base_time()).drop_reason(),
        Some(DropReason::UnknownTopic)
    );
}

// =============================================================================
// Dispatcher and Configuration
// =============================================================================

#[test]
fn test_pipelines_debounce_independently() {
    let sink = Arc::new(InMemorySink::new());
    let dispatcher = AuditDispatcher::with_sink(&AuditConfig::default(), sink.clone()).unwrap();
    let event = resource(RESOURCE_ADDED_TOPIC, PHOTO);

    dispatcher.dispatch_at(&event, at(0));
    dispatcher.dispatch_at(&event, at(100));

    let lines = sink.lines();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].starts_with("ASSET CREATED"));
    assert!(lines[1].starts_with("PAGE CREATED"));

    let stats = dispatcher.stats();
    assert_eq!(stats.received, 4);
    assert_eq!(stats.duplicate, 2);
}

#[test]
fn test_configured_window_and_json_lines() {
    let yaml = r"
line_format: json
pipelines:
  - name: pages
    debounce_window_ms: 8000
    rule:
      required_prefix: /content/
";
    let config = AuditConfig::from_yaml(yaml).unwrap();
    let sink = Arc::new(InMemorySink::new());
    let dispatcher = AuditDispatcher::with_sink(&config, sink.clone()).unwrap();
    let event = resource(RESOURCE_ADDED_TOPIC, "/content/site/en");

    dispatcher.dispatch_at(&event, at(0));
    dispatcher.dispatch_at(&event, at(5000));
    dispatcher.dispatch_at(&event, at(8000));

    let lines = sink.lines();
    assert_eq!(lines.len(), 2);
    let record: serde_json::Value = serde_json::from_str(&lines[0]).unwrap();
    assert_eq!(record["pipeline"], "pages");
    assert_eq!(record["message"], "CONTENT CREATED | User: system | Path: /content/site/en | Time: 2024-05-01 10:30:00");
}

#[test]
fn test_config_file_with_file_sink() {
    let dir = tempfile::tempdir().unwrap();
    let log_path = dir.path().join("audit.log");
    let config_path = dir.path().join("chronicle.yaml");

    let config = AuditConfig {
        sinks: vec![SinkConfig::File { path: log_path.clone() }],
        ..Default::default()
    };
    std::fs::write(&config_path, config.to_yaml().unwrap()).unwrap();

    let loaded = AuditConfig::from_file(&config_path).unwrap();
    assert_eq!(loaded, config);

    let dispatcher = AuditDispatcher::from_config(&loaded).unwrap();
    dispatcher.dispatch_at(
        &resource(RESOURCE_ADDED_TOPIC, PHOTO).with_property(USER_ID_PROPERTY, "alice"),
        base_time(),
    );
    dispatcher.flush().unwrap();

    let contents = std::fs::read_to_string(&log_path).unwrap();
    let lines: Vec<_> = contents.lines().collect();
    assert_eq!(
        lines,
        vec![
            "ASSET CREATED | User: alice | Path: /content/dam/app/photo.jpg | Time: 2024-05-01 10:30:00",
            "PAGE CREATED | User: alice | Path: /content/dam/app/photo.jpg | Time: 2024-05-01 10:30:00",
        ]
    );
}

#[test]
fn test_line_format_builder() {
    let sink = Arc::new(InMemorySink::new());
    let pipeline = assets(&sink).with_line_format(LineFormat::Json);

    pipeline.handle_at(&resource(RESOURCE_ADDED_TOPIC, PHOTO), base_time());

    let record: chronicle_audit::AuditRecord = serde_json::from_str(&sink.lines()[0]).unwrap();
    assert_eq!(record.action, ActionKind::Added);
    assert_eq!(record.path, PHOTO);
}
