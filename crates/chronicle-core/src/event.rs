//! Raw repository events as delivered by the CMS event bus.
//!
//! A [`RawEvent`] is a topic plus a bag of named properties. Property values
//! are loosely typed: the same property can carry a single string on one
//! event and a list of strings on the next, so nothing here assumes a shape
//! until a caller asks for one.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::action::ActionKind;
use crate::error::Result;

/// Topic fired when a resource is added to the repository tree.
pub const RESOURCE_ADDED_TOPIC: &str = "org/apache/sling/api/resource/Resource/ADDED";

/// Topic fired when a resource is changed.
pub const RESOURCE_CHANGED_TOPIC: &str = "org/apache/sling/api/resource/Resource/CHANGED";

/// Topic fired when a resource is removed.
pub const RESOURCE_REMOVED_TOPIC: &str = "org/apache/sling/api/resource/Resource/REMOVED";

/// Topic fired for replication (publish/unpublish) actions.
pub const REPLICATION_TOPIC: &str = "com/day/cq/replication";

/// Property carrying a single affected path.
pub const PATH_PROPERTY: &str = "path";

/// Property carrying several affected paths.
pub const PATHS_PROPERTY: &str = "paths";

/// Property carrying the acting user on resource events.
pub const USER_ID_PROPERTY: &str = "userid";

/// Property carrying the replication action type.
pub const REPLICATION_TYPE_PROPERTY: &str = "type";

/// Property carrying the user that triggered a replication.
pub const REPLICATION_USER_PROPERTY: &str = "userId";

/// A single event property value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    /// A plain string.
    Text(String),
    /// A list of strings.
    List(Vec<String>),
    /// Anything else (numbers, booleans, nested objects, null).
    Other(serde_json::Value),
}

impl PropertyValue {
    /// Returns the value if it is a plain string.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Returns the string itself, or the first element of a list.
    ///
    /// Empty lists and non-string values yield `None`.
    #[must_use]
    pub fn first_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::List(items) => items.first().map(String::as_str),
            Self::Other(_) => None,
        }
    }
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<Vec<String>> for PropertyValue {
    fn from(value: Vec<String>) -> Self {
        Self::List(value)
    }
}

impl From<Vec<&str>> for PropertyValue {
    fn from(value: Vec<&str>) -> Self {
        Self::List(value.into_iter().map(str::to_string).collect())
    }
}

impl From<serde_json::Value> for PropertyValue {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::String(text) => Self::Text(text),
            other => Self::Other(other),
        }
    }
}

/// An event as produced by the repository event bus.
///
/// # Examples
///
/// ```
/// use chronicle_core::event::{RawEvent, RESOURCE_ADDED_TOPIC};
///
/// let event = RawEvent::new(RESOURCE_ADDED_TOPIC)
///     .with_property("path", "/content/dam/app/photo.jpg")
///     .with_property("userid", "alice");
///
/// assert_eq!(event.text_property("userid"), Some("alice"));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawEvent {
    /// Event topic.
    pub topic: String,

    /// Named event properties.
    #[serde(default)]
    pub properties: BTreeMap<String, PropertyValue>,
}

impl RawEvent {
    /// Creates an event with the given topic and no properties.
    #[must_use]
    pub fn new(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            properties: BTreeMap::new(),
        }
    }

    /// Adds a property.
    #[must_use]
    pub fn with_property(mut self, name: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        self.properties.insert(name.into(), value.into());
        self
    }

    /// Parses an event from a JSON document.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed or has no `topic`.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Returns a property by name.
    #[must_use]
    pub fn property(&self, name: &str) -> Option<&PropertyValue> {
        self.properties.get(name)
    }

    /// Returns a property only if it is a plain string.
    #[must_use]
    pub fn text_property(&self, name: &str) -> Option<&str> {
        self.property(name).and_then(PropertyValue::as_text)
    }

    /// Returns the first path found under `path`, then under `paths`.
    ///
    /// Each property may hold a single string or a list; for lists the first
    /// element is used.
    #[must_use]
    pub fn first_path(&self) -> Option<&str> {
        [PATH_PROPERTY, PATHS_PROPERTY]
            .iter()
            .find_map(|name| self.property(name).and_then(PropertyValue::first_text))
    }

    /// Returns the first path found under `paths`, then under `path`.
    ///
    /// Replication payloads carry the replicated paths in `paths`; `path`
    /// is only a fallback for single-path actions.
    #[must_use]
    pub fn replication_path(&self) -> Option<&str> {
        [PATHS_PROPERTY, PATH_PROPERTY]
            .iter()
            .find_map(|name| self.property(name).and_then(PropertyValue::first_text))
    }

    /// Parses the event topic.
    #[must_use]
    pub fn parsed_topic(&self) -> Option<Topic> {
        Topic::parse(&self.topic)
    }
}

/// A recognised event topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    /// A resource was added.
    ResourceAdded,
    /// A resource was changed.
    ResourceChanged,
    /// A resource was removed.
    ResourceRemoved,
    /// A replication action was performed.
    Replication,
}

impl Topic {
    /// Parses a topic string.
    ///
    /// Resource topics are recognised by their `Resource/<SUFFIX>` tail, so
    /// both the fully qualified form and the short `Resource/ADDED` form are
    /// accepted.
    ///
    /// # Examples
    ///
    /// ```
    /// use chronicle_core::event::Topic;
    ///
    /// assert_eq!(Topic::parse("Resource/ADDED"), Some(Topic::ResourceAdded));
    /// assert_eq!(
    ///     Topic::parse("org/apache/sling/api/resource/Resource/REMOVED"),
    ///     Some(Topic::ResourceRemoved)
    /// );
    /// assert_eq!(Topic::parse("com/day/cq/replication"), Some(Topic::Replication));
    /// assert_eq!(Topic::parse("Resource/MOVED"), None);
    /// ```
    #[must_use]
    pub fn parse(topic: &str) -> Option<Self> {
        if topic == REPLICATION_TOPIC {
            return Some(Self::Replication);
        }

        let (head, suffix) = topic.rsplit_once('/')?;
        if head != "Resource" && !head.ends_with("/Resource") {
            return None;
        }

        match suffix {
            "ADDED" => Some(Self::ResourceAdded),
            "CHANGED" => Some(Self::ResourceChanged),
            "REMOVED" => Some(Self::ResourceRemoved),
            _ => None,
        }
    }

    /// Returns the canonical topic string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::ResourceAdded => RESOURCE_ADDED_TOPIC,
            Self::ResourceChanged => RESOURCE_CHANGED_TOPIC,
            Self::ResourceRemoved => RESOURCE_REMOVED_TOPIC,
            Self::Replication => REPLICATION_TOPIC,
        }
    }

    /// Returns the action kind for resource topics.
    ///
    /// Replication topics return `None`: their kind depends on the decoded
    /// [`ReplicationAction`].
    #[must_use]
    pub const fn resource_action(&self) -> Option<ActionKind> {
        match self {
            Self::ResourceAdded => Some(ActionKind::Added),
            Self::ResourceChanged => Some(ActionKind::Changed),
            Self::ResourceRemoved => Some(ActionKind::Removed),
            Self::Replication => None,
        }
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Type of a replication action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReplicationActionType {
    /// Publish content.
    Activate,
    /// Unpublish content.
    Deactivate,
    /// Delete content on the publish tier.
    Delete,
    /// Connectivity test.
    Test,
    /// Reverse replication from publish to author.
    Reverse,
    /// Internal poll for reverse replication.
    InternalPoll,
}

impl ReplicationActionType {
    /// Parses an action type name, ignoring ASCII case.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        const NAMES: [(&str, ReplicationActionType); 6] = [
            ("ACTIVATE", ReplicationActionType::Activate),
            ("DEACTIVATE", ReplicationActionType::Deactivate),
            ("DELETE", ReplicationActionType::Delete),
            ("TEST", ReplicationActionType::Test),
            ("REVERSE", ReplicationActionType::Reverse),
            ("INTERNAL_POLL", ReplicationActionType::InternalPoll),
        ];

        NAMES
            .iter()
            .find(|(candidate, _)| candidate.eq_ignore_ascii_case(name))
            .map(|(_, kind)| *kind)
    }

    /// Returns the audited action kind, if this type is audited at all.
    #[must_use]
    pub const fn action_kind(&self) -> Option<ActionKind> {
        match self {
            Self::Activate => Some(ActionKind::Activated),
            Self::Deactivate => Some(ActionKind::Deactivated),
            Self::Delete | Self::Test | Self::Reverse | Self::InternalPoll => None,
        }
    }
}

/// A decoded replication action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplicationAction {
    /// Path being replicated.
    pub path: String,

    /// Replication type.
    pub action_type: ReplicationActionType,

    /// User that triggered the replication, if recorded.
    pub user_id: Option<String>,
}

impl ReplicationAction {
    /// Decodes a replication action from an event.
    ///
    /// Returns `None` if the event is not on the replication topic, has no
    /// recognised `type`, or carries no path.
    #[must_use]
    pub fn from_event(event: &RawEvent) -> Option<Self> {
        if event.parsed_topic() != Some(Topic::Replication) {
            return None;
        }

        let action_type = event
            .text_property(REPLICATION_TYPE_PROPERTY)
            .and_then(ReplicationActionType::parse)?;
        let path = event.replication_path()?.to_string();
        let user_id = event
            .text_property(REPLICATION_USER_PROPERTY)
            .filter(|user| !user.is_empty())
            .map(str::to_string);

        Some(Self {
            path,
            action_type,
            user_id,
        })
    }
}
