//! Event normalization.
//!
//! Turns a loosely typed [`RawEvent`] into the canonical subject path, action
//! and acting user the rest of the pipeline works with.

use chrono::{DateTime, Local};
use chronicle_core::event::USER_ID_PROPERTY;
use chronicle_core::{ActionKind, RawEvent, ReplicationAction, Topic};

use crate::outcome::DropReason;

/// User recorded when an event carries no identity.
pub const SYSTEM_USER: &str = "system";

/// A canonical audit candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedEvent {
    /// Path of the content entity the event refers to.
    pub subject_path: String,
    /// The lifecycle action.
    pub action_kind: ActionKind,
    /// Acting user, or [`SYSTEM_USER`].
    pub user_id: String,
    /// When the event was observed.
    pub timestamp: DateTime<Local>,
}

/// Result of normalizing an event.
///
/// Replication events keep their raw path alongside the decode result: the
/// raw path is classified first, and a decode failure only counts once that
/// check has passed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Normalization {
    /// A resource added/changed/removed event.
    Resource(NormalizedEvent),
    /// A replication event.
    Replication {
        /// First path found on the raw event.
        raw_path: String,
        /// The decoded action, or why decoding produced nothing auditable.
        decoded: Result<NormalizedEvent, DropReason>,
    },
}

impl Normalization {
    /// Returns the path to run through the first classification pass.
    #[must_use]
    pub fn candidate_path(&self) -> &str {
        match self {
            Self::Resource(event) => &event.subject_path,
            Self::Replication { raw_path, .. } => raw_path,
        }
    }
}

/// Extracts path, action and user from raw events.
#[derive(Debug, Clone)]
pub struct Normalizer {
    identity_property: String,
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new(USER_ID_PROPERTY)
    }
}

impl Normalizer {
    /// Creates a normalizer reading the acting user from `identity_property`.
    #[must_use]
    pub fn new(identity_property: impl Into<String>) -> Self {
        Self {
            identity_property: identity_property.into(),
        }
    }

    /// Returns the identity property name.
    #[must_use]
    pub fn identity_property(&self) -> &str {
        &self.identity_property
    }

    /// Normalizes an event observed at `now`.
    ///
    /// # Errors
    ///
    /// Returns [`DropReason::NoPath`] if the event carries no path and
    /// [`DropReason::UnknownTopic`] if its topic is not audited.
    pub fn normalize(&self, event: &RawEvent, now: DateTime<Local>) -> Result<Normalization, DropReason> {
        let path = event.first_path().ok_or(DropReason::NoPath)?;
        let topic = event.parsed_topic().ok_or(DropReason::UnknownTopic)?;
        let user = self.user_of(event);

        if let Some(action_kind) = topic.resource_action() {
            return Ok(Normalization::Resource(NormalizedEvent {
                subject_path: path.to_string(),
                action_kind,
                user_id: user.unwrap_or(SYSTEM_USER).to_string(),
                timestamp: now,
            }));
        }

        debug_assert_eq!(topic, Topic::Replication);
        let decoded = ReplicationAction::from_event(event)
            .ok_or(DropReason::UndecodableReplication)
            .and_then(|action| {
                let action_kind = action
                    .action_type
                    .action_kind()
                    .ok_or(DropReason::UnhandledReplicationType)?;
                let user_id = user
                    .or(action.user_id.as_deref())
                    .unwrap_or(SYSTEM_USER)
                    .to_string();

                Ok(NormalizedEvent {
                    subject_path: action.path,
                    action_kind,
                    user_id,
                    timestamp: now,
                })
            });

        Ok(Normalization::Replication {
            raw_path: path.to_string(),
            decoded,
        })
    }

    fn user_of<'a>(&self, event: &'a RawEvent) -> Option<&'a str> {
        event
            .text_property(&self.identity_property)
            .filter(|user| !user.is_empty())
    }
}
