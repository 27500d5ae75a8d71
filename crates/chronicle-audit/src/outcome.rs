//! Result of running one event through a pipeline.

use std::fmt;

use serde::Serialize;

use crate::format::AuditLine;

/// Why an event produced no audit line.
///
/// None of these are faults: the event bus delivers far more events than
/// there are logical actions, and dropping them is the pipeline's job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DropReason {
    /// Neither `path` nor `paths` carried a usable path.
    NoPath,
    /// The topic is neither a resource topic nor the replication topic.
    UnknownTopic,
    /// The event path was rejected by the classification rule.
    Unclassified,
    /// A replication payload could not be decoded.
    UndecodableReplication,
    /// A decoded replication type is not audited (delete, test, ...).
    UnhandledReplicationType,
    /// The decoded replication path was rejected by the classification rule.
    RejectedReplicationPath,
    /// The same action on the same path was emitted within the window.
    Duplicate,
}

impl DropReason {
    /// Every drop reason, in declaration order.
    pub const ALL: [Self; 7] = [
        Self::NoPath,
        Self::UnknownTopic,
        Self::Unclassified,
        Self::UndecodableReplication,
        Self::UnhandledReplicationType,
        Self::RejectedReplicationPath,
        Self::Duplicate,
    ];

    /// Returns a stable identifier for logs and statistics.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::NoPath => "no_path",
            Self::UnknownTopic => "unknown_topic",
            Self::Unclassified => "unclassified",
            Self::UndecodableReplication => "undecodable_replication",
            Self::UnhandledReplicationType => "unhandled_replication_type",
            Self::RejectedReplicationPath => "rejected_replication_path",
            Self::Duplicate => "duplicate",
        }
    }

    pub(crate) const fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for DropReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a pipeline did with one event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// An audit line was produced and handed to the sink.
    Emitted(AuditLine),
    /// The event was dropped.
    Dropped(DropReason),
}

impl Outcome {
    /// Returns true if a line was emitted.
    #[must_use]
    pub const fn is_emitted(&self) -> bool {
        matches!(self, Self::Emitted(_))
    }

    /// Returns the emitted line, if any.
    #[must_use]
    pub const fn line(&self) -> Option<&AuditLine> {
        match self {
            Self::Emitted(line) => Some(line),
            Self::Dropped(_) => None,
        }
    }

    /// Returns the drop reason, if the event was dropped.
    #[must_use]
    pub const fn drop_reason(&self) -> Option<DropReason> {
        match self {
            Self::Emitted(_) => None,
            Self::Dropped(reason) => Some(*reason),
        }
    }
}

impl From<Result<AuditLine, DropReason>> for Outcome {
    fn from(result: Result<AuditLine, DropReason>) -> Self {
        match result {
            Ok(line) => Self::Emitted(line),
            Err(reason) => Self::Dropped(reason),
        }
    }
}
