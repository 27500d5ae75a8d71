//! Content lifecycle actions.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The kind of lifecycle action a normalized event describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    /// A node was created in the repository tree.
    Added,
    /// A node was modified.
    Changed,
    /// A node was deleted.
    Removed,
    /// Content was published (replication activate).
    Activated,
    /// Content was unpublished (replication deactivate).
    Deactivated,
}

impl ActionKind {
    /// All action kinds, in declaration order.
    pub const ALL: [Self; 5] = [
        Self::Added,
        Self::Changed,
        Self::Removed,
        Self::Activated,
        Self::Deactivated,
    ];

    /// Returns the stable identifier used in keys and serialized records.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Added => "added",
            Self::Changed => "changed",
            Self::Removed => "removed",
            Self::Activated => "activated",
            Self::Deactivated => "deactivated",
        }
    }

    /// Returns true for kinds that originate from replication events.
    #[must_use]
    pub const fn is_replication(&self) -> bool {
        matches!(self, Self::Activated | Self::Deactivated)
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
