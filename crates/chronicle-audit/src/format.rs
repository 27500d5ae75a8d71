//! Audit message labels and line formatting.

use chrono::{DateTime, Local};
use chronicle_core::ActionKind;
use serde::{Deserialize, Serialize};
use uuid::{Timestamp, Uuid};

use crate::logger::LoggerError;
use crate::normalizer::NormalizedEvent;

/// Timestamp pattern used in text lines (`YYYY-MM-DD HH:MM:SS`, local time).
pub const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// How emitted lines are rendered before reaching the sink.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineFormat {
    /// `LABEL | User: u | Path: p | Time: t`
    #[default]
    Text,
    /// One JSON [`AuditRecord`] per line.
    Json,
}

/// Human-readable label for each action kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MessageLabels {
    /// Label for [`ActionKind::Added`].
    pub created: String,
    /// Label for [`ActionKind::Changed`].
    pub modified: String,
    /// Label for [`ActionKind::Removed`].
    pub deleted: String,
    /// Label for [`ActionKind::Activated`].
    pub published: String,
    /// Label for [`ActionKind::Deactivated`].
    pub unpublished: String,
}

impl Default for MessageLabels {
    fn default() -> Self {
        Self::for_entity("CONTENT")
    }
}

impl MessageLabels {
    /// Builds the standard labels for an entity name.
    ///
    /// # Examples
    ///
    /// ```
    /// use chronicle_audit::MessageLabels;
    /// use chronicle_core::ActionKind;
    ///
    /// let labels = MessageLabels::for_entity("ASSET");
    /// assert_eq!(labels.label(ActionKind::Activated), "ASSET PUBLISHED");
    /// ```
    #[must_use]
    pub fn for_entity(entity: &str) -> Self {
        Self {
            created: format!("{entity} CREATED"),
            modified: format!("{entity} MODIFIED"),
            deleted: format!("{entity} DELETED"),
            published: format!("{entity} PUBLISHED"),
            unpublished: format!("{entity} UNPUBLISHED"),
        }
    }

    /// Labels for digital assets.
    #[must_use]
    pub fn assets() -> Self {
        Self::for_entity("ASSET")
    }

    /// Labels for pages.
    #[must_use]
    pub fn pages() -> Self {
        Self::for_entity("PAGE")
    }

    /// Returns the label for an action kind.
    #[must_use]
    pub fn label(&self, kind: ActionKind) -> &str {
        match kind {
            ActionKind::Added => &self.created,
            ActionKind::Changed => &self.modified,
            ActionKind::Removed => &self.deleted,
            ActionKind::Activated => &self.published,
            ActionKind::Deactivated => &self.unpublished,
        }
    }

    /// Returns `(field, label)` pairs in action order.
    #[must_use]
    pub fn fields(&self) -> [(&'static str, &str); 5] {
        [
            ("created", &self.created),
            ("modified", &self.modified),
            ("deleted", &self.deleted),
            ("published", &self.published),
            ("unpublished", &self.unpublished),
        ]
    }
}

/// Formats one text audit line.
///
/// # Examples
///
/// ```
/// use chrono::{Local, TimeZone};
/// use chronicle_audit::format::format_line;
///
/// let time = Local.with_ymd_and_hms(2024, 5, 1, 9, 5, 3).unwrap();
/// assert_eq!(
///     format_line("ASSET CREATED", "alice", "/content/dam/a.jpg", &time),
///     "ASSET CREATED | User: alice | Path: /content/dam/a.jpg | Time: 2024-05-01 09:05:03"
/// );
/// ```
#[must_use]
pub fn format_line(label: &str, user: &str, path: &str, time: &DateTime<Local>) -> String {
    format!(
        "{label} | User: {user} | Path: {path} | Time: {}",
        time.format(TIME_FORMAT)
    )
}

/// An emitted audit line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditLine {
    /// Name of the pipeline that emitted the line.
    pub pipeline: String,
    /// The audited action.
    pub action_kind: ActionKind,
    /// Acting user.
    pub user_id: String,
    /// Subject path.
    pub path: String,
    /// Observation time.
    pub timestamp: DateTime<Local>,
    /// The formatted text line.
    pub text: String,
}

impl AuditLine {
    /// Builds a line for a normalized event.
    #[must_use]
    pub fn new(pipeline: &str, labels: &MessageLabels, event: NormalizedEvent) -> Self {
        let text = format_line(
            labels.label(event.action_kind),
            &event.user_id,
            &event.subject_path,
            &event.timestamp,
        );

        Self {
            pipeline: pipeline.to_string(),
            action_kind: event.action_kind,
            user_id: event.user_id,
            path: event.subject_path,
            timestamp: event.timestamp,
            text,
        }
    }

    /// Builds the structured record for this line.
    #[must_use]
    pub fn record(&self) -> AuditRecord {
        AuditRecord {
            id: Uuid::new_v7(Timestamp::now(uuid::NoContext)),
            timestamp: self.timestamp,
            pipeline: self.pipeline.clone(),
            action: self.action_kind,
            user: self.user_id.clone(),
            path: self.path.clone(),
            message: self.text.clone(),
        }
    }

    /// Renders the line in the requested format.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON record cannot be serialized.
    pub fn render(&self, format: LineFormat) -> Result<String, LoggerError> {
        match format {
            LineFormat::Text => Ok(self.text.clone()),
            LineFormat::Json => Ok(serde_json::to_string(&self.record())?),
        }
    }
}

/// Structured form of an audit line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditRecord {
    /// Unique record ID (UUID v7, time ordered).
    pub id: Uuid,
    /// Observation time.
    pub timestamp: DateTime<Local>,
    /// Emitting pipeline.
    pub pipeline: String,
    /// The audited action.
    pub action: ActionKind,
    /// Acting user.
    pub user: String,
    /// Subject path.
    pub path: String,
    /// The text line.
    pub message: String,
}
