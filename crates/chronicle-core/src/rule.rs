//! Path classification rules.
//!
//! Repository change events fire for every internal node touched by a single
//! logical operation (metadata, renditions, `jcr:content` subtrees). A
//! [`ClassificationRule`] decides whether a path denotes the logical content
//! entity itself, collapsing that fan-out to one candidate path.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::path::{contains_any, has_file_extension};
use crate::validation::{Validate, ValidationError, ValidationErrors};

/// Rule used for digital assets under the DAM.
pub static ASSET_RULE: Lazy<ClassificationRule> = Lazy::new(|| {
    ClassificationRule::new("/content/dam/")
        .exclude("/jcr:content")
        .exclude("/renditions")
        .exclude("/metadata")
        .exclude("/related")
        .require_file_extension(true)
});

/// Rule used for site pages.
pub static PAGE_RULE: Lazy<ClassificationRule> = Lazy::new(|| {
    ClassificationRule::new("/content/")
        .exclude("/jcr:content")
        .exclude("/_jcr")
        .exclude("/tags")
        .exclude("/metadata")
});

/// Declarative acceptance rule for candidate content paths.
///
/// A path is accepted iff it starts with `required_prefix`, contains none of
/// `excluded_substrings`, and, when `require_file_extension` is set, its last
/// segment has a file extension.
///
/// # Examples
///
/// ```
/// use chronicle_core::rule::ASSET_RULE;
///
/// assert!(ASSET_RULE.accept("/content/dam/app/photo.jpg"));
/// assert!(!ASSET_RULE.accept("/content/dam/app/photo.jpg/jcr:content/renditions/thumb.png"));
/// assert!(!ASSET_RULE.accept("/content/dam/app/folder"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationRule {
    /// Prefix every accepted path must start with.
    pub required_prefix: String,

    /// Substrings that disqualify a path.
    #[serde(default)]
    pub excluded_substrings: Vec<String>,

    /// Whether the final path segment must carry a file extension.
    #[serde(default)]
    pub require_file_extension: bool,
}

impl ClassificationRule {
    /// Creates a rule with only a prefix constraint.
    #[must_use]
    pub fn new(required_prefix: impl Into<String>) -> Self {
        Self {
            required_prefix: required_prefix.into(),
            excluded_substrings: Vec::new(),
            require_file_extension: false,
        }
    }

    /// Adds an excluded substring.
    #[must_use]
    pub fn exclude(mut self, substring: impl Into<String>) -> Self {
        self.excluded_substrings.push(substring.into());
        self
    }

    /// Sets the file extension requirement.
    #[must_use]
    pub const fn require_file_extension(mut self, required: bool) -> Self {
        self.require_file_extension = required;
        self
    }

    /// Returns true if the path denotes a loggable content entity.
    #[must_use]
    pub fn accept(&self, path: &str) -> bool {
        path.starts_with(&self.required_prefix)
            && !contains_any(path, &self.excluded_substrings)
            && (!self.require_file_extension || has_file_extension(path))
    }
}

impl Validate for ClassificationRule {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if self.required_prefix.is_empty() {
            errors.add(ValidationError::required("required_prefix"));
        } else if !self.required_prefix.starts_with('/') {
            errors.add(ValidationError::format(
                "required_prefix",
                format!("'{}' must be an absolute path starting with '/'", self.required_prefix),
            ));
        }

        for (index, substring) in self.excluded_substrings.iter().enumerate() {
            if substring.is_empty() {
                errors.add(ValidationError::constraint(
                    format!("excluded_substrings[{index}]"),
                    "an empty exclusion would reject every path",
                ));
            }
        }

        errors.into_result()
    }
}
