//! # Chronicle Core
//!
//! Core types for the Chronicle content lifecycle audit pipeline.
//!
//! This crate provides the data model shared by every pipeline instance:
//!
//! - [`RawEvent`] - An event as delivered by the repository event bus
//! - [`Topic`] - Recognised resource and replication topics
//! - [`ReplicationAction`] - A decoded publish/unpublish action
//! - [`ActionKind`] - The audited lifecycle action
//! - [`ClassificationRule`] - Declarative acceptance rule for content paths
//! - [`path`] - Reusable path shape predicates
//!
//! ## Example
//!
//! ```rust
//! use chronicle_core::{RawEvent, Topic, ASSET_RULE};
//!
//! let event = RawEvent::new("org/apache/sling/api/resource/Resource/ADDED")
//!     .with_property("path", "/content/dam/app/photo.jpg");
//!
//! assert_eq!(event.parsed_topic(), Some(Topic::ResourceAdded));
//! assert!(event.first_path().is_some_and(|path| ASSET_RULE.accept(path)));
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod action;
pub mod error;
pub mod event;
pub mod path;
pub mod rule;
pub mod validation;

#[cfg(test)]
mod proptest_tests;

pub use action::ActionKind;
pub use error::{Error, Result};
pub use event::{PropertyValue, RawEvent, ReplicationAction, ReplicationActionType, Topic};
pub use rule::{ClassificationRule, ASSET_RULE, PAGE_RULE};
pub use validation::{Validate, ValidationError, ValidationErrors};
