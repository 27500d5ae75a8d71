//! Error types for Chronicle core operations.
//!
//! Event processing itself never fails; these errors cover decoding input
//! documents and rejecting invalid configuration.

use thiserror::Error;

use crate::validation::ValidationErrors;

/// Result type alias using [`Error`] as the error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in Chronicle core operations.
#[derive(Error, Debug)]
pub enum Error {
    /// An event document could not be decoded.
    #[error("Failed to decode event: {0}")]
    EventDecode(#[from] serde_json::Error),

    /// A configuration value failed validation.
    #[error("Invalid configuration: {0}")]
    Validation(#[from] ValidationErrors),

    /// Invalid input provided.
    #[error("Invalid input: {reason}")]
    InvalidInput {
        /// Reason the input is invalid.
        reason: String,
    },
}
