//! Error types for event sources

use thiserror::Error;

use crate::registry::SourceState;

/// Result type alias using SourceError
pub type Result<T> = std::result::Result<T, SourceError>;

/// Errors that can occur while managing event sources
#[derive(Debug, Error)]
pub enum SourceError {
    /// The source's `start()` or `initialize()` failed; the entry moved to
    /// the error state and no retry is attempted
    #[error("Event source '{id}' failed to start: {cause}")]
    StartFailed { id: String, cause: String },

    /// The requested lifecycle action is not valid from the current state
    #[error("Event source '{id}' cannot {action} from state {from:?}")]
    InvalidTransition {
        id: String,
        from: SourceState,
        action: &'static str,
    },

    /// The referenced source id is not registered
    #[error("Unknown event source '{0}'")]
    UnknownSource(String),

    /// The source manifest failed validation
    #[error("Event source manifest '{name}' invalid: {errors:?}")]
    ManifestValidation { name: String, errors: Vec<String> },

    /// The event bus consumer is gone; the event was not delivered
    #[error("Event bus closed")]
    BusClosed,

    /// A schedule expression could not be parsed
    #[error("Invalid schedule '{expression}': {cause}")]
    InvalidSchedule { expression: String, cause: String },

    /// Source-internal failure
    #[error("Event source error: {0}")]
    Source(String),
}

impl SourceError {
    /// Create a source-internal error with a message
    pub fn source(msg: impl Into<String>) -> Self {
        Self::Source(msg.into())
    }
}
