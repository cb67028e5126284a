//! Error types for the workflow engine

use thiserror::Error;

/// Result type alias using EngineError
pub type Result<T> = std::result::Result<T, EngineError>;

/// Errors that can occur while executing a workflow
#[derive(Debug, Error)]
pub enum EngineError {
    /// The workflow definition is structurally invalid (cycle, dangling edge).
    /// Detected before any node runs.
    #[error("Invalid workflow definition: {0}")]
    WorkflowDefinition(String),

    /// A required input was absent when a node asked for it
    #[error("Missing required input '{port}' for node '{node_id}'")]
    MissingInput { node_id: String, port: String },

    /// No processor is registered for a node type referenced by the workflow
    #[error("No processor registered for node type '{0}'")]
    MissingProcessor(String),

    /// A single node exceeded its per-node timeout
    #[error("Node '{node_id}' timed out after {timeout_secs}s")]
    NodeTimeout { node_id: String, timeout_secs: u64 },

    /// Node execution failed
    #[error("Node execution failed: {0}")]
    ExecutionFailed(String),

    /// Sandboxed file access outside the allowed roots, or a disallowed host
    #[error("Sandbox denied {operation} on '{target}'")]
    IoDenied { operation: String, target: String },

    /// Sandboxed HTTP request failed
    #[error("HTTP request failed: {0}")]
    Http(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl EngineError {
    /// Create an execution failed error with a message
    pub fn failed(msg: impl Into<String>) -> Self {
        Self::ExecutionFailed(msg.into())
    }

    /// Create a workflow definition error with a message
    pub fn definition(msg: impl Into<String>) -> Self {
        Self::WorkflowDefinition(msg.into())
    }
}
