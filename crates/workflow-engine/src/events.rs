//! Event types for streaming workflow progress
//!
//! Events are sent from the engine to any consumer (HTTP pollers, logs,
//! tests) to report execution progress and state changes.

use serde::{Deserialize, Serialize};

/// Trait for sending workflow events
///
/// This abstracts over the transport mechanism (channel, collector, …)
/// allowing the engine to be used in different hosts.
pub trait EventSink: Send + Sync {
    /// Send an event
    ///
    /// Returns an error if the event could not be sent (e.g., channel closed)
    fn send(&self, event: WorkflowEvent) -> Result<(), EventError>;
}

/// Error when sending events fails
#[derive(Debug, Clone)]
pub struct EventError {
    pub message: String,
}

impl std::fmt::Display for EventError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Event error: {}", self.message)
    }
}

impl std::error::Error for EventError {}

impl EventError {
    pub fn channel_closed() -> Self {
        Self {
            message: "Channel closed".to_string(),
        }
    }
}

/// Events emitted during workflow execution
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum WorkflowEvent {
    /// Workflow execution started
    #[serde(rename_all = "camelCase")]
    WorkflowStarted {
        workflow_id: String,
        execution_id: String,
    },

    /// Workflow execution completed successfully
    #[serde(rename_all = "camelCase")]
    WorkflowCompleted {
        workflow_id: String,
        execution_id: String,
    },

    /// Workflow execution failed
    #[serde(rename_all = "camelCase")]
    WorkflowFailed {
        workflow_id: String,
        execution_id: String,
        error: String,
    },

    /// A node started executing
    #[serde(rename_all = "camelCase")]
    NodeStarted {
        node_id: String,
        execution_id: String,
    },

    /// A node completed successfully
    #[serde(rename_all = "camelCase")]
    NodeCompleted {
        node_id: String,
        execution_id: String,
        output: Option<serde_json::Value>,
    },

    /// A node failed
    #[serde(rename_all = "camelCase")]
    NodeFailed {
        node_id: String,
        execution_id: String,
        error: String,
    },

    /// A node was skipped (disabled, failed upstream, or false condition)
    #[serde(rename_all = "camelCase")]
    NodeSkipped {
        node_id: String,
        execution_id: String,
        reason: String,
    },

    /// Progress update for a node
    #[serde(rename_all = "camelCase")]
    NodeProgress {
        node_id: String,
        execution_id: String,
        progress: f32,
        message: Option<String>,
    },
}

/// A no-op event sink that discards all events
///
/// Useful for testing or when events aren't needed.
pub struct NullEventSink;

impl EventSink for NullEventSink {
    fn send(&self, _event: WorkflowEvent) -> Result<(), EventError> {
        Ok(())
    }
}

/// A vector-based event sink that collects events
///
/// Useful for testing to verify events were emitted correctly.
pub struct VecEventSink {
    events: std::sync::Mutex<Vec<WorkflowEvent>>,
}

impl VecEventSink {
    pub fn new() -> Self {
        Self {
            events: std::sync::Mutex::new(Vec::new()),
        }
    }

    /// Get all collected events
    pub fn events(&self) -> Vec<WorkflowEvent> {
        self.events.lock().unwrap().clone()
    }

    /// Clear all collected events
    pub fn clear(&self) {
        self.events.lock().unwrap().clear();
    }
}

impl Default for VecEventSink {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSink for VecEventSink {
    fn send(&self, event: WorkflowEvent) -> Result<(), EventError> {
        self.events.lock().unwrap().push(event);
        Ok(())
    }
}
