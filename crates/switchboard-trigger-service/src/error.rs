//! Error types for trigger matching and dispatch

use thiserror::Error;

/// Result type alias using TriggerError
pub type Result<T> = std::result::Result<T, TriggerError>;

/// Errors that can occur while dispatching triggered workflows
#[derive(Debug, Error)]
pub enum TriggerError {
    /// The fire-and-wait caller stopped waiting; the workflow keeps
    /// running and its eventual result lands in the execution store
    #[error("Workflow execution '{execution_id}' did not finish within {timeout_secs}s")]
    WorkflowTimeout {
        execution_id: String,
        timeout_secs: u64,
    },

    /// A matched trigger references a workflow the repository doesn't have
    #[error("Unknown workflow '{0}'")]
    UnknownWorkflow(String),

    /// Engine-level failure (definition error, missing processor)
    #[error(transparent)]
    Engine(#[from] workflow_engine::EngineError),

    /// The spawned execution task died before producing a result
    #[error("Execution task for '{0}' was aborted")]
    ExecutionAborted(String),
}
