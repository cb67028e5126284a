//! Workflow Engine - Graph-based workflow execution for Switchboard
//!
//! This crate provides the execution substrate the rest of the system plugs
//! into:
//!
//! - `NodeProcessor`: the contract every node implementation fulfils
//! - `ExecutionContext`: per-execution data flow, state, logging, and
//!   sandboxed I/O
//! - `WorkflowExecutionEngine`: dependency-ordered DAG execution with
//!   per-node timeouts, retries, and conditional skipping
//! - `EventSink`: generic event streaming (not tied to any host)
//!
//! # Example
//!
//! ```ignore
//! use workflow_engine::{ExecutionContext, WorkflowExecutionEngine};
//!
//! let engine = WorkflowExecutionEngine::new(registry.clone());
//! let result = engine.execute(&definition, &context).await?;
//! ```

pub mod context;
pub mod descriptor;
pub mod engine;
pub mod error;
pub mod events;
pub mod io;
pub mod processor;
pub mod types;

// Re-export key types
pub use context::{ExecutionContext, LogEntry, LogLevel, ProgressEntry};
pub use descriptor::{NodeCategory, NodeDescriptor, PortSpec};
pub use engine::{topological_waves, WorkflowExecutionEngine};
pub use error::{EngineError, Result};
pub use events::{EventSink, NullEventSink, VecEventSink, WorkflowEvent};
pub use io::{DenyAllIo, HostIo, HttpResponse, SandboxPolicy, SandboxedIo};
pub use processor::{NodeProcessor, ProcessorResolver, StaticProcessorMap};
pub use types::{
    Connection, ExecutionStatus, NodeConfig, NodeId, NodeOutcome, WorkflowDefinition,
    WorkflowRunResult,
};
