//! Trigger matching and workflow dispatch for Switchboard
//!
//! The coordination layer between event intake and workflow execution:
//!
//! - `Trigger` + `TriggerMatcher`: persisted rules with AND-semantics
//!   conditions, evaluated fail-closed against event payloads
//! - `TriggerService`: fire-and-forget and fire-and-wait dispatch, with a
//!   wait timeout that cancels only the caller's wait, never the workflow
//! - `TriggerRepository` / `WorkflowRepository`: read seams to the external
//!   persistence layer, with in-memory implementations
//! - `ExecutionStore`: execution records for result polling after a
//!   fire-and-wait timeout
//! - `spawn_event_pump`: the consumer task draining the event bus into
//!   dispatch

pub mod error;
pub mod execution;
pub mod matcher;
pub mod service;
pub mod store;
pub mod trigger;

// Re-export key types
pub use error::{Result, TriggerError};
pub use execution::{ExecutionRecord, ExecutionStore};
pub use matcher::TriggerMatcher;
pub use service::{
    spawn_event_pump, FireOutcome, ProcessOutcome, TriggerService, DEFAULT_WAIT_TIMEOUT_SECS,
};
pub use store::{
    InMemoryTriggerRepository, InMemoryWorkflowRepository, TriggerRepository, WorkflowRepository,
};
pub use trigger::{ConditionOperator, Trigger, TriggerCondition, TriggerExecutionMode};
