//! Per-execution context shared by node processors
//!
//! An `ExecutionContext` is created when a workflow execution starts and
//! discarded when it completes. It carries the `(node_id, port)` data-flow
//! maps, an execution-scoped key/value state store, accumulated log and
//! progress entries, and sandboxed I/O helpers. Contexts are never shared
//! across executions.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::error::{EngineError, Result};
use crate::io::{HttpResponse, SandboxedIo};
use crate::types::NodeId;

/// Severity of a context log entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

/// A log entry recorded by a node processor
///
/// Observational only; log entries never affect data or control flow.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    pub level: LogLevel,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
    pub timestamp: DateTime<Utc>,
}

/// A progress report recorded by a node processor
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressEntry {
    /// Completion percentage in `[0, 100]`
    pub percentage: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Default)]
struct ContextState {
    /// Input values keyed by `(node_id, port)`
    inputs: HashMap<(NodeId, String), serde_json::Value>,
    /// Output values keyed by `(node_id, port)`
    outputs: HashMap<(NodeId, String), serde_json::Value>,
    /// Execution-scoped key/value store, visible to all nodes of this run
    state: HashMap<String, serde_json::Value>,
    logs: Vec<LogEntry>,
    progress: Vec<ProgressEntry>,
}

/// Per-execution context handed to every node processor
///
/// Cloning is cheap; clones share the same underlying state so that
/// concurrently running sibling branches observe a single data-flow map.
#[derive(Clone)]
pub struct ExecutionContext {
    execution_id: String,
    workflow_id: String,
    state: Arc<RwLock<ContextState>>,
    io: Arc<dyn SandboxedIo>,
}

impl ExecutionContext {
    /// Create a context with the given sandboxed I/O implementation
    pub fn new(
        execution_id: impl Into<String>,
        workflow_id: impl Into<String>,
        io: Arc<dyn SandboxedIo>,
    ) -> Self {
        Self {
            execution_id: execution_id.into(),
            workflow_id: workflow_id.into(),
            state: Arc::new(RwLock::new(ContextState::default())),
            io,
        }
    }

    /// Execution this context belongs to
    pub fn execution_id(&self) -> &str {
        &self.execution_id
    }

    /// Workflow this context belongs to
    pub fn workflow_id(&self) -> &str {
        &self.workflow_id
    }

    // -----------------------------------------------------------------------
    // Data flow
    // -----------------------------------------------------------------------

    /// Get a single input value for a node
    ///
    /// Reading an input that was never set returns `None`, not an error.
    pub async fn input(&self, node_id: &str, port: &str) -> Option<serde_json::Value> {
        let state = self.state.read().await;
        state
            .inputs
            .get(&(node_id.to_string(), port.to_string()))
            .cloned()
    }

    /// Get the full input map for a node, keyed by port name
    pub async fn inputs(&self, node_id: &str) -> HashMap<String, serde_json::Value> {
        let state = self.state.read().await;
        state
            .inputs
            .iter()
            .filter(|((id, _), _)| id == node_id)
            .map(|((_, port), value)| (port.clone(), value.clone()))
            .collect()
    }

    /// Get a required input, failing with `MissingInput` if absent
    pub async fn require_input(&self, node_id: &str, port: &str) -> Result<serde_json::Value> {
        self.input(node_id, port)
            .await
            .ok_or_else(|| EngineError::MissingInput {
                node_id: node_id.to_string(),
                port: port.to_string(),
            })
    }

    /// Set an input value for a node
    ///
    /// Used by the engine when propagating upstream outputs along
    /// connections, and by hosts seeding entry-node inputs.
    pub async fn set_input(&self, node_id: &str, port: &str, value: serde_json::Value) {
        let mut state = self.state.write().await;
        state
            .inputs
            .insert((node_id.to_string(), port.to_string()), value);
    }

    /// Set an output value for a node; last writer wins within an execution
    pub async fn set_output(&self, node_id: &str, port: &str, value: serde_json::Value) {
        let mut state = self.state.write().await;
        state
            .outputs
            .insert((node_id.to_string(), port.to_string()), value);
    }

    /// Get an output value previously written by a node
    pub async fn output(&self, node_id: &str, port: &str) -> Option<serde_json::Value> {
        let state = self.state.read().await;
        state
            .outputs
            .get(&(node_id.to_string(), port.to_string()))
            .cloned()
    }

    /// Get all outputs written by a node, keyed by port name
    pub async fn node_outputs(&self, node_id: &str) -> HashMap<String, serde_json::Value> {
        let state = self.state.read().await;
        state
            .outputs
            .iter()
            .filter(|((id, _), _)| id == node_id)
            .map(|((_, port), value)| (port.clone(), value.clone()))
            .collect()
    }

    // -----------------------------------------------------------------------
    // Execution-scoped state
    // -----------------------------------------------------------------------

    /// Get a value from the execution-scoped state store
    pub async fn state(&self, key: &str) -> Option<serde_json::Value> {
        let state = self.state.read().await;
        state.state.get(key).cloned()
    }

    /// Set a value in the execution-scoped state store
    pub async fn set_state(&self, key: impl Into<String>, value: serde_json::Value) {
        let mut state = self.state.write().await;
        state.state.insert(key.into(), value);
    }

    // -----------------------------------------------------------------------
    // Observational side channels
    // -----------------------------------------------------------------------

    /// Record a log entry and mirror it to the process logger
    pub async fn log(
        &self,
        level: LogLevel,
        message: impl Into<String>,
        metadata: Option<serde_json::Value>,
    ) {
        let message = message.into();
        match level {
            LogLevel::Debug => log::debug!("[{}] {}", self.execution_id, message),
            LogLevel::Info => log::info!("[{}] {}", self.execution_id, message),
            LogLevel::Warn => log::warn!("[{}] {}", self.execution_id, message),
            LogLevel::Error => log::error!("[{}] {}", self.execution_id, message),
        }
        let mut state = self.state.write().await;
        state.logs.push(LogEntry {
            level,
            message,
            metadata,
            timestamp: Utc::now(),
        });
    }

    /// Record a progress report; the percentage is clamped to `[0, 100]`
    pub async fn report_progress(&self, percentage: f32, message: Option<String>) {
        let mut state = self.state.write().await;
        state.progress.push(ProgressEntry {
            percentage: percentage.clamp(0.0, 100.0),
            message,
            timestamp: Utc::now(),
        });
    }

    /// Snapshot of all recorded log entries
    pub async fn logs(&self) -> Vec<LogEntry> {
        self.state.read().await.logs.clone()
    }

    /// Snapshot of all recorded progress reports
    pub async fn progress(&self) -> Vec<ProgressEntry> {
        self.state.read().await.progress.clone()
    }

    // -----------------------------------------------------------------------
    // Sandboxed I/O
    // -----------------------------------------------------------------------

    /// Read a file through the host's sandbox policy
    pub async fn read_file(&self, path: impl AsRef<Path>) -> Result<String> {
        self.io.read_file(path.as_ref()).await
    }

    /// Write a file through the host's sandbox policy
    pub async fn write_file(&self, path: impl AsRef<Path>, contents: &str) -> Result<()> {
        self.io.write_file(path.as_ref(), contents).await
    }

    /// Perform an outbound HTTP request through the host's sandbox policy
    pub async fn http_request(
        &self,
        method: &str,
        url: &str,
        body: Option<serde_json::Value>,
    ) -> Result<HttpResponse> {
        self.io.http_request(method, url, body).await
    }
}
