//! Execution record store
//!
//! Tracks every dispatched execution so callers that hit the fire-and-wait
//! timeout can poll the eventual result of the still-running workflow.
//! Records are kept in memory and pruned by age.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use workflow_engine::{ExecutionStatus, WorkflowRunResult};

/// Durable view of one execution
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionRecord {
    pub execution_id: String,
    pub workflow_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trigger_id: Option<String>,
    pub status: ExecutionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outputs: Option<HashMap<String, serde_json::Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub started_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
}

/// In-memory execution store
#[derive(Default)]
pub struct ExecutionStore {
    records: RwLock<HashMap<String, ExecutionRecord>>,
}

impl ExecutionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a freshly dispatched execution as running
    pub async fn insert_running(
        &self,
        execution_id: impl Into<String>,
        workflow_id: impl Into<String>,
        trigger_id: Option<String>,
    ) {
        let execution_id = execution_id.into();
        let record = ExecutionRecord {
            execution_id: execution_id.clone(),
            workflow_id: workflow_id.into(),
            trigger_id,
            status: ExecutionStatus::Running,
            outputs: None,
            error: None,
            started_at: Utc::now(),
            finished_at: None,
        };
        self.records.write().await.insert(execution_id, record);
    }

    /// Finalize a record from an engine result
    pub async fn finish(&self, result: &WorkflowRunResult) {
        let mut records = self.records.write().await;
        if let Some(record) = records.get_mut(&result.execution_id) {
            record.status = result.status;
            record.outputs = Some(result.outputs.clone());
            record.error = result.error.clone();
            record.finished_at = Some(Utc::now());
        }
    }

    /// Finalize a record as failed before the engine produced a result
    pub async fn fail(&self, execution_id: &str, error: impl Into<String>) {
        let mut records = self.records.write().await;
        if let Some(record) = records.get_mut(execution_id) {
            record.status = ExecutionStatus::Failed;
            record.error = Some(error.into());
            record.finished_at = Some(Utc::now());
        }
    }

    /// Fetch a record by execution id
    pub async fn get(&self, execution_id: &str) -> Option<ExecutionRecord> {
        self.records.read().await.get(execution_id).cloned()
    }

    /// Snapshot of every record, newest first
    pub async fn list(&self) -> Vec<ExecutionRecord> {
        let mut records: Vec<ExecutionRecord> =
            self.records.read().await.values().cloned().collect();
        records.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        records
    }

    /// Drop finished records older than `max_age`; returns how many
    pub async fn prune(&self, max_age: Duration) -> usize {
        let cutoff = Utc::now() - max_age;
        let mut records = self.records.write().await;
        let before = records.len();
        records.retain(|_, r| match r.finished_at {
            Some(finished) => finished > cutoff,
            None => true,
        });
        before - records.len()
    }
}
