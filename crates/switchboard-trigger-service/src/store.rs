//! Trigger and workflow repositories
//!
//! The persistence backend is external to the core; these traits are the
//! read seams it plugs into. The in-memory implementations back tests and
//! single-process deployments.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use workflow_engine::WorkflowDefinition;

use crate::trigger::Trigger;

/// Read view of the external trigger table
#[async_trait]
pub trait TriggerRepository: Send + Sync {
    /// All triggers listening for an event type (active or not; the
    /// matcher filters)
    async fn triggers_for_event(&self, event_type: &str) -> Vec<Trigger>;

    /// Every stored trigger
    async fn all_triggers(&self) -> Vec<Trigger>;
}

/// Read view of the external workflow table
#[async_trait]
pub trait WorkflowRepository: Send + Sync {
    /// Fetch a workflow definition by id
    async fn workflow(&self, id: &str) -> Option<WorkflowDefinition>;
}

/// In-memory trigger store
#[derive(Default)]
pub struct InMemoryTriggerRepository {
    triggers: RwLock<Vec<Trigger>>,
}

impl InMemoryTriggerRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a trigger by id
    pub async fn upsert(&self, trigger: Trigger) {
        let mut triggers = self.triggers.write().await;
        if let Some(existing) = triggers.iter_mut().find(|t| t.id == trigger.id) {
            *existing = trigger;
        } else {
            triggers.push(trigger);
        }
    }

    /// Remove a trigger by id
    pub async fn remove(&self, id: &str) {
        self.triggers.write().await.retain(|t| t.id != id);
    }
}

#[async_trait]
impl TriggerRepository for InMemoryTriggerRepository {
    async fn triggers_for_event(&self, event_type: &str) -> Vec<Trigger> {
        self.triggers
            .read()
            .await
            .iter()
            .filter(|t| t.event_type == event_type)
            .cloned()
            .collect()
    }

    async fn all_triggers(&self) -> Vec<Trigger> {
        self.triggers.read().await.clone()
    }
}

/// In-memory workflow store
#[derive(Default)]
pub struct InMemoryWorkflowRepository {
    workflows: RwLock<HashMap<String, WorkflowDefinition>>,
}

impl InMemoryWorkflowRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a workflow definition
    pub async fn upsert(&self, workflow: WorkflowDefinition) {
        self.workflows
            .write()
            .await
            .insert(workflow.id.clone(), workflow);
    }
}

#[async_trait]
impl WorkflowRepository for InMemoryWorkflowRepository {
    async fn workflow(&self, id: &str) -> Option<WorkflowDefinition> {
        self.workflows.read().await.get(id).cloned()
    }
}
