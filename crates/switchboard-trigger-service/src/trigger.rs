//! Trigger records
//!
//! A trigger is a persisted rule mapping an event type plus conditions to a
//! workflow. Triggers are owned by a persistence layer external to the
//! core; this crate only consumes a read view of them.

use serde::{Deserialize, Serialize};

/// Condition operator applied to a payload field
///
/// `Unknown` absorbs operators this version doesn't know, so one malformed
/// trigger row can't break deserialization of the whole set; unknown
/// operators evaluate to false during matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ConditionOperator {
    Equals,
    NotEquals,
    GreaterThan,
    LessThan,
    In,
    Contains,
    #[serde(other)]
    Unknown,
}

/// A single predicate over the event payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriggerCondition {
    /// Dot-path into the payload (e.g. "data.mode")
    pub field: String,
    pub operator: ConditionOperator,
    pub value: serde_json::Value,
}

impl TriggerCondition {
    pub fn new(
        field: impl Into<String>,
        operator: ConditionOperator,
        value: serde_json::Value,
    ) -> Self {
        Self {
            field: field.into(),
            operator,
            value,
        }
    }
}

/// How a matched workflow is dispatched
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerExecutionMode {
    /// Caller blocks for the result (fire-and-wait)
    Sync,
    /// Scheduled without waiting (fire-and-forget)
    #[default]
    Async,
}

/// A persisted trigger rule, read view of the external trigger table
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trigger {
    pub id: String,
    pub name: String,
    /// Event type this trigger listens for
    pub event_type: String,
    /// When set, only events from this source match
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    /// Workflow to execute on match
    pub workflow_id: String,
    /// All conditions must hold (AND semantics); empty matches every
    /// event of the type
    #[serde(default)]
    pub conditions: Vec<TriggerCondition>,
    /// Node the event payload is seeded into; entry nodes when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_node_id: Option<String>,
    /// Inactive triggers never match
    #[serde(default = "default_active")]
    pub active: bool,
    /// Higher priority wins when multiple triggers match
    #[serde(default)]
    pub priority: i32,
    #[serde(default)]
    pub execution_mode: TriggerExecutionMode,
    /// Fire-and-wait timeout for sync triggers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

fn default_active() -> bool {
    true
}

impl Trigger {
    /// Create an active async trigger with no conditions
    pub fn new(
        id: impl Into<String>,
        event_type: impl Into<String>,
        workflow_id: impl Into<String>,
    ) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            event_type: event_type.into(),
            source: None,
            workflow_id: workflow_id.into(),
            conditions: Vec::new(),
            target_node_id: None,
            active: true,
            priority: 0,
            execution_mode: TriggerExecutionMode::default(),
            timeout_secs: None,
        }
    }

    /// Add a condition
    pub fn with_condition(mut self, condition: TriggerCondition) -> Self {
        self.conditions.push(condition);
        self
    }

    /// Set the priority
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Set the payload target node
    pub fn with_target_node(mut self, node_id: impl Into<String>) -> Self {
        self.target_node_id = Some(node_id.into());
        self
    }

    /// Make this a sync (fire-and-wait) trigger
    pub fn sync(mut self) -> Self {
        self.execution_mode = TriggerExecutionMode::Sync;
        self
    }

    /// Deactivate this trigger
    pub fn inactive(mut self) -> Self {
        self.active = false;
        self
    }
}
