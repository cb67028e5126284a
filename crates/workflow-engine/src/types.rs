//! Core types for workflow graphs
//!
//! These types define the structure of workflow definitions: node instances
//! bound to a node type, and the connections that form the data-flow DAG.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Unique identifier for a node instance within a workflow
pub type NodeId = String;

/// A node instance bound into a specific workflow
///
/// Immutable during a single execution; the `config` object is interpreted
/// by the node's processor.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeConfig {
    /// Unique identifier for this node instance
    pub id: NodeId,
    /// Human-readable name
    pub name: String,
    /// Node type (references a registered NodeDescriptor)
    pub node_type: String,
    /// Plugin version this instance was bound against
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Whether this node participates in execution
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Context state key holding a boolean evaluated just before invocation;
    /// false skips the node, and a set key also routes around failed
    /// upstream branches
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition_key: Option<String>,
    /// Instance configuration interpreted by the processor
    #[serde(default)]
    pub config: serde_json::Value,
}

fn default_enabled() -> bool {
    true
}

impl NodeConfig {
    /// Create an enabled node instance with empty config
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        node_type: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            node_type: node_type.into(),
            version: None,
            enabled: true,
            condition_key: None,
            config: serde_json::Value::Null,
        }
    }

    /// Set the instance configuration
    pub fn with_config(mut self, config: serde_json::Value) -> Self {
        self.config = config;
        self
    }

    /// Gate this node on a boolean context state key
    pub fn with_condition_key(mut self, key: impl Into<String>) -> Self {
        self.condition_key = Some(key.into());
        self
    }

    /// Read a string field from the instance config
    pub fn config_str(&self, key: &str) -> Option<&str> {
        self.config.get(key).and_then(|v| v.as_str())
    }

    /// Read a boolean field from the instance config
    pub fn config_bool(&self, key: &str) -> Option<bool> {
        self.config.get(key).and_then(|v| v.as_bool())
    }
}

/// A connection carrying data from one node's output port to another
/// node's input port
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection {
    /// Source node ID
    pub from_node: NodeId,
    /// Source port name
    pub from_port: String,
    /// Target node ID
    pub to_node: NodeId,
    /// Target port name
    pub to_port: String,
}

impl Connection {
    /// Create a connection between two ports
    pub fn new(
        from_node: impl Into<String>,
        from_port: impl Into<String>,
        to_node: impl Into<String>,
        to_port: impl Into<String>,
    ) -> Self {
        Self {
            from_node: from_node.into(),
            from_port: from_port.into(),
            to_node: to_node.into(),
            to_port: to_port.into(),
        }
    }
}

/// A complete workflow definition: the core's read view of the external
/// workflow table
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowDefinition {
    /// Unique identifier for this workflow
    pub id: String,
    /// Human-readable name
    pub name: String,
    /// Node instances in the graph
    pub nodes: Vec<NodeConfig>,
    /// Connections forming the data-flow DAG
    pub connections: Vec<Connection>,
}

impl WorkflowDefinition {
    /// Create a new empty workflow
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            nodes: Vec::new(),
            connections: Vec::new(),
        }
    }

    /// Add a node instance
    pub fn with_node(mut self, node: NodeConfig) -> Self {
        self.nodes.push(node);
        self
    }

    /// Add a connection
    pub fn with_connection(mut self, connection: Connection) -> Self {
        self.connections.push(connection);
        self
    }

    /// Find a node by ID
    pub fn find_node(&self, id: &str) -> Option<&NodeConfig> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// Connections coming into a node
    pub fn incoming<'a, 'b>(
        &'a self,
        node_id: &'b str,
    ) -> impl Iterator<Item = &'a Connection> + 'b
    where
        'a: 'b,
    {
        self.connections.iter().filter(move |c| c.to_node == node_id)
    }

    /// Connections going out of a node
    pub fn outgoing<'a, 'b>(
        &'a self,
        node_id: &'b str,
    ) -> impl Iterator<Item = &'a Connection> + 'b
    where
        'a: 'b,
    {
        self.connections
            .iter()
            .filter(move |c| c.from_node == node_id)
    }

    /// IDs of nodes this node depends on (upstream)
    pub fn dependencies(&self, node_id: &str) -> Vec<NodeId> {
        self.incoming(node_id).map(|c| c.from_node.clone()).collect()
    }

    /// IDs of nodes with no outgoing connections (terminal nodes)
    pub fn terminal_nodes(&self) -> Vec<&NodeConfig> {
        self.nodes
            .iter()
            .filter(|n| self.outgoing(&n.id).next().is_none())
            .collect()
    }
}

/// Terminal status of a workflow execution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    /// Execution is still in flight
    Running,
    /// All non-skipped nodes completed
    Completed,
    /// A required node failed or the definition was invalid
    Failed,
    /// A fire-and-wait caller stopped waiting; the run may still finish
    TimedOut,
}

/// Outcome of a single node within an execution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeOutcome {
    Completed,
    Failed,
    Skipped,
    TimedOut,
}

/// Result of one workflow execution
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowRunResult {
    /// Execution this result belongs to
    pub execution_id: String,
    /// Workflow that was executed
    pub workflow_id: String,
    /// Terminal status
    pub status: ExecutionStatus,
    /// Outputs of terminal nodes, keyed `node_id.port`
    pub outputs: HashMap<String, serde_json::Value>,
    /// Per-node outcomes
    pub node_outcomes: HashMap<NodeId, NodeOutcome>,
    /// Error message when status is failed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Wall-clock execution time
    pub execution_time_ms: u64,
}

impl WorkflowRunResult {
    /// Build a success result
    pub fn success(
        execution_id: impl Into<String>,
        workflow_id: impl Into<String>,
        outputs: HashMap<String, serde_json::Value>,
        node_outcomes: HashMap<NodeId, NodeOutcome>,
        execution_time_ms: u64,
    ) -> Self {
        Self {
            execution_id: execution_id.into(),
            workflow_id: workflow_id.into(),
            status: ExecutionStatus::Completed,
            outputs,
            node_outcomes,
            error: None,
            execution_time_ms,
        }
    }

    /// Build a failure result
    pub fn failure(
        execution_id: impl Into<String>,
        workflow_id: impl Into<String>,
        error: impl Into<String>,
        node_outcomes: HashMap<NodeId, NodeOutcome>,
        execution_time_ms: u64,
    ) -> Self {
        Self {
            execution_id: execution_id.into(),
            workflow_id: workflow_id.into(),
            status: ExecutionStatus::Failed,
            outputs: HashMap::new(),
            node_outcomes,
            error: Some(error.into()),
            execution_time_ms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_node_workflow() -> WorkflowDefinition {
        WorkflowDefinition::new("wf", "Test")
            .with_node(NodeConfig::new("a", "Input", "input"))
            .with_node(NodeConfig::new("b", "Upper", "uppercase"))
            .with_connection(Connection::new("a", "text", "b", "text"))
    }

    #[test]
    fn test_dependencies() {
        let wf = two_node_workflow();
        assert_eq!(wf.dependencies("b"), vec!["a"]);
        assert!(wf.dependencies("a").is_empty());
    }

    #[test]
    fn test_terminal_nodes() {
        let wf = two_node_workflow();
        let terminals = wf.terminal_nodes();
        assert_eq!(terminals.len(), 1);
        assert_eq!(terminals[0].id, "b");
    }

    #[test]
    fn test_node_config_defaults() {
        let node: NodeConfig =
            serde_json::from_str(r#"{"id":"a","name":"A","nodeType":"input"}"#).unwrap();
        assert!(node.enabled);
        assert!(node.condition_key.is_none());
        assert!(node.config.is_null());
    }
}
