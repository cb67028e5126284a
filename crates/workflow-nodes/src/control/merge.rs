//! Merge Node
//!
//! Joins text arriving on any input port into a single newline-separated
//! string. Empty and null inputs are dropped.

use std::collections::HashMap;

use async_trait::async_trait;
use workflow_engine::{
    ExecutionContext, NodeCategory, NodeConfig, NodeDescriptor, NodeProcessor, PortSpec, Result,
};

/// Merge node
///
/// # Inputs
/// - any port; string values are collected in port-name order
///
/// # Outputs
/// - `merged` - The joined string
/// - `count` - Number of non-empty inputs merged
pub struct MergeNode;

impl MergeNode {
    /// Node type identifier
    pub const NODE_TYPE: &'static str = "merge";

    pub fn descriptor() -> NodeDescriptor {
        NodeDescriptor::new(Self::NODE_TYPE, "Merge", NodeCategory::Control)
            .with_output(PortSpec::optional("merged", "string"))
            .with_output(PortSpec::optional("count", "number"))
    }
}

#[async_trait]
impl NodeProcessor for MergeNode {
    async fn execute(
        &self,
        config: &NodeConfig,
        context: &ExecutionContext,
    ) -> Result<HashMap<String, serde_json::Value>> {
        let inputs = context.inputs(&config.id).await;

        // Port-name order keeps merges deterministic across runs
        let mut ports: Vec<&String> = inputs.keys().collect();
        ports.sort();

        let values: Vec<String> = ports
            .iter()
            .filter_map(|port| inputs[*port].as_str().map(String::from))
            .filter(|s| !s.trim().is_empty())
            .collect();

        let mut outputs = HashMap::new();
        outputs.insert("merged".to_string(), serde_json::json!(values.join("\n")));
        outputs.insert("count".to_string(), serde_json::json!(values.len()));
        Ok(outputs)
    }
}
