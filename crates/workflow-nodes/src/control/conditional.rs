//! Conditional Node
//!
//! Routes a value to one of two output ports based on a boolean condition
//! input. Optionally publishes the condition into the execution-scoped
//! state store, where downstream nodes' `condition_key` gates read it.

use std::collections::HashMap;

use async_trait::async_trait;
use workflow_engine::{
    ExecutionContext, NodeCategory, NodeConfig, NodeDescriptor, NodeProcessor, PortSpec, Result,
};

/// Conditional routing node
///
/// # Inputs
/// - `condition` (required) - Boolean selector
/// - `value` (optional) - The value to route
///
/// # Outputs
/// - `true_out` - The value when the condition holds, null otherwise
/// - `false_out` - The value when the condition fails, null otherwise
pub struct ConditionalNode;

impl ConditionalNode {
    /// Node type identifier
    pub const NODE_TYPE: &'static str = "conditional";

    pub fn descriptor() -> NodeDescriptor {
        NodeDescriptor::new(Self::NODE_TYPE, "Conditional", NodeCategory::Control)
            .with_input(PortSpec::required("condition", "boolean"))
            .with_input(PortSpec::optional("value", "json"))
            .with_output(PortSpec::optional("true_out", "json"))
            .with_output(PortSpec::optional("false_out", "json"))
    }
}

#[async_trait]
impl NodeProcessor for ConditionalNode {
    async fn execute(
        &self,
        config: &NodeConfig,
        context: &ExecutionContext,
    ) -> Result<HashMap<String, serde_json::Value>> {
        let condition = context
            .input(&config.id, "condition")
            .await
            .and_then(|c| c.as_bool())
            .unwrap_or(false);

        let value = context
            .input(&config.id, "value")
            .await
            .unwrap_or(serde_json::Value::Null);

        if let Some(state_key) = config.config_str("stateKey") {
            context
                .set_state(state_key, serde_json::json!(condition))
                .await;
        }

        let mut outputs = HashMap::new();
        if condition {
            outputs.insert("true_out".to_string(), value);
            outputs.insert("false_out".to_string(), serde_json::Value::Null);
        } else {
            outputs.insert("true_out".to_string(), serde_json::Value::Null);
            outputs.insert("false_out".to_string(), value);
        }
        Ok(outputs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use workflow_engine::DenyAllIo;

    fn context() -> ExecutionContext {
        ExecutionContext::new("exec-1", "wf-1", Arc::new(DenyAllIo))
    }

    #[tokio::test]
    async fn test_true_routes_to_true_out() {
        let ctx = context();
        ctx.set_input("c1", "condition", serde_json::json!(true)).await;
        ctx.set_input("c1", "value", serde_json::json!("payload")).await;

        let config = NodeConfig::new("c1", "Cond", ConditionalNode::NODE_TYPE);
        let outputs = ConditionalNode.execute(&config, &ctx).await.unwrap();
        assert_eq!(outputs.get("true_out"), Some(&serde_json::json!("payload")));
        assert_eq!(outputs.get("false_out"), Some(&serde_json::Value::Null));
    }

    #[tokio::test]
    async fn test_missing_condition_defaults_false() {
        let ctx = context();
        ctx.set_input("c1", "value", serde_json::json!("payload")).await;

        let config = NodeConfig::new("c1", "Cond", ConditionalNode::NODE_TYPE);
        let outputs = ConditionalNode.execute(&config, &ctx).await.unwrap();
        assert_eq!(outputs.get("false_out"), Some(&serde_json::json!("payload")));
    }

    #[tokio::test]
    async fn test_publishes_condition_to_state() {
        let ctx = context();
        ctx.set_input("c1", "condition", serde_json::json!(true)).await;

        let config = NodeConfig::new("c1", "Cond", ConditionalNode::NODE_TYPE)
            .with_config(serde_json::json!({"stateKey": "branch_taken"}));
        ConditionalNode.execute(&config, &ctx).await.unwrap();
        assert_eq!(ctx.state("branch_taken").await, Some(serde_json::json!(true)));
    }
}
