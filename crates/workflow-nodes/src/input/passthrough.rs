//! Passthrough Input Node
//!
//! The entry point of most workflows: whatever the trigger layer (or a
//! direct caller) seeded as inputs on this node is copied through to its
//! outputs unchanged. A `value` object in the instance config provides
//! defaults for ports that were not seeded.

use std::collections::HashMap;

use async_trait::async_trait;
use workflow_engine::{
    ExecutionContext, NodeCategory, NodeConfig, NodeDescriptor, NodeProcessor, PortSpec, Result,
};

/// Passthrough input node
///
/// # Inputs
/// - any port seeded by the trigger layer or caller
///
/// # Outputs
/// - every seeded input, under the same port name
/// - config `value` object entries for ports not seeded
pub struct PassthroughInput;

impl PassthroughInput {
    /// Node type identifier
    pub const NODE_TYPE: &'static str = "input";

    pub fn descriptor() -> NodeDescriptor {
        NodeDescriptor::new(Self::NODE_TYPE, "Input", NodeCategory::Input)
            .with_input(PortSpec::optional("text", "string"))
            .with_output(PortSpec::optional("text", "string"))
    }
}

#[async_trait]
impl NodeProcessor for PassthroughInput {
    async fn execute(
        &self,
        config: &NodeConfig,
        context: &ExecutionContext,
    ) -> Result<HashMap<String, serde_json::Value>> {
        let mut outputs = context.inputs(&config.id).await;

        if let Some(defaults) = config.config.get("value").and_then(|v| v.as_object()) {
            for (port, value) in defaults {
                outputs.entry(port.clone()).or_insert_with(|| value.clone());
            }
        }

        log::debug!(
            "PassthroughInput {}: forwarding {} port(s)",
            config.id,
            outputs.len()
        );
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
    async fn test_forwards_seeded_inputs() {
        let ctx = context();
        ctx.set_input("in1", "text", serde_json::json!("hello")).await;

        let config = NodeConfig::new("in1", "Input", PassthroughInput::NODE_TYPE);
        let outputs = PassthroughInput.execute(&config, &ctx).await.unwrap();
        assert_eq!(outputs.get("text"), Some(&serde_json::json!("hello")));
    }

    #[tokio::test]
    async fn test_config_defaults_fill_missing_ports() {
        let ctx = context();
        let config = NodeConfig::new("in1", "Input", PassthroughInput::NODE_TYPE)
            .with_config(serde_json::json!({"value": {"text": "fallback"}}));

        let outputs = PassthroughInput.execute(&config, &ctx).await.unwrap();
        assert_eq!(outputs.get("text"), Some(&serde_json::json!("fallback")));
    }

    #[tokio::test]
    async fn test_seeded_input_wins_over_default() {
        let ctx = context();
        ctx.set_input("in1", "text", serde_json::json!("seeded")).await;
        let config = NodeConfig::new("in1", "Input", PassthroughInput::NODE_TYPE)
            .with_config(serde_json::json!({"value": {"text": "fallback"}}));

        let outputs = PassthroughInput.execute(&config, &ctx).await.unwrap();
        assert_eq!(outputs.get("text"), Some(&serde_json::json!("seeded")));
    }
}
