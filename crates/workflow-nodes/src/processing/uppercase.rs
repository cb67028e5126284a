//! Uppercase Node
//!
//! Transforms its text input to uppercase. The canonical minimal
//! processing node, also used as the smoke-test target for end-to-end
//! event → workflow runs.

use std::collections::HashMap;

use async_trait::async_trait;
use workflow_engine::{
    ExecutionContext, NodeCategory, NodeConfig, NodeDescriptor, NodeProcessor, PortSpec, Result,
};

/// Uppercase transform node
///
/// # Inputs
/// - `text` (required) - The text to transform
///
/// # Outputs
/// - `text` - The uppercased text
pub struct UppercaseNode;

impl UppercaseNode {
    /// Node type identifier
    pub const NODE_TYPE: &'static str = "uppercase";

    /// Port name for both input and output
    pub const PORT_TEXT: &'static str = "text";

    pub fn descriptor() -> NodeDescriptor {
        NodeDescriptor::new(Self::NODE_TYPE, "Uppercase", NodeCategory::Processing)
            .with_input(PortSpec::required(Self::PORT_TEXT, "string"))
            .with_output(PortSpec::optional(Self::PORT_TEXT, "string"))
    }
}

#[async_trait]
impl NodeProcessor for UppercaseNode {
    async fn execute(
        &self,
        config: &NodeConfig,
        context: &ExecutionContext,
    ) -> Result<HashMap<String, serde_json::Value>> {
        let text = context.require_input(&config.id, Self::PORT_TEXT).await?;
        let text = text.as_str().unwrap_or_default().to_uppercase();

        let mut outputs = HashMap::new();
        outputs.insert(Self::PORT_TEXT.to_string(), serde_json::json!(text));
        Ok(outputs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use workflow_engine::{DenyAllIo, EngineError};

    fn context() -> ExecutionContext {
        ExecutionContext::new("exec-1", "wf-1", Arc::new(DenyAllIo))
    }

    #[tokio::test]
    async fn test_uppercases_text() {
        let ctx = context();
        ctx.set_input("up1", "text", serde_json::json!("hello")).await;

        let config = NodeConfig::new("up1", "Uppercase", UppercaseNode::NODE_TYPE);
        let outputs = UppercaseNode.execute(&config, &ctx).await.unwrap();
        assert_eq!(outputs.get("text"), Some(&serde_json::json!("HELLO")));
    }

    #[tokio::test]
    async fn test_missing_input_is_typed_error() {
        let ctx = context();
        let config = NodeConfig::new("up1", "Uppercase", UppercaseNode::NODE_TYPE);
        let err = UppercaseNode.execute(&config, &ctx).await.unwrap_err();
        assert!(matches!(err, EngineError::MissingInput { .. }));
    }
}
