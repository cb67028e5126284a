//! Text Output Node
//!
//! Terminal node that records its text input as the workflow's visible
//! output and logs it through the execution context.

use std::collections::HashMap;

use async_trait::async_trait;
use workflow_engine::{
    ExecutionContext, LogLevel, NodeCategory, NodeConfig, NodeDescriptor, NodeProcessor, PortSpec,
    Result,
};

/// Text output node
///
/// # Inputs
/// - `text` (optional) - The text to surface
///
/// # Outputs
/// - `text` - The same text, as the workflow's terminal output
pub struct TextOutputNode;

impl TextOutputNode {
    /// Node type identifier
    pub const NODE_TYPE: &'static str = "text-output";

    pub fn descriptor() -> NodeDescriptor {
        NodeDescriptor::new(Self::NODE_TYPE, "Text Output", NodeCategory::Output)
            .with_input(PortSpec::optional("text", "string"))
            .with_output(PortSpec::optional("text", "string"))
    }
}

#[async_trait]
impl NodeProcessor for TextOutputNode {
    async fn execute(
        &self,
        config: &NodeConfig,
        context: &ExecutionContext,
    ) -> Result<HashMap<String, serde_json::Value>> {
        let text = context
            .input(&config.id, "text")
            .await
            .and_then(|v| v.as_str().map(String::from))
            .unwrap_or_default();

        context
            .log(
                LogLevel::Debug,
                format!("Output '{}': {}", config.id, text),
                None,
            )
            .await;

        let mut outputs = HashMap::new();
        outputs.insert("text".to_string(), serde_json::json!(text));
        Ok(outputs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use workflow_engine::DenyAllIo;

    #[tokio::test]
    async fn test_passes_text_through() {
        let ctx = ExecutionContext::new("exec-1", "wf-1", Arc::new(DenyAllIo));
        ctx.set_input("out1", "text", serde_json::json!("done")).await;

        let config = NodeConfig::new("out1", "Output", TextOutputNode::NODE_TYPE);
        let outputs = TextOutputNode.execute(&config, &ctx).await.unwrap();
        assert_eq!(outputs.get("text"), Some(&serde_json::json!("done")));
    }

    #[tokio::test]
    async fn test_empty_input_yields_empty_string() {
        let ctx = ExecutionContext::new("exec-1", "wf-1", Arc::new(DenyAllIo));
        let config = NodeConfig::new("out1", "Output", TextOutputNode::NODE_TYPE);
        let outputs = TextOutputNode.execute(&config, &ctx).await.unwrap();
        assert_eq!(outputs.get("text"), Some(&serde_json::json!("")));
    }
}
