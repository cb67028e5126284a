//! Delay Node
//!
//! Sleeps for a configured duration, then passes its inputs through.
//! Used for rate shaping between stages and for exercising per-node and
//! fire-and-wait timeout behavior.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use workflow_engine::{
    ExecutionContext, NodeCategory, NodeConfig, NodeDescriptor, NodeProcessor, Result,
};

/// Delay node
///
/// # Inputs
/// - any port; passed through after the delay
///
/// # Outputs
/// - every input, under the same port name
pub struct DelayNode;

impl DelayNode {
    /// Node type identifier
    pub const NODE_TYPE: &'static str = "delay";

    pub fn descriptor() -> NodeDescriptor {
        NodeDescriptor::new(Self::NODE_TYPE, "Delay", NodeCategory::Processing)
    }
}

#[async_trait]
impl NodeProcessor for DelayNode {
    async fn execute(
        &self,
        config: &NodeConfig,
        context: &ExecutionContext,
    ) -> Result<HashMap<String, serde_json::Value>> {
        let millis = config
            .config
            .get("delayMillis")
            .and_then(|d| d.as_u64())
            .unwrap_or(0);

        if millis > 0 {
            tokio::time::sleep(Duration::from_millis(millis)).await;
        }

        Ok(context.inputs(&config.id).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Instant;
    use workflow_engine::DenyAllIo;

    #[tokio::test]
    async fn test_delays_then_passes_through() {
        let ctx = ExecutionContext::new("exec-1", "wf-1", Arc::new(DenyAllIo));
        ctx.set_input("d1", "text", serde_json::json!("later")).await;

        let config = NodeConfig::new("d1", "Delay", DelayNode::NODE_TYPE)
            .with_config(serde_json::json!({"delayMillis": 30}));

        let start = Instant::now();
        let outputs = DelayNode.execute(&config, &ctx).await.unwrap();
        assert!(start.elapsed() >= Duration::from_millis(30));
        assert_eq!(outputs.get("text"), Some(&serde_json::json!("later")));
    }
}
