//! Node processor contract
//!
//! A processor handles exactly one node type. It reads inputs from the
//! execution context, interprets its `NodeConfig`, and returns its outputs
//! keyed by port name; the engine copies the returned map into the context
//! for downstream nodes.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::context::ExecutionContext;
use crate::descriptor::NodeDescriptor;
use crate::error::Result;
use crate::types::NodeConfig;

/// Per-node-type processor
#[async_trait]
pub trait NodeProcessor: Send + Sync {
    /// Execute this node type with the given instance config and context
    async fn execute(
        &self,
        config: &NodeConfig,
        context: &ExecutionContext,
    ) -> Result<HashMap<String, serde_json::Value>>;
}

/// Resolves node types to processors and descriptors
///
/// The seam between the engine and whatever owns the processor map (the
/// plugin registry in production, a plain map in tests). Implementations
/// must be read-consistent: an execution in flight never observes a
/// half-updated set of node types.
pub trait ProcessorResolver: Send + Sync {
    /// Look up the processor for a node type
    fn processor(&self, node_type: &str) -> Option<Arc<dyn NodeProcessor>>;

    /// Look up the descriptor for a node type
    fn descriptor(&self, node_type: &str) -> Option<NodeDescriptor>;
}

/// A fixed map resolver for tests and single-purpose hosts
#[derive(Default)]
pub struct StaticProcessorMap {
    entries: HashMap<String, (NodeDescriptor, Arc<dyn NodeProcessor>)>,
}

impl StaticProcessorMap {
    /// Create an empty map
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a processor under its descriptor's node type
    pub fn insert(&mut self, descriptor: NodeDescriptor, processor: Arc<dyn NodeProcessor>) {
        self.entries
            .insert(descriptor.id.clone(), (descriptor, processor));
    }

    /// Builder-style insert
    pub fn with(mut self, descriptor: NodeDescriptor, processor: Arc<dyn NodeProcessor>) -> Self {
        self.insert(descriptor, processor);
        self
    }
}

impl ProcessorResolver for StaticProcessorMap {
    fn processor(&self, node_type: &str) -> Option<Arc<dyn NodeProcessor>> {
        self.entries.get(node_type).map(|(_, p)| p.clone())
    }

    fn descriptor(&self, node_type: &str) -> Option<NodeDescriptor> {
        self.entries.get(node_type).map(|(d, _)| d.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::NodeCategory;
    use crate::io::DenyAllIo;

    struct EchoProcessor;

    #[async_trait]
    impl NodeProcessor for EchoProcessor {
        async fn execute(
            &self,
            config: &NodeConfig,
            context: &ExecutionContext,
        ) -> Result<HashMap<String, serde_json::Value>> {
            Ok(context.inputs(&config.id).await)
        }
    }

    #[tokio::test]
    async fn test_static_map_lookup() {
        let map = StaticProcessorMap::new().with(
            NodeDescriptor::new("echo", "Echo", NodeCategory::Processing),
            Arc::new(EchoProcessor),
        );

        assert!(map.processor("echo").is_some());
        assert!(map.processor("missing").is_none());
        assert_eq!(map.descriptor("echo").unwrap().id, "echo");
    }

    #[tokio::test]
    async fn test_echo_roundtrip() {
        let map = StaticProcessorMap::new().with(
            NodeDescriptor::new("echo", "Echo", NodeCategory::Processing),
            Arc::new(EchoProcessor),
        );
        let ctx = ExecutionContext::new("exec-1", "wf-1", Arc::new(DenyAllIo));
        ctx.set_input("n1", "value", serde_json::json!("hello")).await;

        let processor = map.processor("echo").unwrap();
        let config = NodeConfig::new("n1", "Echo", "echo");
        let outputs = processor.execute(&config, &ctx).await.unwrap();
        assert_eq!(outputs.get("value"), Some(&serde_json::json!("hello")));
    }
}
