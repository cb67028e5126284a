//! The `builtin-nodes` plugin
//!
//! Assembles every built-in processor behind a single plugin manifest so
//! hosts register them the same way they register external plugins. The
//! constructor is submitted through `inventory`, making the plugin
//! resolvable by `BuiltinResolver` without an explicit wiring step.

use std::collections::HashMap;
use std::sync::Arc;

use switchboard_plugin_registry::{BuiltinPluginFn, NodePlugin, PluginManifest};
use workflow_engine::NodeProcessor;

use crate::control::{ConditionalNode, MergeNode};
use crate::input::PassthroughInput;
use crate::output::TextOutputNode;
use crate::processing::{DelayNode, JsonFilterNode, TemplateNode, UppercaseNode};

/// Name of the builtin plugin
pub const BUILTIN_PLUGIN_NAME: &str = "builtin-nodes";

struct BuiltinNodesPlugin {
    manifest: PluginManifest,
}

impl BuiltinNodesPlugin {
    fn new() -> Self {
        let mut manifest = PluginManifest::new(BUILTIN_PLUGIN_NAME, "1.0.0");
        manifest.description = Some("Built-in Switchboard node processors".to_string());
        manifest.author = Some("switchboard".to_string());
        manifest.tags = vec!["builtin".to_string()];
        manifest = manifest
            .with_node(PassthroughInput::descriptor())
            .with_node(UppercaseNode::descriptor())
            .with_node(TemplateNode::descriptor())
            .with_node(JsonFilterNode::descriptor())
            .with_node(DelayNode::descriptor())
            .with_node(TextOutputNode::descriptor())
            .with_node(ConditionalNode::descriptor())
            .with_node(MergeNode::descriptor());

        Self { manifest }
    }
}

impl NodePlugin for BuiltinNodesPlugin {
    fn manifest(&self) -> &PluginManifest {
        &self.manifest
    }

    fn processors(&self) -> HashMap<String, Arc<dyn NodeProcessor>> {
        let mut processors: HashMap<String, Arc<dyn NodeProcessor>> = HashMap::new();
        processors.insert(
            PassthroughInput::NODE_TYPE.to_string(),
            Arc::new(PassthroughInput),
        );
        processors.insert(UppercaseNode::NODE_TYPE.to_string(), Arc::new(UppercaseNode));
        processors.insert(TemplateNode::NODE_TYPE.to_string(), Arc::new(TemplateNode));
        processors.insert(JsonFilterNode::NODE_TYPE.to_string(), Arc::new(JsonFilterNode));
        processors.insert(DelayNode::NODE_TYPE.to_string(), Arc::new(DelayNode));
        processors.insert(TextOutputNode::NODE_TYPE.to_string(), Arc::new(TextOutputNode));
        processors.insert(ConditionalNode::NODE_TYPE.to_string(), Arc::new(ConditionalNode));
        processors.insert(MergeNode::NODE_TYPE.to_string(), Arc::new(MergeNode));
        processors
    }
}

/// Construct the builtin plugin
pub fn builtin_plugin() -> Arc<dyn NodePlugin> {
    Arc::new(BuiltinNodesPlugin::new())
}

inventory::submit!(BuiltinPluginFn(builtin_plugin));
