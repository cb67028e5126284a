//! Template Node
//!
//! Renders a template string from the instance config, substituting
//! `{port}` placeholders with the node's input values.

use std::collections::HashMap;

use async_trait::async_trait;
use workflow_engine::{
    EngineError, ExecutionContext, NodeCategory, NodeConfig, NodeDescriptor, NodeProcessor,
    PortSpec, Result,
};

/// Template rendering node
///
/// # Inputs
/// - any port referenced by a `{placeholder}` in the template
///
/// # Outputs
/// - `text` - The rendered template
pub struct TemplateNode;

impl TemplateNode {
    /// Node type identifier
    pub const NODE_TYPE: &'static str = "template";

    pub fn descriptor() -> NodeDescriptor {
        NodeDescriptor::new(Self::NODE_TYPE, "Template", NodeCategory::Processing)
            .with_output(PortSpec::optional("text", "string"))
    }
}

#[async_trait]
impl NodeProcessor for TemplateNode {
    async fn execute(
        &self,
        config: &NodeConfig,
        context: &ExecutionContext,
    ) -> Result<HashMap<String, serde_json::Value>> {
        let template = config
            .config_str("template")
            .ok_or_else(|| EngineError::failed("template node has no 'template' config"))?;

        let inputs = context.inputs(&config.id).await;
        let mut rendered = template.to_string();
        for (port, value) in &inputs {
            let placeholder = format!("{{{}}}", port);
            let replacement = match value {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            rendered = rendered.replace(&placeholder, &replacement);
        }

        let mut outputs = HashMap::new();
        outputs.insert("text".to_string(), serde_json::json!(rendered));
        Ok(outputs)
    }
}
