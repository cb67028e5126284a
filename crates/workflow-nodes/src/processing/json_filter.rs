//! JSON Filter Node
//!
//! Extracts a value from a JSON input using a dot-delimited path
//! expression. Supports object field access (`field.subfield`), array
//! indexing (`[0]`), and combinations (`field[0].subfield`).

use std::collections::HashMap;

use async_trait::async_trait;
use workflow_engine::{
    ExecutionContext, NodeCategory, NodeConfig, NodeDescriptor, NodeProcessor, PortSpec, Result,
};

/// JSON path filter node
///
/// # Inputs
/// - `json` (required) - The JSON value to filter
///
/// # Outputs
/// - `value` - The extracted value (null when not found)
/// - `found` - Whether the path resolved
pub struct JsonFilterNode;

impl JsonFilterNode {
    /// Node type identifier
    pub const NODE_TYPE: &'static str = "json-filter";

    pub fn descriptor() -> NodeDescriptor {
        NodeDescriptor::new(Self::NODE_TYPE, "JSON Filter", NodeCategory::Processing)
            .with_input(PortSpec::required("json", "json"))
            .with_output(PortSpec::optional("value", "json"))
            .with_output(PortSpec::optional("found", "boolean"))
    }
}

#[async_trait]
impl NodeProcessor for JsonFilterNode {
    async fn execute(
        &self,
        config: &NodeConfig,
        context: &ExecutionContext,
    ) -> Result<HashMap<String, serde_json::Value>> {
        let json = context.require_input(&config.id, "json").await?;
        let path = config.config_str("path").unwrap_or("");

        let (value, found) = extract_json_path(&json, path);

        let mut outputs = HashMap::new();
        outputs.insert("value".to_string(), value);
        outputs.insert("found".to_string(), serde_json::json!(found));
        Ok(outputs)
    }
}

/// Extract a value from JSON using a dot-delimited path expression
pub fn extract_json_path(json: &serde_json::Value, path: &str) -> (serde_json::Value, bool) {
    if path.is_empty() {
        return (json.clone(), true);
    }

    let mut current = json;
    let mut remaining = path;

    while !remaining.is_empty() {
        // Handle array indexing: [N]
        if remaining.starts_with('[') {
            if let Some(end) = remaining.find(']') {
                let index_str = &remaining[1..end];
                if let Ok(index) = index_str.parse::<usize>() {
                    if let Some(val) = current.get(index) {
                        current = val;
                        remaining = &remaining[end + 1..];
                        if remaining.starts_with('.') {
                            remaining = &remaining[1..];
                        }
                        continue;
                    }
                }
            }
            return (serde_json::Value::Null, false);
        }

        // Handle object field access
        let (field, rest) = if let Some(dot_pos) = remaining.find('.') {
            let bracket_pos = remaining.find('[').unwrap_or(remaining.len());
            if dot_pos < bracket_pos {
                (&remaining[..dot_pos], &remaining[dot_pos + 1..])
            } else {
                (&remaining[..bracket_pos], &remaining[bracket_pos..])
            }
        } else if let Some(bracket_pos) = remaining.find('[') {
            (&remaining[..bracket_pos], &remaining[bracket_pos..])
        } else {
            (remaining, "")
        };

        if !field.is_empty() {
            if let Some(val) = current.get(field) {
                current = val;
            } else {
                return (serde_json::Value::Null, false);
            }
        }
        remaining = rest;
    }

    (current.clone(), true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use workflow_engine::DenyAllIo;

    #[test]
    fn test_extract_nested_field() {
        let json = serde_json::json!({"data": {"user": {"name": "ada"}}});
        let (value, found) = extract_json_path(&json, "data.user.name");
        assert!(found);
        assert_eq!(value, serde_json::json!("ada"));
    }

    #[test]
    fn test_extract_array_index() {
        let json = serde_json::json!({"items": [{"id": 1}, {"id": 2}]});
        let (value, found) = extract_json_path(&json, "items[1].id");
        assert!(found);
        assert_eq!(value, serde_json::json!(2));
    }

    #[test]
    fn test_missing_path_not_found() {
        let json = serde_json::json!({"a": 1});
        let (value, found) = extract_json_path(&json, "b.c");
        assert!(!found);
        assert!(value.is_null());
    }

    #[tokio::test]
    async fn test_node_extracts_configured_path() {
        let ctx = ExecutionContext::new("exec-1", "wf-1", Arc::new(DenyAllIo));
        ctx.set_input("jf1", "json", serde_json::json!({"mode": "rag"}))
            .await;

        let config = NodeConfig::new("jf1", "Filter", JsonFilterNode::NODE_TYPE)
            .with_config(serde_json::json!({"path": "mode"}));
        let outputs = JsonFilterNode.execute(&config, &ctx).await.unwrap();
        assert_eq!(outputs.get("value"), Some(&serde_json::json!("rag")));
        assert_eq!(outputs.get("found"), Some(&serde_json::json!(true)));
    }
}
