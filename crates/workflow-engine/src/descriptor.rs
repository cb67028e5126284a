//! Node descriptors and port specifications
//!
//! A descriptor is the single source of truth for a node type: its ports,
//! category, execution constraints, and configuration schema. Plugin
//! manifests embed descriptors, the registry indexes them, and the HTTP
//! catalog serves them.

use serde::{Deserialize, Serialize};

/// Category of a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeCategory {
    /// Input nodes (event payload, external data)
    Input,
    /// Processing nodes (transform, filter, template)
    Processing,
    /// Output nodes (display, export, deliver)
    Output,
    /// Control flow nodes (conditionals, merges)
    Control,
}

/// Specification of a single port on a node
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortSpec {
    /// Port identifier (used in context keys)
    pub name: String,
    /// Data type label (free-form, e.g. "string", "json", "boolean")
    pub data_type: String,
    /// Whether this input must be present at execution time
    #[serde(default)]
    pub required: bool,
}

impl PortSpec {
    /// Create a required port
    pub fn required(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            required: true,
        }
    }

    /// Create an optional port
    pub fn optional(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            required: false,
        }
    }
}

/// Complete metadata for a node type
///
/// Everything needed to validate a workflow that references the node and
/// to enforce its execution constraints (timeout, retries, optionality).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeDescriptor {
    /// Unique type identifier (e.g. "uppercase")
    pub id: String,
    /// Human-readable name
    pub name: String,
    /// Category for grouping
    pub category: NodeCategory,
    /// Input port specifications
    #[serde(default)]
    pub inputs: Vec<PortSpec>,
    /// Output port specifications
    #[serde(default)]
    pub outputs: Vec<PortSpec>,
    /// JSON schema describing the node's `config` object
    #[serde(default)]
    pub config_schema: serde_json::Value,
    /// Whether the processor suspends on I/O
    #[serde(default, rename = "async")]
    pub async_node: bool,
    /// Per-node execution timeout in seconds (none = unbounded)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
    /// Number of retries after a failed (non-timeout) execution
    #[serde(default)]
    pub retry_count: u32,
    /// Whether a failure of this node leaves the workflow alive
    #[serde(default)]
    pub optional: bool,
}

impl NodeDescriptor {
    /// Create a descriptor with empty ports and defaults
    pub fn new(id: impl Into<String>, name: impl Into<String>, category: NodeCategory) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            category,
            inputs: Vec::new(),
            outputs: Vec::new(),
            config_schema: serde_json::Value::Null,
            async_node: false,
            timeout_secs: None,
            retry_count: 0,
            optional: false,
        }
    }

    /// Add an input port
    pub fn with_input(mut self, port: PortSpec) -> Self {
        self.inputs.push(port);
        self
    }

    /// Add an output port
    pub fn with_output(mut self, port: PortSpec) -> Self {
        self.outputs.push(port);
        self
    }

    /// Set the per-node timeout
    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }

    /// Set the retry count
    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retry_count = retries;
        self
    }

    /// Mark the node optional
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_port_spec_constructors() {
        let port = PortSpec::required("text", "string");
        assert_eq!(port.name, "text");
        assert!(port.required);

        let port = PortSpec::optional("meta", "json");
        assert!(!port.required);
    }

    #[test]
    fn test_descriptor_builder() {
        let desc = NodeDescriptor::new("uppercase", "Uppercase", NodeCategory::Processing)
            .with_input(PortSpec::required("text", "string"))
            .with_output(PortSpec::optional("text", "string"))
            .with_timeout_secs(30)
            .with_retries(2);

        assert_eq!(desc.inputs.len(), 1);
        assert_eq!(desc.outputs.len(), 1);
        assert_eq!(desc.timeout_secs, Some(30));
        assert_eq!(desc.retry_count, 2);
        assert!(!desc.optional);
    }

    #[test]
    fn test_descriptor_serialization() {
        let desc = NodeDescriptor::new("uppercase", "Uppercase", NodeCategory::Processing);
        let json = serde_json::to_string(&desc).unwrap();
        assert!(json.contains("uppercase"));
        assert!(json.contains("configSchema")); // camelCase
        assert!(json.contains("\"async\":false"));
    }

    #[test]
    fn test_descriptor_deserialization_defaults() {
        let desc: NodeDescriptor = serde_json::from_str(
            r#"{"id":"sink","name":"Sink","category":"output"}"#,
        )
        .unwrap();
        assert!(desc.inputs.is_empty());
        assert_eq!(desc.retry_count, 0);
        assert!(desc.timeout_secs.is_none());
    }
}
