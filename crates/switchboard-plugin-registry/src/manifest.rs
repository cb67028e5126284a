//! Plugin and event-source manifest models
//!
//! Manifests are JSON documents that describe what a plugin provides: node
//! descriptors for node plugins, event types and lifecycle for event-source
//! plugins. Loading goes through the validator so authors get field-level
//! errors instead of bare parse failures.

use std::path::Path;

use serde::{Deserialize, Serialize};
use workflow_engine::NodeDescriptor;

use crate::error::{RegistryError, Result};
use crate::validator::{validate_manifest_value, ManifestValidator};

/// Kind of plugin a manifest describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PluginType {
    /// Provides node processors
    Node,
    /// Provides an event source
    EventSource,
}

/// Manifest of a node-processor plugin
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PluginManifest {
    /// Unique plugin name; doubles as the registry id
    pub name: String,
    /// Plugin version (semver expected, warned otherwise)
    pub version: String,
    /// Plugin kind
    #[serde(rename = "type")]
    pub plugin_type: PluginType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Node descriptors this plugin provides
    #[serde(default)]
    pub nodes: Vec<NodeDescriptor>,
}

impl PluginManifest {
    /// Create a minimal node-plugin manifest
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            plugin_type: PluginType::Node,
            description: None,
            author: None,
            tags: Vec::new(),
            nodes: Vec::new(),
        }
    }

    /// Add a node descriptor
    pub fn with_node(mut self, node: NodeDescriptor) -> Self {
        self.nodes.push(node);
        self
    }

    /// Load and validate a manifest from a JSON file
    ///
    /// Validation errors fail the load; warnings are logged and kept.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let value: serde_json::Value = serde_json::from_str(&content)?;

        let report = validate_manifest_value(&value);
        if !report.valid {
            let name = value
                .get("name")
                .and_then(|n| n.as_str())
                .unwrap_or("<unnamed>")
                .to_string();
            return Err(RegistryError::ManifestValidation {
                name,
                errors: report.errors,
            });
        }
        for warning in &report.warnings {
            log::warn!("Manifest {}: {}", path.display(), warning);
        }

        Ok(serde_json::from_value(value)?)
    }

    /// Run the structural validator against this manifest
    pub fn validate(&self) -> crate::validator::ValidationReport {
        ManifestValidator::validate(self)
    }
}

/// Lifecycle of an event source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SourceLifecycle {
    /// Started and stopped by explicit API calls
    OnDemand,
    /// Started once at process boot and kept running; the registry does
    /// not restart it on crash
    Persistent,
    /// Started once; self-triggers on an internal timer
    Scheduled,
}

/// An event type an event source can emit
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventTypeDescriptor {
    /// Event type identifier (e.g. "file.created")
    pub id: String,
    /// Human-readable name
    pub name: String,
    /// Names of the payload fields this event carries
    #[serde(default)]
    pub outputs: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Manifest of an event-source plugin
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventSourceManifest {
    pub name: String,
    pub version: String,
    #[serde(rename = "type")]
    pub plugin_type: PluginType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    /// Determines valid state transitions in the source registry
    pub lifecycle: SourceLifecycle,
    /// Event types this source emits
    #[serde(default)]
    pub event_types: Vec<EventTypeDescriptor>,
    /// JSON schema for the source's configuration object
    #[serde(default)]
    pub config_schema: serde_json::Value,
    /// Entry identifier the host resolver uses to locate the implementation
    pub entry: String,
}

impl EventSourceManifest {
    /// Create a minimal event-source manifest
    pub fn new(
        name: impl Into<String>,
        version: impl Into<String>,
        lifecycle: SourceLifecycle,
        entry: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            plugin_type: PluginType::EventSource,
            description: None,
            author: None,
            lifecycle,
            event_types: Vec::new(),
            config_schema: serde_json::Value::Null,
            entry: entry.into(),
        }
    }

    /// Add an event type descriptor
    pub fn with_event_type(mut self, event_type: EventTypeDescriptor) -> Self {
        self.event_types.push(event_type);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_manifest_roundtrip() {
        let manifest = PluginManifest::new("text-tools", "1.2.0").with_node(
            NodeDescriptor::new(
                "uppercase",
                "Uppercase",
                workflow_engine::NodeCategory::Processing,
            ),
        );

        let json = serde_json::to_string(&manifest).unwrap();
        assert!(json.contains("\"type\":\"node\""));

        let parsed: PluginManifest = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.name, "text-tools");
        assert_eq!(parsed.nodes.len(), 1);
    }

    #[test]
    fn test_load_valid_manifest_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("manifest.json");
        let mut file = std::fs::File::create(&path).unwrap();
        write!(
            file,
            r#"{{
                "name": "text-tools",
                "version": "1.0.0",
                "type": "node",
                "nodes": [{{"id": "uppercase", "name": "Uppercase", "category": "processing"}}]
            }}"#
        )
        .unwrap();

        let manifest = PluginManifest::load(&path).unwrap();
        assert_eq!(manifest.name, "text-tools");
        assert_eq!(manifest.nodes[0].id, "uppercase");
    }

    #[test]
    fn test_load_rejects_missing_version() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("manifest.json");
        std::fs::write(
            &path,
            r#"{"name": "broken", "type": "node", "nodes": [{"id": "x", "name": "X", "category": "input"}]}"#,
        )
        .unwrap();

        let err = PluginManifest::load(&path).unwrap_err();
        match err {
            RegistryError::ManifestValidation { name, errors } => {
                assert_eq!(name, "broken");
                assert!(errors.iter().any(|e| e.contains("version")));
            }
            other => panic!("Expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_event_source_manifest_lifecycle_serde() {
        let manifest = EventSourceManifest::new(
            "file-watcher",
            "0.3.0",
            SourceLifecycle::Persistent,
            "file_watcher",
        );
        let json = serde_json::to_string(&manifest).unwrap();
        assert!(json.contains("\"lifecycle\":\"persistent\""));
        assert!(json.contains("\"type\":\"event-source\""));
    }
}
