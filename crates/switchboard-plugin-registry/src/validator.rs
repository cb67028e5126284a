//! Manifest validation
//!
//! Validates manifests against structural rules, collecting every problem
//! found rather than stopping at the first. Validation is a pure function
//! used both at plugin-load time and by author tooling.

use serde_json::Value;

use crate::manifest::{EventSourceManifest, PluginManifest};

/// Allowed node categories, mirrored from `workflow_engine::NodeCategory`
const ALLOWED_CATEGORIES: &[&str] = &["input", "processing", "output", "control"];

/// Allowed event-source lifecycles
const ALLOWED_LIFECYCLES: &[&str] = &["on-demand", "persistent", "scheduled"];

/// Result of validating a manifest
#[derive(Debug, Clone, Default)]
pub struct ValidationReport {
    /// True when no errors were found (warnings don't affect validity)
    pub valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationReport {
    fn finish(errors: Vec<String>, warnings: Vec<String>) -> Self {
        Self {
            valid: errors.is_empty(),
            errors,
            warnings,
        }
    }
}

/// Structural manifest validator
///
/// Stateless; all methods are associated functions.
pub struct ManifestValidator;

impl ManifestValidator {
    /// Validate a parsed node-plugin manifest
    pub fn validate(manifest: &PluginManifest) -> ValidationReport {
        // Serialize back to a value so typed and untyped callers share one
        // rule set.
        let value = serde_json::to_value(manifest).unwrap_or(Value::Null);
        validate_manifest_value(&value)
    }

    /// Validate a parsed event-source manifest
    pub fn validate_event_source(manifest: &EventSourceManifest) -> ValidationReport {
        let value = serde_json::to_value(manifest).unwrap_or(Value::Null);
        validate_event_source_value(&value)
    }
}

/// Validate a raw node-plugin manifest document
pub fn validate_manifest_value(value: &Value) -> ValidationReport {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    check_common_fields(value, &mut errors, &mut warnings);

    let plugin_type = value.get("type").and_then(|t| t.as_str());
    if plugin_type.is_none() {
        errors.push("missing required field: type".to_string());
    }

    match value.get("nodes") {
        Some(Value::Array(nodes)) => {
            if nodes.is_empty() && plugin_type == Some("node") {
                errors.push("node plugin declares no nodes".to_string());
            }
            for (index, node) in nodes.iter().enumerate() {
                validate_node_descriptor(index, node, &mut errors);
            }
        }
        Some(_) => errors.push("field 'nodes' must be an array".to_string()),
        None if plugin_type == Some("node") => {
            errors.push("missing required field: nodes".to_string());
        }
        None => {}
    }

    ValidationReport::finish(errors, warnings)
}

/// Validate a raw event-source manifest document
pub fn validate_event_source_value(value: &Value) -> ValidationReport {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    check_common_fields(value, &mut errors, &mut warnings);

    match value.get("lifecycle").and_then(|l| l.as_str()) {
        Some(lifecycle) if ALLOWED_LIFECYCLES.contains(&lifecycle) => {}
        Some(lifecycle) => errors.push(format!(
            "invalid lifecycle '{}', expected one of {:?}",
            lifecycle, ALLOWED_LIFECYCLES
        )),
        None => errors.push("missing required field: lifecycle".to_string()),
    }

    if value.get("entry").and_then(|e| e.as_str()).map_or(true, str::is_empty) {
        errors.push("missing required field: entry".to_string());
    }

    match value.get("eventTypes") {
        Some(Value::Array(event_types)) => {
            for (index, event_type) in event_types.iter().enumerate() {
                if event_type.get("id").and_then(|i| i.as_str()).map_or(true, str::is_empty) {
                    errors.push(format!("event type at index {} has no id", index));
                }
            }
        }
        Some(_) => errors.push("field 'eventTypes' must be an array".to_string()),
        None => warnings.push("event source declares no event types".to_string()),
    }

    ValidationReport::finish(errors, warnings)
}

/// Validate a manifest file without registering anything
///
/// For author tooling: parse failures come back as report errors, not as
/// a separate error channel.
pub fn validate_manifest_file(path: impl AsRef<std::path::Path>) -> std::io::Result<ValidationReport> {
    let content = std::fs::read_to_string(path)?;
    match serde_json::from_str::<Value>(&content) {
        Ok(value) => Ok(validate_manifest_value(&value)),
        Err(e) => Ok(ValidationReport {
            valid: false,
            errors: vec![format!("manifest is not valid JSON: {}", e)],
            warnings: Vec::new(),
        }),
    }
}

fn check_common_fields(value: &Value, errors: &mut Vec<String>, warnings: &mut Vec<String>) {
    match value.get("name").and_then(|n| n.as_str()) {
        Some(name) if !name.is_empty() => {}
        _ => errors.push("missing required field: name".to_string()),
    }

    match value.get("version").and_then(|v| v.as_str()) {
        Some(version) if !version.is_empty() => {
            if !is_semver(version) {
                warnings.push(format!("version '{}' is not semantic-version formatted", version));
            }
        }
        _ => errors.push("missing required field: version".to_string()),
    }

    if value.get("description").and_then(|d| d.as_str()).map_or(true, str::is_empty) {
        warnings.push("missing description".to_string());
    }
    if value.get("author").and_then(|a| a.as_str()).map_or(true, str::is_empty) {
        warnings.push("missing author".to_string());
    }
}

fn validate_node_descriptor(index: usize, node: &Value, errors: &mut Vec<String>) {
    let id = node.get("id").and_then(|i| i.as_str());
    match id {
        Some(id) if !id.is_empty() => {}
        _ => errors.push(format!("node at index {} has no id", index)),
    }
    let label = id.unwrap_or("<unnamed>");

    if node.get("name").and_then(|n| n.as_str()).map_or(true, str::is_empty) {
        errors.push(format!("node '{}' has no name", label));
    }

    match node.get("category").and_then(|c| c.as_str()) {
        Some(category) if ALLOWED_CATEGORIES.contains(&category) => {}
        Some(category) => errors.push(format!(
            "node '{}' has invalid category '{}', expected one of {:?}",
            label, category, ALLOWED_CATEGORIES
        )),
        None => errors.push(format!("node '{}' has no category", label)),
    }

    for field in ["inputs", "outputs"] {
        if let Some(ports) = node.get(field) {
            if !ports.is_array() {
                errors.push(format!("node '{}' field '{}' must be an array", label, field));
            }
        }
    }
}

/// Loose semantic-version check: `MAJOR.MINOR.PATCH` with numeric components
fn is_semver(version: &str) -> bool {
    let core = version.split(['-', '+']).next().unwrap_or(version);
    let parts: Vec<&str> = core.split('.').collect();
    parts.len() == 3 && parts.iter().all(|p| !p.is_empty() && p.chars().all(|c| c.is_ascii_digit()))
}
