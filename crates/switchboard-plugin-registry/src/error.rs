//! Error types for plugin registration and validation

use thiserror::Error;

/// Result type alias using RegistryError
pub type Result<T> = std::result::Result<T, RegistryError>;

/// Errors that can occur while loading, validating, or reloading plugins
#[derive(Debug, Error)]
pub enum RegistryError {
    /// Manifest failed structural validation; the plugin was not registered
    #[error("Manifest validation failed for '{name}': {errors:?}")]
    ManifestValidation { name: String, errors: Vec<String> },

    /// Plugin initialization failed; the plugin was left unregistered and
    /// other plugins are unaffected
    #[error("Plugin '{name}' failed to load: {cause}")]
    PluginLoad { name: String, cause: String },

    /// The manifest declares a node id with no registered processor
    #[error("Plugin '{plugin}' declares node '{node_type}' but provides no processor for it")]
    MissingProcessor { plugin: String, node_type: String },

    /// A node id collides with one owned by a different plugin
    #[error("Node type '{node_type}' is already registered by plugin '{existing_plugin}'")]
    NodeTypeCollision {
        node_type: String,
        existing_plugin: String,
    },

    /// The referenced plugin id is not registered
    #[error("Unknown plugin '{0}'")]
    UnknownPlugin(String),

    /// Manifest file could not be parsed
    #[error("Manifest parse error: {0}")]
    ManifestParse(#[from] serde_json::Error),

    /// I/O error reading a manifest or plugin path
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
