//! Plugin discovery, validation, and hot-reload for Switchboard
//!
//! This crate owns the node-type → processor map the execution engine
//! resolves against:
//!
//! - `PluginManifest` / `EventSourceManifest`: JSON manifest models
//! - `ManifestValidator`: pure structural validation with errors/warnings
//! - `NodePlugin`: the plugin contract with default no-op lifecycle hooks
//! - `PluginRegistry`: all-or-nothing registration, idempotent unregister,
//!   and copy-on-write hot-reload without restarting the host process
//!
//! The registry implements `workflow_engine::ProcessorResolver`, so an
//! engine wired to it picks up reloaded plugins on the next node lookup.

pub mod error;
pub mod manifest;
pub mod plugin;
pub mod registry;
pub mod validator;

// Re-export key types
pub use error::{RegistryError, Result};
pub use manifest::{
    EventSourceManifest, EventTypeDescriptor, PluginManifest, PluginType, SourceLifecycle,
};
pub use plugin::{BuiltinPluginFn, BuiltinResolver, NodePlugin, PluginResolver, StaticResolver};
pub use registry::{PluginRegistry, PluginRegistryEntry};
pub use validator::{
    validate_event_source_value, validate_manifest_file, validate_manifest_value,
    ManifestValidator, ValidationReport,
};
