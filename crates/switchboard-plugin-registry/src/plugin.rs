//! Plugin contract and resolution
//!
//! A `NodePlugin` bundles a manifest with the processors implementing its
//! declared nodes. Lifecycle hooks are an explicit interface with default
//! no-op implementations, so registries never probe for optional methods at
//! runtime.
//!
//! Resolution maps a loaded manifest to a live instance. Hosts that load
//! plugins from disk supply their own `PluginResolver`; in-process plugins
//! register constructors through `inventory` and are resolved by name.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use workflow_engine::NodeProcessor;

use crate::error::{RegistryError, Result};
use crate::manifest::PluginManifest;

/// A loaded node-processor plugin
#[async_trait]
pub trait NodePlugin: Send + Sync {
    /// The manifest this plugin was built from
    fn manifest(&self) -> &PluginManifest;

    /// Processor instances keyed by the node ids the manifest declares
    fn processors(&self) -> HashMap<String, Arc<dyn NodeProcessor>>;

    /// Called once after resolution, before any node mapping is published
    async fn initialize(&self) -> Result<()> {
        Ok(())
    }

    /// Called on unregister; must be idempotent and safe to call while an
    /// `initialize` from a failed registration is still unwinding
    async fn cleanup(&self) -> Result<()> {
        Ok(())
    }
}

/// Maps a validated manifest to a plugin instance
pub trait PluginResolver: Send + Sync {
    /// Resolve the implementation for a manifest loaded from `path`
    fn resolve(&self, manifest: &PluginManifest, path: &Path) -> Result<Arc<dyn NodePlugin>>;
}

/// Constructor for an in-process plugin, collected at link time
///
/// Plugin crates submit one of these per plugin:
///
/// ```ignore
/// inventory::submit!(BuiltinPluginFn(my_plugin));
/// ```
pub struct BuiltinPluginFn(pub fn() -> Arc<dyn NodePlugin>);

inventory::collect!(BuiltinPluginFn);

/// Resolver over the `inventory`-collected builtin plugins, keyed by the
/// manifest name each constructor reports
pub struct BuiltinResolver;

impl PluginResolver for BuiltinResolver {
    fn resolve(&self, manifest: &PluginManifest, _path: &Path) -> Result<Arc<dyn NodePlugin>> {
        for entry in inventory::iter::<BuiltinPluginFn> {
            let plugin = (entry.0)();
            if plugin.manifest().name == manifest.name {
                return Ok(plugin);
            }
        }
        Err(RegistryError::PluginLoad {
            name: manifest.name.clone(),
            cause: "no builtin plugin with this name".to_string(),
        })
    }
}

/// Resolver over an explicit name → constructor map, for tests and
/// single-purpose hosts
#[derive(Default)]
pub struct StaticResolver {
    constructors: HashMap<String, Box<dyn Fn() -> Arc<dyn NodePlugin> + Send + Sync>>,
}

impl StaticResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a constructor under a plugin name
    pub fn with(
        mut self,
        name: impl Into<String>,
        constructor: impl Fn() -> Arc<dyn NodePlugin> + Send + Sync + 'static,
    ) -> Self {
        self.constructors.insert(name.into(), Box::new(constructor));
        self
    }
}

impl PluginResolver for StaticResolver {
    fn resolve(&self, manifest: &PluginManifest, _path: &Path) -> Result<Arc<dyn NodePlugin>> {
        self.constructors
            .get(&manifest.name)
            .map(|constructor| constructor())
            .ok_or_else(|| RegistryError::PluginLoad {
                name: manifest.name.clone(),
                cause: "no constructor registered for this name".to_string(),
            })
    }
}
