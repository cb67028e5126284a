//! Hot-reloadable node processor registry
//!
//! The registry owns the node-type → processor map shared by every
//! concurrent execution. The map is copy-on-write: readers clone an `Arc`
//! snapshot and writers publish a fully-built replacement in one swap, so
//! an execution in flight never observes a half-updated set of node types.
//!
//! All registration is all-or-nothing: a plugin whose manifest fails
//! validation, whose `initialize()` fails, or whose node ids collide with
//! another plugin leaves the registry exactly as it was.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use workflow_engine::{NodeDescriptor, NodeProcessor, ProcessorResolver};

use crate::error::{RegistryError, Result};
use crate::manifest::PluginManifest;
use crate::plugin::{NodePlugin, PluginResolver};
use crate::validator::{ManifestValidator, ValidationReport};

/// One node type's binding in the shared snapshot
#[derive(Clone)]
struct NodeBinding {
    plugin_id: String,
    descriptor: NodeDescriptor,
    processor: Arc<dyn NodeProcessor>,
}

type NodeMap = HashMap<String, NodeBinding>;

/// Public view of a registered plugin
#[derive(Debug, Clone)]
pub struct PluginRegistryEntry {
    /// Registry id (the manifest name)
    pub id: String,
    pub version: String,
    /// Manifest path for file-backed plugins; `None` for in-process ones
    pub path: Option<PathBuf>,
    pub manifest: PluginManifest,
    pub loaded: bool,
    pub last_modified: Option<DateTime<Utc>>,
}

struct EntryState {
    info: PluginRegistryEntry,
    instance: Arc<dyn NodePlugin>,
}

/// Registry of node-processor plugins
pub struct PluginRegistry {
    resolver: Arc<dyn PluginResolver>,
    entries: RwLock<HashMap<String, EntryState>>,
    nodes: RwLock<Arc<NodeMap>>,
}

impl PluginRegistry {
    /// Create a registry that resolves file-backed plugins through the
    /// given resolver
    pub fn new(resolver: Arc<dyn PluginResolver>) -> Self {
        Self {
            resolver,
            entries: RwLock::new(HashMap::new()),
            nodes: RwLock::new(Arc::new(HashMap::new())),
        }
    }

    /// Load, validate, and register a plugin from a manifest path
    pub async fn register(&self, path: impl AsRef<Path>) -> Result<PluginRegistryEntry> {
        let path = path.as_ref();
        let manifest = PluginManifest::load(path)?;
        let last_modified = std::fs::metadata(path)
            .and_then(|m| m.modified())
            .ok()
            .map(DateTime::<Utc>::from);

        let instance = self.resolver.resolve(&manifest, path)?;
        self.install(manifest, instance, Some(path.to_path_buf()), last_modified)
            .await
    }

    /// Register an in-process plugin instance
    ///
    /// The manifest comes from the plugin itself; the same validation and
    /// collision rules apply as for file-backed plugins.
    pub async fn register_plugin(
        &self,
        plugin: Arc<dyn NodePlugin>,
    ) -> Result<PluginRegistryEntry> {
        let manifest = plugin.manifest().clone();
        let report = ManifestValidator::validate(&manifest);
        if !report.valid {
            return Err(RegistryError::ManifestValidation {
                name: manifest.name,
                errors: report.errors,
            });
        }
        self.install(manifest, plugin, None, None).await
    }

    /// Unregister a plugin, removing every node mapping it owned
    ///
    /// Idempotent: unregistering an unknown id is a no-op.
    pub async fn unregister(&self, id: &str) {
        let removed = {
            let mut entries = self.entries.write();
            let removed = entries.remove(id);
            if removed.is_some() {
                let mut nodes = self.nodes.write();
                let next: NodeMap = nodes
                    .iter()
                    .filter(|(_, binding)| binding.plugin_id != id)
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect();
                *nodes = Arc::new(next);
            }
            removed
        };

        if let Some(state) = removed {
            if let Err(e) = state.instance.cleanup().await {
                log::warn!("Plugin '{}' cleanup failed: {}", id, e);
            }
            log::info!("Unregistered plugin '{}'", id);
        }
    }

    /// Reload a file-backed plugin against its original manifest path
    ///
    /// The new instance is fully prepared before the old one is torn down;
    /// the node map update is a single swap, so readers of *other* plugins'
    /// node types are never affected and readers of this plugin's types see
    /// either the old or the new mapping, never a gap.
    pub async fn reload(&self, id: &str) -> Result<PluginRegistryEntry> {
        let path = {
            let entries = self.entries.read();
            let state = entries
                .get(id)
                .ok_or_else(|| RegistryError::UnknownPlugin(id.to_string()))?;
            state.info.path.clone().ok_or_else(|| RegistryError::PluginLoad {
                name: id.to_string(),
                cause: "plugin is not file-backed and cannot be reloaded".to_string(),
            })?
        };

        let manifest = PluginManifest::load(&path)?;
        if manifest.name != id {
            return Err(RegistryError::PluginLoad {
                name: id.to_string(),
                cause: format!("manifest at {} now names '{}'", path.display(), manifest.name),
            });
        }
        let last_modified = std::fs::metadata(&path)
            .and_then(|m| m.modified())
            .ok()
            .map(DateTime::<Utc>::from);

        let instance = self.resolver.resolve(&manifest, &path)?;
        let bindings = collect_bindings(&manifest, instance.as_ref())?;
        if let Err(e) = instance.initialize().await {
            return Err(RegistryError::PluginLoad {
                name: manifest.name,
                cause: e.to_string(),
            });
        }

        let info = PluginRegistryEntry {
            id: manifest.name.clone(),
            version: manifest.version.clone(),
            path: Some(path),
            manifest,
            loaded: true,
            last_modified,
        };

        let old = {
            let mut entries = self.entries.write();
            let mut nodes = self.nodes.write();

            // Rebuild from the current snapshot: drop this plugin's old
            // bindings, then add the new ones, checking collisions against
            // everything else.
            let mut next: NodeMap = nodes
                .iter()
                .filter(|(_, binding)| binding.plugin_id != id)
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect();
            for (node_type, binding) in &bindings {
                if let Some(existing) = next.get(node_type) {
                    return Err(RegistryError::NodeTypeCollision {
                        node_type: node_type.clone(),
                        existing_plugin: existing.plugin_id.clone(),
                    });
                }
                next.insert(node_type.clone(), binding.clone());
            }

            *nodes = Arc::new(next);
            entries.insert(
                id.to_string(),
                EntryState {
                    info: info.clone(),
                    instance,
                },
            )
        };

        if let Some(old) = old {
            if let Err(e) = old.instance.cleanup().await {
                log::warn!("Plugin '{}' cleanup after reload failed: {}", id, e);
            }
        }
        log::info!("Reloaded plugin '{}' v{}", info.id, info.version);
        Ok(info)
    }

    /// Look up the processor for a node type against the current snapshot
    pub fn processor(&self, node_type: &str) -> Option<Arc<dyn NodeProcessor>> {
        self.snapshot().get(node_type).map(|b| b.processor.clone())
    }

    /// Look up the descriptor for a node type
    pub fn descriptor(&self, node_type: &str) -> Option<NodeDescriptor> {
        self.snapshot().get(node_type).map(|b| b.descriptor.clone())
    }

    /// Check whether a node type is registered
    pub fn has_node_type(&self, node_type: &str) -> bool {
        self.snapshot().contains_key(node_type)
    }

    /// All registered node descriptors, sorted by id
    pub fn node_catalog(&self) -> Vec<NodeDescriptor> {
        let snapshot = self.snapshot();
        let mut catalog: Vec<NodeDescriptor> =
            snapshot.values().map(|b| b.descriptor.clone()).collect();
        catalog.sort_by(|a, b| a.id.cmp(&b.id));
        catalog
    }

    /// Public views of all registered plugins
    pub fn plugins(&self) -> Vec<PluginRegistryEntry> {
        self.entries.read().values().map(|s| s.info.clone()).collect()
    }

    /// Re-run the manifest validator across all registered entries
    ///
    /// Used for health reporting; has no side effects.
    pub fn validate_all(&self) -> Vec<(String, ValidationReport)> {
        self.entries
            .read()
            .values()
            .map(|s| (s.info.id.clone(), ManifestValidator::validate(&s.info.manifest)))
            .collect()
    }

    fn snapshot(&self) -> Arc<NodeMap> {
        self.nodes.read().clone()
    }

    /// Common registration tail: bind nodes, initialize, publish
    async fn install(
        &self,
        manifest: PluginManifest,
        instance: Arc<dyn NodePlugin>,
        path: Option<PathBuf>,
        last_modified: Option<DateTime<Utc>>,
    ) -> Result<PluginRegistryEntry> {
        if self.entries.read().contains_key(&manifest.name) {
            return Err(RegistryError::PluginLoad {
                name: manifest.name,
                cause: "a plugin with this name is already registered".to_string(),
            });
        }

        let bindings = collect_bindings(&manifest, instance.as_ref())?;

        if let Err(e) = instance.initialize().await {
            return Err(RegistryError::PluginLoad {
                name: manifest.name,
                cause: e.to_string(),
            });
        }

        let info = PluginRegistryEntry {
            id: manifest.name.clone(),
            version: manifest.version.clone(),
            path,
            manifest,
            loaded: true,
            last_modified,
        };

        {
            let mut entries = self.entries.write();
            // Re-check under the write lock; a concurrent register of the
            // same name loses here instead of overwriting.
            if entries.contains_key(&info.id) {
                return Err(RegistryError::PluginLoad {
                    name: info.id.clone(),
                    cause: "a plugin with this name is already registered".to_string(),
                });
            }

            let mut nodes = self.nodes.write();
            let mut next: NodeMap = nodes.as_ref().clone();
            for (node_type, binding) in &bindings {
                if let Some(existing) = next.get(node_type) {
                    return Err(RegistryError::NodeTypeCollision {
                        node_type: node_type.clone(),
                        existing_plugin: existing.plugin_id.clone(),
                    });
                }
                next.insert(node_type.clone(), binding.clone());
            }

            *nodes = Arc::new(next);
            entries.insert(
                info.id.clone(),
                EntryState {
                    info: info.clone(),
                    instance,
                },
            );
        }

        log::info!(
            "Registered plugin '{}' v{} ({} node types)",
            info.id,
            info.version,
            bindings.len()
        );
        Ok(info)
    }
}

impl ProcessorResolver for PluginRegistry {
    fn processor(&self, node_type: &str) -> Option<Arc<dyn NodeProcessor>> {
        PluginRegistry::processor(self, node_type)
    }

    fn descriptor(&self, node_type: &str) -> Option<NodeDescriptor> {
        PluginRegistry::descriptor(self, node_type)
    }
}

/// Pair every manifest node with its processor instance
///
/// A manifest node with no processor is an error; a processor with no
/// manifest entry is a warning only.
fn collect_bindings(
    manifest: &PluginManifest,
    instance: &dyn NodePlugin,
) -> Result<Vec<(String, NodeBinding)>> {
    let mut processors = instance.processors();
    let mut bindings = Vec::with_capacity(manifest.nodes.len());

    for descriptor in &manifest.nodes {
        let processor = processors.remove(&descriptor.id).ok_or_else(|| {
            RegistryError::MissingProcessor {
                plugin: manifest.name.clone(),
                node_type: descriptor.id.clone(),
            }
        })?;
        bindings.push((
            descriptor.id.clone(),
            NodeBinding {
                plugin_id: manifest.name.clone(),
                descriptor: descriptor.clone(),
                processor,
            },
        ));
    }

    for orphan in processors.keys() {
        log::warn!(
            "Plugin '{}' provides processor '{}' with no manifest entry",
            manifest.name,
            orphan
        );
    }

    Ok(bindings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugin::StaticResolver;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};
    use workflow_engine::{ExecutionContext, NodeCategory, NodeConfig, PortSpec};

    struct NoopProcessor;

    #[async_trait]
    impl NodeProcessor for NoopProcessor {
        async fn execute(
            &self,
            _config: &NodeConfig,
            _context: &ExecutionContext,
        ) -> workflow_engine::Result<HashMap<String, serde_json::Value>> {
            Ok(HashMap::new())
        }
    }

    struct TestPlugin {
        manifest: PluginManifest,
        node_ids: Vec<String>,
        fail_init: bool,
        cleanups: Arc<AtomicU32>,
    }

    #[async_trait]
    impl NodePlugin for TestPlugin {
        fn manifest(&self) -> &PluginManifest {
            &self.manifest
        }

        fn processors(&self) -> HashMap<String, Arc<dyn NodeProcessor>> {
            self.node_ids
                .iter()
                .map(|id| (id.clone(), Arc::new(NoopProcessor) as Arc<dyn NodeProcessor>))
                .collect()
        }

        async fn initialize(&self) -> Result<()> {
            if self.fail_init {
                Err(RegistryError::PluginLoad {
                    name: self.manifest.name.clone(),
                    cause: "init exploded".to_string(),
                })
            } else {
                Ok(())
            }
        }

        async fn cleanup(&self) -> Result<()> {
            self.cleanups.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn test_manifest(name: &str, node_ids: &[&str]) -> PluginManifest {
        let mut manifest = PluginManifest::new(name, "1.0.0");
        manifest.description = Some("test plugin".to_string());
        manifest.author = Some("tests".to_string());
        for id in node_ids {
            manifest = manifest.with_node(
                NodeDescriptor::new(*id, *id, NodeCategory::Processing)
                    .with_input(PortSpec::optional("in", "json"))
                    .with_output(PortSpec::optional("out", "json")),
            );
        }
        manifest
    }

    fn test_plugin(name: &str, node_ids: &[&str]) -> Arc<dyn NodePlugin> {
        Arc::new(TestPlugin {
            manifest: test_manifest(name, node_ids),
            node_ids: node_ids.iter().map(|s| s.to_string()).collect(),
            fail_init: false,
            cleanups: Arc::new(AtomicU32::new(0)),
        })
    }

    fn registry() -> PluginRegistry {
        PluginRegistry::new(Arc::new(StaticResolver::new()))
    }

    fn write_manifest(dir: &Path, manifest: &PluginManifest) -> PathBuf {
        let path = dir.join(format!("{}.json", manifest.name));
        std::fs::write(&path, serde_json::to_string_pretty(manifest).unwrap()).unwrap();
        path
    }

    #[tokio::test]
    async fn test_register_and_lookup() {
        let registry = registry();
        registry
            .register_plugin(test_plugin("text-tools", &["uppercase", "lowercase"]))
            .await
            .unwrap();

        assert!(registry.processor("uppercase").is_some());
        assert!(registry.processor("lowercase").is_some());
        assert!(registry.processor("unknown").is_none());
        assert_eq!(registry.node_catalog().len(), 2);
    }

    #[tokio::test]
    async fn test_duplicate_registration_rejected() {
        let registry = registry();
        registry
            .register_plugin(test_plugin("text-tools", &["uppercase"]))
            .await
            .unwrap();

        let err = registry
            .register_plugin(test_plugin("text-tools", &["uppercase"]))
            .await
            .unwrap_err();
        assert!(matches!(err, RegistryError::PluginLoad { .. }));
        // Mapping from the first registration survives
        assert!(registry.processor("uppercase").is_some());
    }

    #[tokio::test]
    async fn test_node_collision_across_plugins_rejected() {
        let registry = registry();
        registry
            .register_plugin(test_plugin("alpha", &["shared-node"]))
            .await
            .unwrap();

        let err = registry
            .register_plugin(test_plugin("beta", &["shared-node", "beta-only"]))
            .await
            .unwrap_err();
        assert!(matches!(err, RegistryError::NodeTypeCollision { .. }));
        // All-or-nothing: beta's non-colliding node must not be visible
        assert!(registry.processor("beta-only").is_none());
        assert_eq!(registry.plugins().len(), 1);
    }

    #[tokio::test]
    async fn test_failed_initialize_leaves_registry_untouched() {
        let registry = registry();
        let plugin = Arc::new(TestPlugin {
            manifest: test_manifest("broken", &["broken-node"]),
            node_ids: vec!["broken-node".to_string()],
            fail_init: true,
            cleanups: Arc::new(AtomicU32::new(0)),
        });

        let err = registry.register_plugin(plugin).await.unwrap_err();
        assert!(matches!(err, RegistryError::PluginLoad { .. }));
        assert!(registry.processor("broken-node").is_none());
        assert!(registry.plugins().is_empty());
    }

    #[tokio::test]
    async fn test_missing_processor_rejected() {
        let registry = registry();
        let plugin = Arc::new(TestPlugin {
            // Manifest declares two nodes, plugin only implements one
            manifest: test_manifest("partial", &["implemented", "declared-only"]),
            node_ids: vec!["implemented".to_string()],
            fail_init: false,
            cleanups: Arc::new(AtomicU32::new(0)),
        });

        let err = registry.register_plugin(plugin).await.unwrap_err();
        assert!(matches!(err, RegistryError::MissingProcessor { .. }));
        assert!(registry.processor("implemented").is_none());
    }

    #[tokio::test]
    async fn test_unregister_unknown_is_noop() {
        let registry = registry();
        registry.unregister("never-registered").await;
        assert!(registry.plugins().is_empty());
    }

    #[tokio::test]
    async fn test_unregister_removes_mappings_and_cleans_up() {
        let registry = registry();
        let cleanups = Arc::new(AtomicU32::new(0));
        let plugin = Arc::new(TestPlugin {
            manifest: test_manifest("text-tools", &["uppercase"]),
            node_ids: vec!["uppercase".to_string()],
            fail_init: false,
            cleanups: cleanups.clone(),
        });
        registry.register_plugin(plugin).await.unwrap();

        registry.unregister("text-tools").await;
        assert!(registry.processor("uppercase").is_none());
        assert_eq!(cleanups.load(Ordering::SeqCst), 1);

        // Idempotent
        registry.unregister("text-tools").await;
        assert_eq!(cleanups.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_register_from_file_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = test_manifest("file-plugin", &["file-node"]);
        let path = write_manifest(dir.path(), &manifest);

        let resolver = StaticResolver::new().with("file-plugin", || {
            Arc::new(TestPlugin {
                manifest: PluginManifest::new("file-plugin", "1.0.0"),
                node_ids: vec!["file-node".to_string()],
                fail_init: false,
                cleanups: Arc::new(AtomicU32::new(0)),
            }) as Arc<dyn NodePlugin>
        });
        let registry = PluginRegistry::new(Arc::new(resolver));

        let entry = registry.register(&path).await.unwrap();
        assert_eq!(entry.id, "file-plugin");
        assert!(entry.path.is_some());
        assert!(registry.processor("file-node").is_some());

        let reloaded = registry.reload("file-plugin").await.unwrap();
        assert_eq!(reloaded.id, "file-plugin");
        assert!(registry.processor("file-node").is_some());
        assert_eq!(registry.plugins().len(), 1);
    }

    #[tokio::test]
    async fn test_reload_preserves_other_plugins() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = test_manifest("reloadable", &["reload-node"]);
        let path = write_manifest(dir.path(), &manifest);

        let resolver = StaticResolver::new().with("reloadable", || {
            Arc::new(TestPlugin {
                manifest: PluginManifest::new("reloadable", "1.0.0"),
                node_ids: vec!["reload-node".to_string()],
                fail_init: false,
                cleanups: Arc::new(AtomicU32::new(0)),
            }) as Arc<dyn NodePlugin>
        });
        let registry = PluginRegistry::new(Arc::new(resolver));

        registry
            .register_plugin(test_plugin("stable", &["stable-node"]))
            .await
            .unwrap();
        registry.register(&path).await.unwrap();

        registry.reload("reloadable").await.unwrap();

        // Mapped before the reload, mapped after: never a gap for readers
        assert!(registry.processor("stable-node").is_some());
        assert!(registry.processor("reload-node").is_some());
    }

    #[tokio::test]
    async fn test_reload_unknown_plugin() {
        let registry = registry();
        let err = registry.reload("ghost").await.unwrap_err();
        assert!(matches!(err, RegistryError::UnknownPlugin(_)));
    }

    #[tokio::test]
    async fn test_reload_in_process_plugin_rejected() {
        let registry = registry();
        registry
            .register_plugin(test_plugin("in-process", &["some-node"]))
            .await
            .unwrap();

        let err = registry.reload("in-process").await.unwrap_err();
        assert!(matches!(err, RegistryError::PluginLoad { .. }));
        // The plugin stays registered
        assert!(registry.processor("some-node").is_some());
    }

    #[tokio::test]
    async fn test_validate_all() {
        let registry = registry();
        registry
            .register_plugin(test_plugin("text-tools", &["uppercase"]))
            .await
            .unwrap();

        let reports = registry.validate_all();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].0, "text-tools");
        assert!(reports[0].1.valid);
    }
}
