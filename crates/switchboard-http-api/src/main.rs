//! switchboard-server: standalone orchestrator host
//!
//! Boot order: builtin plugin registration, optional manifest-directory
//! plugin loading, event-source registration, persistent-source startup,
//! event pump, then the HTTP listener.

use std::sync::Arc;

use switchboard_event_sources::{EventBus, EventSourceRegistry, TickerSource};
use switchboard_http_api::{router, AppState};
use switchboard_plugin_registry::{BuiltinResolver, PluginRegistry};
use switchboard_trigger_service::{
    spawn_event_pump, InMemoryTriggerRepository, InMemoryWorkflowRepository, TriggerService,
};

#[tokio::main]
async fn main() {
    env_logger::init();

    let plugins = Arc::new(PluginRegistry::new(Arc::new(BuiltinResolver)));
    plugins
        .register_plugin(workflow_nodes::builtin_plugin())
        .await
        .expect("builtin plugin registration cannot fail");

    // Additional plugin manifests from SWITCHBOARD_PLUGIN_DIR, resolved
    // against the inventory-collected builtins
    if let Ok(plugin_dir) = std::env::var("SWITCHBOARD_PLUGIN_DIR") {
        match std::fs::read_dir(&plugin_dir) {
            Ok(entries) => {
                for entry in entries.flatten() {
                    let path = entry.path();
                    if path.extension().is_some_and(|e| e == "json") {
                        if let Err(e) = plugins.register(&path).await {
                            log::error!("Skipping plugin at {}: {}", path.display(), e);
                        }
                    }
                }
            }
            Err(e) => log::error!("Cannot read plugin dir '{}': {}", plugin_dir, e),
        }
    }

    let (bus, receiver) = EventBus::with_default_capacity();
    let sources = Arc::new(EventSourceRegistry::new(bus));
    if let Err(e) = sources.register_source(Arc::new(TickerSource::new())) {
        log::error!("Ticker registration failed: {}", e);
    }
    let failures = sources.start_persistent_sources().await;
    for (id, error) in failures {
        log::error!("Persistent source '{}' did not start: {}", id, error);
    }

    let triggers = Arc::new(InMemoryTriggerRepository::new());
    let workflows = Arc::new(InMemoryWorkflowRepository::new());
    let service = Arc::new(TriggerService::new(
        triggers.clone(),
        workflows.clone(),
        plugins.clone(),
    ));
    let _pump = spawn_event_pump(service.clone(), receiver);

    let state = AppState::new(plugins, sources, service);
    let app = router(state);

    let addr = std::env::var("SWITCHBOARD_ADDR").unwrap_or_else(|_| "127.0.0.1:8490".to_string());
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .unwrap_or_else(|e| panic!("cannot bind {}: {}", addr, e));
    log::info!("Switchboard listening on {}", addr);

    if let Err(e) = axum::serve(listener, app).await {
        log::error!("Server error: {}", e);
    }
}
