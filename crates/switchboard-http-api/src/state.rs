//! Shared state behind the HTTP router

use std::sync::Arc;

use switchboard_event_sources::EventSourceRegistry;
use switchboard_plugin_registry::PluginRegistry;
use switchboard_trigger_service::TriggerService;

/// Everything the handlers need, cheaply cloneable
#[derive(Clone)]
pub struct AppState {
    pub plugins: Arc<PluginRegistry>,
    pub sources: Arc<EventSourceRegistry>,
    pub service: Arc<TriggerService>,
}

impl AppState {
    pub fn new(
        plugins: Arc<PluginRegistry>,
        sources: Arc<EventSourceRegistry>,
        service: Arc<TriggerService>,
    ) -> Self {
        Self {
            plugins,
            sources,
            service,
        }
    }
}
