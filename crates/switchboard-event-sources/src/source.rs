//! Event source contract
//!
//! An event source is a long-lived or on-demand component that emits typed
//! events into the trigger system. Lifecycle hooks form an explicit
//! interface with default no-op implementations; sources that need
//! configuration or teardown override the hooks they care about.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use switchboard_plugin_registry::EventSourceManifest;

use crate::bus::{EventBus, SourceEvent};
use crate::error::Result;

/// Emission counters shared between a source's context and its registry
/// entry; snapshots read them without blocking
#[derive(Default)]
pub struct SourceStats {
    events_emitted: AtomicU64,
    errors: AtomicU64,
    last_activity: Mutex<Option<DateTime<Utc>>>,
}

impl SourceStats {
    pub fn events_emitted(&self) -> u64 {
        self.events_emitted.load(Ordering::Relaxed)
    }

    pub fn errors(&self) -> u64 {
        self.errors.load(Ordering::Relaxed)
    }

    pub fn last_activity(&self) -> Option<DateTime<Utc>> {
        *self.last_activity.lock()
    }

    pub fn record_error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    fn record_emit(&self) {
        self.events_emitted.fetch_add(1, Ordering::Relaxed);
        *self.last_activity.lock() = Some(Utc::now());
    }
}

/// Handle a running source uses to emit events and report activity
#[derive(Clone)]
pub struct SourceContext {
    source_id: String,
    bus: EventBus,
    stats: Arc<SourceStats>,
}

impl SourceContext {
    pub fn new(source_id: impl Into<String>, bus: EventBus, stats: Arc<SourceStats>) -> Self {
        Self {
            source_id: source_id.into(),
            bus,
            stats,
        }
    }

    /// Id of the source this context belongs to
    pub fn source_id(&self) -> &str {
        &self.source_id
    }

    /// Emit an event into the bus, suspending while the buffer is full
    pub async fn emit(&self, event_type: impl Into<String>, payload: serde_json::Value) -> Result<()> {
        let event = SourceEvent::new(event_type, self.source_id.clone(), payload);
        match self.bus.publish(event).await {
            Ok(()) => {
                self.stats.record_emit();
                Ok(())
            }
            Err(e) => {
                self.stats.record_error();
                Err(e)
            }
        }
    }
}

/// The contract every event source implements
///
/// `stop()` and `cleanup()` must be idempotent and safe to invoke while a
/// `start()` is still pending, to support forced shutdown.
#[async_trait]
pub trait EventSourceProcessor: Send + Sync {
    /// The manifest describing this source
    fn manifest(&self) -> &EventSourceManifest;

    /// Apply configuration before starting; called once per start
    async fn initialize(&self, _config: &serde_json::Value, _ctx: &SourceContext) -> Result<()> {
        Ok(())
    }

    /// Begin emitting events
    ///
    /// Expected to launch internal tasks and return; the registry drives
    /// neither a scheduled source's clock nor a persistent source's loop.
    async fn start(&self, ctx: SourceContext) -> Result<()>;

    /// Stop emitting; cancels any in-flight start
    async fn stop(&self) -> Result<()> {
        Ok(())
    }

    /// Release resources on unregister
    async fn cleanup(&self) -> Result<()> {
        Ok(())
    }
}
