//! Event source registry and lifecycle state machine
//!
//! Each registered source moves through
//! `stopped → starting → running → stopping → stopped`, with `error`
//! reachable from `starting`/`running` on an uncaught failure. The registry
//! never retries a failed start and never restarts a crashed persistent
//! source; both are the caller's (or deployment's) responsibility.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use switchboard_plugin_registry::{ManifestValidator, SourceLifecycle};

use crate::bus::EventBus;
use crate::error::{Result, SourceError};
use crate::source::{EventSourceProcessor, SourceContext, SourceStats};

/// Lifecycle state of a registered source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceState {
    Stopped,
    Starting,
    Running,
    Stopping,
    Error,
}

/// Point-in-time view of a source; never blocks
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceStatusSnapshot {
    pub id: String,
    pub lifecycle: SourceLifecycle,
    pub state: SourceState,
    pub running: bool,
    pub last_activity: Option<DateTime<Utc>>,
    pub events_emitted: u64,
    pub errors: u64,
}

struct SourceEntry {
    instance: Arc<dyn EventSourceProcessor>,
    lifecycle: SourceLifecycle,
    state: SourceState,
    stats: Arc<SourceStats>,
}

/// Registry of event sources sharing one event bus
pub struct EventSourceRegistry {
    bus: EventBus,
    entries: RwLock<HashMap<String, SourceEntry>>,
}

impl EventSourceRegistry {
    /// Create a registry whose sources emit into `bus`
    pub fn new(bus: EventBus) -> Self {
        Self {
            bus,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Register a source in the stopped state
    ///
    /// Fails if the manifest is invalid or the name is taken.
    pub fn register_source(&self, instance: Arc<dyn EventSourceProcessor>) -> Result<()> {
        let manifest = instance.manifest();
        let report = ManifestValidator::validate_event_source(manifest);
        if !report.valid {
            return Err(SourceError::ManifestValidation {
                name: manifest.name.clone(),
                errors: report.errors,
            });
        }

        let id = manifest.name.clone();
        let lifecycle = manifest.lifecycle;
        let mut entries = self.entries.write();
        if entries.contains_key(&id) {
            return Err(SourceError::source(format!(
                "event source '{}' is already registered",
                id
            )));
        }
        entries.insert(
            id.clone(),
            SourceEntry {
                instance,
                lifecycle,
                state: SourceState::Stopped,
                stats: Arc::new(SourceStats::default()),
            },
        );
        log::info!("Registered event source '{}' ({:?})", id, lifecycle);
        Ok(())
    }

    /// Unregister a stopped source
    pub async fn unregister_source(&self, id: &str) {
        let removed = self.entries.write().remove(id);
        if let Some(entry) = removed {
            if let Err(e) = entry.instance.cleanup().await {
                log::warn!("Event source '{}' cleanup failed: {}", id, e);
            }
            log::info!("Unregistered event source '{}'", id);
        }
    }

    /// Start a source; only valid from `stopped` or `error`
    ///
    /// On failure the entry moves to `error` and the causing failure is
    /// surfaced to the caller. No automatic retry.
    pub async fn start_source(&self, id: &str, config: serde_json::Value) -> Result<()> {
        let (instance, stats) = {
            let mut entries = self.entries.write();
            let entry = entries
                .get_mut(id)
                .ok_or_else(|| SourceError::UnknownSource(id.to_string()))?;

            match entry.state {
                SourceState::Stopped | SourceState::Error => {}
                from => {
                    return Err(SourceError::InvalidTransition {
                        id: id.to_string(),
                        from,
                        action: "start",
                    })
                }
            }
            entry.state = SourceState::Starting;
            (entry.instance.clone(), entry.stats.clone())
        };

        let ctx = SourceContext::new(id, self.bus.clone(), stats.clone());
        let started = async {
            instance.initialize(&config, &ctx).await?;
            instance.start(ctx).await
        }
        .await;

        match started {
            Ok(()) => {
                let cancel = {
                    let mut entries = self.entries.write();
                    let Some(entry) = entries.get_mut(id) else {
                        return Ok(());
                    };
                    if entry.state == SourceState::Stopping {
                        // A stop arrived while start was in flight; honor it.
                        entry.state = SourceState::Stopped;
                        true
                    } else {
                        entry.state = SourceState::Running;
                        false
                    }
                };
                if cancel {
                    let _ = instance.stop().await;
                    log::info!("Event source '{}' start cancelled by stop", id);
                } else {
                    log::info!("Event source '{}' running", id);
                }
                Ok(())
            }
            Err(e) => {
                stats.record_error();
                if let Some(entry) = self.entries.write().get_mut(id) {
                    entry.state = SourceState::Error;
                }
                Err(SourceError::StartFailed {
                    id: id.to_string(),
                    cause: e.to_string(),
                })
            }
        }
    }

    /// Stop a source; only valid from `running` or `starting`
    ///
    /// Stopping a source whose `start()` never completed cancels the
    /// in-flight start.
    pub async fn stop_source(&self, id: &str) -> Result<()> {
        let instance = {
            let mut entries = self.entries.write();
            let entry = entries
                .get_mut(id)
                .ok_or_else(|| SourceError::UnknownSource(id.to_string()))?;

            match entry.state {
                SourceState::Running => {
                    entry.state = SourceState::Stopping;
                    Some(entry.instance.clone())
                }
                SourceState::Starting => {
                    // The in-flight start observes this and unwinds.
                    entry.state = SourceState::Stopping;
                    None
                }
                from => {
                    return Err(SourceError::InvalidTransition {
                        id: id.to_string(),
                        from,
                        action: "stop",
                    })
                }
            }
        };

        if let Some(instance) = instance {
            let stopped = instance.stop().await;
            let mut entries = self.entries.write();
            if let Some(entry) = entries.get_mut(id) {
                entry.state = match stopped {
                    Ok(()) => SourceState::Stopped,
                    Err(_) => SourceState::Error,
                };
            }
            stopped?;
            log::info!("Event source '{}' stopped", id);
        }
        Ok(())
    }

    /// Point-in-time status snapshot; never blocks on source activity
    pub fn status(&self, id: &str) -> Result<SourceStatusSnapshot> {
        let entries = self.entries.read();
        let entry = entries
            .get(id)
            .ok_or_else(|| SourceError::UnknownSource(id.to_string()))?;
        Ok(snapshot(id, entry))
    }

    /// Status snapshots for every registered source, sorted by id
    pub fn statuses(&self) -> Vec<SourceStatusSnapshot> {
        let entries = self.entries.read();
        let mut all: Vec<SourceStatusSnapshot> =
            entries.iter().map(|(id, entry)| snapshot(id, entry)).collect();
        all.sort_by(|a, b| a.id.cmp(&b.id));
        all
    }

    /// Start every registered persistent source; called once at boot
    ///
    /// Failures are logged and returned; successfully started sources stay
    /// running regardless of siblings failing.
    pub async fn start_persistent_sources(&self) -> Vec<(String, SourceError)> {
        let ids: Vec<String> = {
            let entries = self.entries.read();
            entries
                .iter()
                .filter(|(_, e)| {
                    e.lifecycle == SourceLifecycle::Persistent && e.state == SourceState::Stopped
                })
                .map(|(id, _)| id.clone())
                .collect()
        };

        let mut failures = Vec::new();
        for id in ids {
            if let Err(e) = self.start_source(&id, serde_json::Value::Null).await {
                log::error!("Persistent source '{}' failed to start: {}", id, e);
                failures.push((id, e));
            }
        }
        failures
    }
}

fn snapshot(id: &str, entry: &SourceEntry) -> SourceStatusSnapshot {
    SourceStatusSnapshot {
        id: id.to_string(),
        lifecycle: entry.lifecycle,
        state: entry.state,
        running: entry.state == SourceState::Running,
        last_activity: entry.stats.last_activity(),
        events_emitted: entry.stats.events_emitted(),
        errors: entry.stats.errors(),
    }
}
