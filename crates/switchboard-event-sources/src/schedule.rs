//! Schedule contract for self-triggering sources
//!
//! The contract is `next_fire_time(spec, now)`; cron semantics are
//! delegated entirely to the `cron` crate rather than re-derived here.
//! `TickerSource` is the reference scheduled source built on top of it.

use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use switchboard_plugin_registry::{EventSourceManifest, EventTypeDescriptor, SourceLifecycle};
use tokio::sync::oneshot;

use crate::error::{Result, SourceError};
use crate::source::{EventSourceProcessor, SourceContext};

/// When a schedule fires
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Schedule {
    /// Fixed interval between fire times
    Interval { millis: u64 },
    /// Cron expression evaluated in UTC
    Cron { expression: String },
}

impl Schedule {
    /// Parse and validate a cron expression
    pub fn cron(expression: impl Into<String>) -> Result<Self> {
        let expression = expression.into();
        cron::Schedule::from_str(&expression).map_err(|e| SourceError::InvalidSchedule {
            expression: expression.clone(),
            cause: e.to_string(),
        })?;
        Ok(Self::Cron { expression })
    }

    /// Fixed-interval schedule
    pub fn interval_millis(millis: u64) -> Self {
        Self::Interval { millis }
    }

    /// Compute the next fire time strictly after `after`
    ///
    /// `None` means the schedule never fires again (exhausted cron ranges).
    pub fn next_fire_time(&self, after: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            Self::Interval { millis } => Some(after + Duration::milliseconds(*millis as i64)),
            Self::Cron { expression } => {
                // Validated at construction; a hand-built invalid expression
                // simply never fires.
                let schedule = cron::Schedule::from_str(expression).ok()?;
                schedule.after(&after).next()
            }
        }
    }
}

/// Scheduled source that emits `timer.tick` events on its own clock
///
/// Configuration: `{"intervalMillis": 500}` or `{"cron": "0 * * * * *"}`.
/// The registry starts it once; ticking is internal.
pub struct TickerSource {
    manifest: EventSourceManifest,
    schedule: RwLock<Schedule>,
    shutdown: Mutex<Option<oneshot::Sender<()>>>,
}

impl TickerSource {
    /// Event type emitted on every tick
    pub const EVENT_TICK: &'static str = "timer.tick";

    pub fn new() -> Self {
        let mut manifest = EventSourceManifest::new(
            "ticker",
            "1.0.0",
            SourceLifecycle::Scheduled,
            "ticker",
        );
        manifest.description = Some("Emits timer.tick events on a schedule".to_string());
        let manifest = manifest.with_event_type(EventTypeDescriptor {
            id: Self::EVENT_TICK.to_string(),
            name: "Timer tick".to_string(),
            outputs: vec!["firedAt".to_string(), "sequence".to_string()],
            tags: vec!["timer".to_string()],
        });

        Self {
            manifest,
            schedule: RwLock::new(Schedule::interval_millis(60_000)),
            shutdown: Mutex::new(None),
        }
    }
}

impl Default for TickerSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventSourceProcessor for TickerSource {
    fn manifest(&self) -> &EventSourceManifest {
        &self.manifest
    }

    async fn initialize(&self, config: &serde_json::Value, _ctx: &SourceContext) -> Result<()> {
        if let Some(expression) = config.get("cron").and_then(|c| c.as_str()) {
            *self.schedule.write() = Schedule::cron(expression)?;
        } else if let Some(millis) = config.get("intervalMillis").and_then(|m| m.as_u64()) {
            *self.schedule.write() = Schedule::interval_millis(millis);
        }
        Ok(())
    }

    async fn start(&self, ctx: SourceContext) -> Result<()> {
        let (tx, mut rx) = oneshot::channel();
        *self.shutdown.lock() = Some(tx);

        let schedule = self.schedule.read().clone();
        tokio::spawn(async move {
            let mut sequence: u64 = 0;
            loop {
                let now = Utc::now();
                let Some(next) = schedule.next_fire_time(now) else {
                    log::info!("Ticker '{}' schedule exhausted", ctx.source_id());
                    break;
                };
                let wait = (next - now).to_std().unwrap_or_default();

                tokio::select! {
                    _ = &mut rx => break,
                    _ = tokio::time::sleep(wait) => {}
                }

                sequence += 1;
                let payload = serde_json::json!({
                    "firedAt": Utc::now().to_rfc3339(),
                    "sequence": sequence,
                });
                if ctx.emit(TickerSource::EVENT_TICK, payload).await.is_err() {
                    log::warn!("Ticker '{}' bus closed, stopping", ctx.source_id());
                    break;
                }
            }
        });

        Ok(())
    }

    async fn stop(&self) -> Result<()> {
        // Idempotent: a second stop finds no sender and does nothing
        if let Some(tx) = self.shutdown.lock().take() {
            let _ = tx.send(());
        }
        Ok(())
    }
}
