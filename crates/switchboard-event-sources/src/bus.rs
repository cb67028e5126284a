//! Bounded event bus between sources and the trigger layer
//!
//! Sources emit through an `EventBus` handle; a single consumer task drains
//! the other end into the trigger service. The buffer is bounded, so
//! backpressure is observable (`emit` suspends on a full buffer) and
//! shutdown ordering is testable: dropping the receiver makes every
//! subsequent emit fail with `BusClosed` instead of vanishing.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::error::{Result, SourceError};

/// Default bus capacity when the host doesn't pick one
pub const DEFAULT_BUS_CAPACITY: usize = 256;

/// A typed event emitted by an event source
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceEvent {
    /// Event type identifier (e.g. "file.created")
    pub event_type: String,
    /// Id of the emitting source
    pub source: String,
    /// Event payload
    pub payload: serde_json::Value,
    pub timestamp: DateTime<Utc>,
}

impl SourceEvent {
    /// Create an event stamped with the current time
    pub fn new(
        event_type: impl Into<String>,
        source: impl Into<String>,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            event_type: event_type.into(),
            source: source.into(),
            payload,
            timestamp: Utc::now(),
        }
    }
}

/// Sending half of the event bus
#[derive(Clone)]
pub struct EventBus {
    tx: mpsc::Sender<SourceEvent>,
}

impl EventBus {
    /// Create a bus with the given buffer capacity
    pub fn new(capacity: usize) -> (Self, EventBusReceiver) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx }, EventBusReceiver { rx })
    }

    /// Create a bus with [`DEFAULT_BUS_CAPACITY`]
    pub fn with_default_capacity() -> (Self, EventBusReceiver) {
        Self::new(DEFAULT_BUS_CAPACITY)
    }

    /// Publish an event, suspending while the buffer is full
    pub async fn publish(&self, event: SourceEvent) -> Result<()> {
        self.tx.send(event).await.map_err(|_| SourceError::BusClosed)
    }
}

/// Receiving half of the event bus, owned by the consumer task
pub struct EventBusReceiver {
    rx: mpsc::Receiver<SourceEvent>,
}

impl EventBusReceiver {
    /// Receive the next event; `None` once every sender is dropped
    pub async fn recv(&mut self) -> Option<SourceEvent> {
        self.rx.recv().await
    }

    /// Close the bus; pending events can still be drained
    pub fn close(&mut self) {
        self.rx.close();
    }
}
