//! Event sources for Switchboard
//!
//! Event sources are the system's inputs: file watchers, schedulers,
//! webhooks, chat frontends. This crate provides:
//!
//! - `EventSourceProcessor`: the source contract with default no-op
//!   lifecycle hooks
//! - `EventBus`: a bounded channel between sources and the trigger layer,
//!   with observable backpressure and shutdown
//! - `EventSourceRegistry`: per-source lifecycle state machine
//!   (stopped/starting/running/stopping/error) with status snapshots
//! - `Schedule` + `TickerSource`: the schedule contract for self-triggering
//!   sources, with cron parsing delegated to the `cron` crate

pub mod bus;
pub mod error;
pub mod registry;
pub mod schedule;
pub mod source;

// Re-export key types
pub use bus::{EventBus, EventBusReceiver, SourceEvent, DEFAULT_BUS_CAPACITY};
pub use error::{Result, SourceError};
pub use registry::{EventSourceRegistry, SourceState, SourceStatusSnapshot};
pub use schedule::{Schedule, TickerSource};
pub use source::{EventSourceProcessor, SourceContext, SourceStats};
