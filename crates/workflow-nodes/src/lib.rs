//! Workflow Nodes
//!
//! Built-in node processor implementations for the Switchboard workflow
//! engine. Each node is an atomic building block that can be composed into
//! workflows.
//!
//! # Categories
//!
//! - **Input**: Nodes that accept external data into a workflow
//! - **Processing**: Nodes that transform data (uppercase, template, filter)
//! - **Output**: Nodes that surface results
//! - **Control**: Nodes for control flow (conditionals, merges)
//!
//! The whole set is packaged as the `builtin-nodes` plugin; register it
//! with `registry.register_plugin(builtin_plugin())`.

pub mod control;
pub mod input;
pub mod output;
pub mod plugin;
pub mod processing;

// Re-export all nodes for convenience
pub use control::*;
pub use input::*;
pub use output::*;
pub use plugin::{builtin_plugin, BUILTIN_PLUGIN_NAME};
pub use processing::*;
