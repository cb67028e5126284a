//! Input nodes: entry points that accept external data

mod passthrough;

pub use passthrough::PassthroughInput;
