//! Control flow nodes: conditionals and merges

mod conditional;
mod merge;

pub use conditional::ConditionalNode;
pub use merge::MergeNode;
