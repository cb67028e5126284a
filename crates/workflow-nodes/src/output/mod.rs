//! Output nodes: terminal consumers of workflow data

mod text_output;

pub use text_output::TextOutputNode;
