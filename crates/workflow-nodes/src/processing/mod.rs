//! Processing nodes: data transformation between inputs and outputs

mod delay;
mod json_filter;
mod template;
mod uppercase;

pub use delay::DelayNode;
pub use json_filter::{extract_json_path, JsonFilterNode};
pub use template::TemplateNode;
pub use uppercase::UppercaseNode;
