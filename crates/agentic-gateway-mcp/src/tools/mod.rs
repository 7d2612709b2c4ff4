//! Tool registration and built-in tools.

pub mod echo;
pub mod registry;
pub mod sleep;

pub use registry::{ToolRegistry, ToolSpec};
