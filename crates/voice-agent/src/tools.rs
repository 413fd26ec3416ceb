//! Capabilities the model can invoke, and the registry that dispatches to them by name
pub mod password_reset;
pub mod registry;

pub use password_reset::{PasswordResetResult, PasswordResetTool};
pub use registry::{FnTool, ToolHandler, ToolRegistry};
