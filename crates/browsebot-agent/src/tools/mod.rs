//! Tool plumbing: the provider seam and the registry built on top of it.

pub mod provider;
pub mod registry;

use serde_json::Value;

pub use provider::{RemoteTool, ToolProvider};
pub use registry::{RegistrationReport, ToolRegistry, TOOL_SEPARATOR};

/// A registered tool as the model sees it, plus where to route it.
#[derive(Clone, Debug, PartialEq)]
pub struct ToolDescriptor {
    /// Name exposed to the model; unique within the registry.
    pub name: String,
    /// Name the owning provider knows the tool by.
    pub remote_name: String,
    /// Name of the owning provider.
    pub owner: String,
    pub description: String,
    /// JSON Schema for the arguments object.
    pub parameters: Value,
}
