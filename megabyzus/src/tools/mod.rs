//! Tools: declared specs, the closed set of tool variants, and the executor.
//!
//! # Main types
//!
//! - [`ToolKind`]: every tool the assistant can call; one variant per tool.
//! - [`ToolRegistry`]: the enabled tools for a process, with their input schemas compiled
//!   and checked at startup.
//! - [`ToolInvocation`]: a validated, typed call to one [`ToolKind`].
//! - [`ToolExecutor`]: runs invocations with a per-call timeout and normalizes failures
//!   into [`ToolError`].

pub mod calculator;
mod error;
mod executor;
pub mod nasa;
mod registry;

use serde::{Deserialize, Serialize};

pub use error::ToolError;
pub use executor::{ToolExecutor, DEFAULT_TOOL_TIMEOUT};
pub use nasa::{SearchCategory, SearchInput, TechTransferClient, TechTransferSearch};
pub use registry::{ToolInvocation, ToolKind, ToolRegistry, Toolset};

/// Tool definition sent to the model: name, description and JSON schema for the input.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    pub input_schema: serde_json::Value,
}
