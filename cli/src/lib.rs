//! Library side of the `megabyzus` binary: tool listing and turn rendering.
//!
//! Kept separate from `main.rs` so the output formats are unit-testable.

pub mod display;
pub mod tools;

pub use display::{format_error, format_outcome};
pub use tools::{list_tools, show_tool};

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("tool not found: {0}")]
    ToolNotFound(String),
    #[error(transparent)]
    Tool(#[from] megabyzus::ToolError),
    #[error(transparent)]
    Agent(#[from] megabyzus::AgentError),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
