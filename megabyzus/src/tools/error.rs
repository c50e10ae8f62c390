use std::time::Duration;

/// Failure of a single tool call. Never aborts a turn: the conversation loop turns it
/// into an `error` tool-call record and an error tool result for the model.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ToolError {
    #[error("unknown tool: {0}")]
    UnknownTool(String),
    /// Input does not match the tool's declared schema.
    #[error("invalid input for {tool}: {message}")]
    SchemaValidation { tool: String, message: String },
    /// The tool's own schema failed to compile (startup only).
    #[error("invalid schema for {tool}: {message}")]
    InvalidSchema { tool: String, message: String },
    /// The tool ran and failed (network, HTTP status, arithmetic).
    #[error("{0}")]
    Execution(String),
    /// The tool did not finish within the executor's per-call timeout.
    #[error("{tool} timed out after {after:?}")]
    Timeout { tool: String, after: Duration },
}

impl ToolError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}
