//! Turn-level error type.
//!
//! Failures local to one tool call are [`ToolError`](crate::tools::ToolError)s and are fed
//! back to the model; only the variants here abort a turn or reach the API caller.

use crate::tools::ToolError;

/// Error returned by [`ConversationLoop`](crate::agent::ConversationLoop) and the session store.
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    /// The language-model dependency failed (transport, HTTP status, malformed reply).
    #[error("model request failed: {0}")]
    Model(String),
    /// No session with this id exists.
    #[error("session not found: {0}")]
    SessionNotFound(String),
    /// Another turn is already running on this session.
    #[error("session {0} already has a turn in progress")]
    SessionBusy(String),
    /// Missing or invalid configuration (e.g. no API key).
    #[error("configuration error: {0}")]
    Config(String),
    /// Tool configuration problem detected outside a turn (e.g. at startup).
    #[error(transparent)]
    Tool(#[from] ToolError),
}

impl AgentError {
    /// Short machine-readable kind, used in API error bodies and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Model(_) => "model_error",
            Self::SessionNotFound(_) => "session_not_found",
            Self::SessionBusy(_) => "session_busy",
            Self::Config(_) => "config_error",
            Self::Tool(_) => "tool_error",
        }
    }
}
