//! # Protocol module
//!
//! JSON request/response bodies of the HTTP API served by the `serve` crate, plus the
//! conversions from core types. Field names follow the frontend contract: the message
//! response uses `toolCalls` / `toolName`, everything else is snake_case.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::agent::{TurnOutcome, TurnStatus};
use crate::message::{ContentBlock, Message};
use crate::session::Session;
use crate::tracker::{ToolCallRecord, ToolCallStatus};

// -----------------------------------------------------------------------------
// Requests (client → server)
// -----------------------------------------------------------------------------

/// `POST /message`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MessageRequest {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    /// Return as soon as the first tool calls are registered instead of waiting for the
    /// final reply.
    #[serde(default)]
    pub background: bool,
}

/// `POST /tool-call-status`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ToolCallStatusRequest {
    pub session_id: String,
    #[serde(default)]
    pub tool_call_ids: Vec<String>,
}

// -----------------------------------------------------------------------------
// Responses (server → client)
// -----------------------------------------------------------------------------

/// Overall state of a `POST /message` response.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseStatus {
    Complete,
    LoopExhausted,
    InProgress,
    Error,
}

impl From<TurnStatus> for ResponseStatus {
    fn from(status: TurnStatus) -> Self {
        match status {
            TurnStatus::Complete => Self::Complete,
            TurnStatus::LoopExhausted => Self::LoopExhausted,
        }
    }
}

/// One tool call as shown to the frontend.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolCallView {
    pub id: String,
    #[serde(rename = "toolName")]
    pub tool_name: String,
    pub inputs: Value,
    pub status: ToolCallStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<&ToolCallRecord> for ToolCallView {
    fn from(r: &ToolCallRecord) -> Self {
        Self {
            id: r.id.clone(),
            tool_name: r.tool_name.clone(),
            inputs: r.input.clone(),
            status: r.status,
            output: r.output.clone(),
            error: r.error.clone(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub response: String,
    pub session_id: String,
    pub status: ResponseStatus,
    #[serde(rename = "toolCalls", default)]
    pub tool_calls: Vec<ToolCallView>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl MessageResponse {
    pub fn from_outcome(session_id: &str, outcome: &TurnOutcome) -> Self {
        Self {
            response: outcome.reply.clone(),
            session_id: session_id.to_string(),
            status: outcome.status.into(),
            tool_calls: outcome.tool_calls.iter().map(ToolCallView::from).collect(),
            error: None,
        }
    }

    /// Background response: the turn is still running these tool calls.
    pub fn in_progress(session_id: &str, pending: &[ToolCallRecord]) -> Self {
        Self {
            response: String::new(),
            session_id: session_id.to_string(),
            status: ResponseStatus::InProgress,
            tool_calls: pending.iter().map(ToolCallView::from).collect(),
            error: None,
        }
    }

    /// Turn aborted by a model failure; tool calls made before the failure are included.
    pub fn failed(session_id: &str, error: impl Into<String>, tool_calls: &[ToolCallRecord]) -> Self {
        Self {
            response: String::new(),
            session_id: session_id.to_string(),
            status: ResponseStatus::Error,
            tool_calls: tool_calls.iter().map(ToolCallView::from).collect(),
            error: Some(error.into()),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolCallStatusEntry {
    pub tool_call_id: String,
    pub status: ToolCallStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<ToolCallRecord> for ToolCallStatusEntry {
    fn from(r: ToolCallRecord) -> Self {
        Self {
            tool_call_id: r.id,
            status: r.status,
            result: r.output,
            error: r.error,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ToolCallStatusResponse {
    pub session_id: String,
    pub tool_calls: Vec<ToolCallStatusEntry>,
}

/// One transcript entry.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub ordinal: usize,
    pub role: String,
    pub content: Vec<ContentBlock>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HistoryResponse {
    pub session_id: String,
    pub created_at: DateTime<Utc>,
    pub history: Vec<HistoryEntry>,
}

impl HistoryResponse {
    pub fn from_session(session: &Session) -> Self {
        Self {
            session_id: session.id().to_string(),
            created_at: session.created_at(),
            history: session
                .history()
                .into_iter()
                .enumerate()
                .map(|(ordinal, Message { role, content })| HistoryEntry {
                    ordinal,
                    role: role.as_str().to_string(),
                    content,
                })
                .collect(),
        }
    }
}

/// `GET /sessions/{id}/turn`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TurnResponse {
    pub session_id: String,
    pub in_progress: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ResponseStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TurnResponse {
    pub fn from_session(session: &Session) -> Self {
        let in_progress = session.is_turn_in_progress();
        let last = session.last_turn();
        let (response, status, error) = match last {
            Some(t) => {
                let status = match (t.status, &t.error) {
                    (Some(s), _) => Some(s.into()),
                    (None, Some(_)) => Some(ResponseStatus::Error),
                    (None, None) => None,
                };
                (t.reply, status, t.error)
            }
            None => (None, None, None),
        };
        Self {
            session_id: session.id().to_string(),
            in_progress,
            response,
            status,
            error,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DeleteResponse {
    pub status: String,
    pub deleted: bool,
    pub message: String,
}

impl DeleteResponse {
    pub fn new(session_id: &str, deleted: bool) -> Self {
        let message = if deleted {
            format!("Session {} deleted", session_id)
        } else {
            format!("Session {} did not exist", session_id)
        };
        Self {
            status: "success".to_string(),
            deleted,
            message,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}

impl Default for HealthResponse {
    fn default() -> Self {
        Self {
            status: "healthy".to_string(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}
