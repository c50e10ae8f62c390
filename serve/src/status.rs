//! `POST /tool-call-status`: current state of tool calls by id.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use megabyzus::protocol::{ToolCallStatusEntry, ToolCallStatusRequest, ToolCallStatusResponse};

use crate::app::AppState;
use crate::response::ApiError;

/// Unknown ids, and every id of an unknown session, come back as `not_found`.
pub(crate) async fn post_tool_call_status(
    State(state): State<AppState>,
    payload: Result<Json<ToolCallStatusRequest>, JsonRejection>,
) -> Result<Json<ToolCallStatusResponse>, ApiError> {
    let Json(req) = payload?;
    let tool_calls = state
        .tracker()
        .query(&req.session_id, &req.tool_call_ids)
        .into_iter()
        .map(ToolCallStatusEntry::from)
        .collect();
    Ok(Json(ToolCallStatusResponse {
        session_id: req.session_id,
        tool_calls,
    }))
}
