//! Session routes: history, last turn, delete, and the health check.

use axum::extract::{Path, State};
use axum::Json;
use megabyzus::protocol::{DeleteResponse, HealthResponse, HistoryResponse, TurnResponse};

use crate::app::AppState;
use crate::response::ApiError;

pub(crate) async fn get_history(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<HistoryResponse>, ApiError> {
    let session = state
        .sessions
        .get(&id)
        .ok_or(ApiError::SessionNotFound(id))?;
    Ok(Json(HistoryResponse::from_session(&session)))
}

/// Whether a turn is running and, if one finished, its reply. Used by background-mode
/// clients to pick up the final text.
pub(crate) async fn get_turn(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<TurnResponse>, ApiError> {
    let session = state
        .sessions
        .get(&id)
        .ok_or(ApiError::SessionNotFound(id))?;
    Ok(Json(TurnResponse::from_session(&session)))
}

/// Idempotent: deleting an unknown session still succeeds with `deleted: false`.
pub(crate) async fn delete_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Json<DeleteResponse> {
    let deleted = state.sessions.delete(&id);
    let records = state.tracker().remove_session(&id);
    tracing::info!(session_id = %id, deleted, tool_calls = records, "delete session");
    Json(DeleteResponse::new(&id, deleted))
}

pub(crate) async fn health() -> Json<HealthResponse> {
    Json(HealthResponse::default())
}
