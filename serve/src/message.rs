//! `POST /message`: run one turn, in the foreground or in the background.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use megabyzus::protocol::{MessageRequest, MessageResponse};
use megabyzus::{AgentError, Session, TurnEvent, TurnOutcome};
use tokio::sync::mpsc;

use crate::app::AppState;
use crate::response::ApiError;

const EVENT_QUEUE_CAPACITY: usize = 32;

pub(crate) async fn post_message(
    State(state): State<AppState>,
    payload: Result<Json<MessageRequest>, JsonRejection>,
) -> Result<Json<MessageResponse>, ApiError> {
    let Json(req) = payload?;
    let text = req.message.trim();
    if text.is_empty() {
        return Err(ApiError::BadRequest("message must not be empty".to_string()));
    }
    let session = state.sessions.get_or_create(req.session_id.as_deref());
    tracing::info!(
        session_id = session.id(),
        background = req.background,
        "message received"
    );

    if req.background {
        return run_background(&state, session, text.to_string()).await;
    }
    run_foreground(&state, session, text.to_string()).await
}

/// Runs the turn on its own task and waits for it. A client that goes away drops this
/// future but not the turn, so every registered tool call still gets resolved.
async fn run_foreground(
    state: &AppState,
    session: Arc<Session>,
    text: String,
) -> Result<Json<MessageResponse>, ApiError> {
    let handle = {
        let conversation = Arc::clone(&state.conversation);
        let session = Arc::clone(&session);
        tokio::spawn(async move { conversation.run_turn(&session, &text).await })
    };
    let result = handle
        .await
        .map_err(|e| ApiError::Internal(format!("turn task failed: {}", e)))?;
    respond(state, &session, result)
}

/// Spawns the turn and answers once the first tool calls are registered or the turn
/// ends, whichever comes first. The turn keeps running after the response is sent.
async fn run_background(
    state: &AppState,
    session: Arc<Session>,
    text: String,
) -> Result<Json<MessageResponse>, ApiError> {
    let (tx, mut rx) = mpsc::channel(EVENT_QUEUE_CAPACITY);
    let handle = {
        let conversation = Arc::clone(&state.conversation);
        let session = Arc::clone(&session);
        tokio::spawn(async move {
            conversation
                .run_turn_with_events(&session, &text, Some(tx))
                .await
        })
    };

    while let Some(event) = rx.recv().await {
        match event {
            TurnEvent::ToolCallsRegistered(pending) => {
                return Ok(Json(MessageResponse::in_progress(session.id(), &pending)));
            }
            TurnEvent::Finished => break,
            TurnEvent::ToolCallResolved(_) => {}
        }
    }

    let result = handle
        .await
        .map_err(|e| ApiError::Internal(format!("turn task failed: {}", e)))?;
    respond(state, &session, result)
}

fn respond(
    state: &AppState,
    session: &Session,
    result: Result<TurnOutcome, AgentError>,
) -> Result<Json<MessageResponse>, ApiError> {
    match result {
        Ok(outcome) => Ok(Json(MessageResponse::from_outcome(session.id(), &outcome))),
        Err(AgentError::Model(error)) => {
            let ids = session
                .last_turn()
                .map(|t| t.tool_call_ids)
                .unwrap_or_default();
            let calls = state.tracker().query(session.id(), &ids);
            Ok(Json(MessageResponse::failed(
                session.id(),
                format!("model request failed: {}", error),
                &calls,
            )))
        }
        Err(e) => Err(e.into()),
    }
}
