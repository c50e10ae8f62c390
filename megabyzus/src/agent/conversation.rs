//! One turn: user text in, final assistant text out, with tool calls in between.
//!
//! Per iteration the loop snapshots the transcript, asks the model, and either finishes
//! (no tool uses) or runs every requested tool concurrently and feeds the results back
//! as a single `tool_result` message. The iteration cap bounds model calls per turn.

use std::sync::Arc;

use chrono::Utc;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::error::AgentError;
use crate::llm::{LlmClient, LlmRequest, LlmUsage};
use crate::message::{ContentBlock, Message, ToolUse};
use crate::session::{Session, TurnSummary};
use crate::tools::ToolExecutor;
use crate::tracker::{ToolCallRecord, ToolCallStatus, ToolCallTracker};

pub const DEFAULT_MAX_ITERATIONS: usize = 8;

pub const DEFAULT_SYSTEM_PROMPT: &str = "You are Megabyzus, named after the ancient Persian general. Use tools and return helpful information to the user.";

/// Reply used when the model finishes with no text.
pub const EMPTY_REPLY_FALLBACK: &str = "I don't have anything further to add.";

/// Reply appended when the iteration cap is reached with tool uses still pending.
pub const LOOP_EXHAUSTED_REPLY: &str = "I wasn't able to finish within the allowed number of steps. Here is what I found so far; please ask a narrower follow-up if you need more.";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnStatus {
    Complete,
    LoopExhausted,
}

impl TurnStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Complete => "complete",
            Self::LoopExhausted => "loop_exhausted",
        }
    }
}

/// Result of a finished turn.
#[derive(Clone, Debug)]
pub struct TurnOutcome {
    pub reply: String,
    pub status: TurnStatus,
    /// Every tool call of this turn, resolved, in request order.
    pub tool_calls: Vec<ToolCallRecord>,
    /// Model calls made.
    pub iterations: usize,
    pub usage: Option<LlmUsage>,
}

/// Progress notifications for an observer of a running turn.
#[derive(Clone, Debug)]
pub enum TurnEvent {
    /// One model reply's tool uses, all registered as pending.
    ToolCallsRegistered(Vec<ToolCallRecord>),
    ToolCallResolved(ToolCallRecord),
    /// The turn ended (successfully or not); no further events follow.
    Finished,
}

/// Runs turns against sessions with a shared model, executor and tracker.
pub struct ConversationLoop {
    llm: Arc<dyn LlmClient>,
    executor: Arc<ToolExecutor>,
    tracker: Arc<ToolCallTracker>,
    system_prompt: Option<String>,
    max_iterations: usize,
}

impl ConversationLoop {
    pub fn new(
        llm: Arc<dyn LlmClient>,
        executor: Arc<ToolExecutor>,
        tracker: Arc<ToolCallTracker>,
    ) -> Self {
        Self {
            llm,
            executor,
            tracker,
            system_prompt: Some(DEFAULT_SYSTEM_PROMPT.to_string()),
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }

    /// Replaces the system prompt; an empty prompt sends none.
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        let prompt = prompt.into();
        self.system_prompt = (!prompt.trim().is_empty()).then_some(prompt);
        self
    }

    /// Sets the per-turn model call cap (at least 1).
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations.max(1);
        self
    }

    pub fn max_iterations(&self) -> usize {
        self.max_iterations
    }

    pub fn executor(&self) -> &Arc<ToolExecutor> {
        &self.executor
    }

    pub fn tracker(&self) -> &Arc<ToolCallTracker> {
        &self.tracker
    }

    pub async fn run_turn(&self, session: &Session, text: &str) -> Result<TurnOutcome, AgentError> {
        self.run_turn_with_events(session, text, None).await
    }

    /// Runs one turn, reporting progress to `events` if given.
    ///
    /// Fails fast with [`AgentError::SessionBusy`] if the session already has a turn in
    /// progress. The outcome (or the error) is recorded as the session's last turn.
    pub async fn run_turn_with_events(
        &self,
        session: &Session,
        text: &str,
        events: Option<mpsc::Sender<TurnEvent>>,
    ) -> Result<TurnOutcome, AgentError> {
        let _turn = session.try_begin_turn()?;
        let mut tool_calls = Vec::new();
        let result = self
            .drive(session, text, events.as_ref(), &mut tool_calls)
            .await;
        match &result {
            Ok(outcome) => {
                tracing::info!(
                    session_id = session.id(),
                    status = outcome.status.as_str(),
                    iterations = outcome.iterations,
                    tool_calls = outcome.tool_calls.len(),
                    "turn finished"
                );
                session.record_turn(TurnSummary {
                    reply: Some(outcome.reply.clone()),
                    status: Some(outcome.status),
                    error: None,
                    tool_call_ids: outcome.tool_calls.iter().map(|r| r.id.clone()).collect(),
                    finished_at: Utc::now(),
                });
            }
            Err(e) => {
                tracing::warn!(session_id = session.id(), error = %e, "turn failed");
                session.record_turn(TurnSummary {
                    reply: None,
                    status: None,
                    error: Some(e.to_string()),
                    tool_call_ids: tool_calls.iter().map(|r| r.id.clone()).collect(),
                    finished_at: Utc::now(),
                });
            }
        }
        emit(events.as_ref(), TurnEvent::Finished);
        result
    }

    async fn drive(
        &self,
        session: &Session,
        text: &str,
        events: Option<&mpsc::Sender<TurnEvent>>,
        tool_calls: &mut Vec<ToolCallRecord>,
    ) -> Result<TurnOutcome, AgentError> {
        session.append(Message::user(text));
        let mut usage = None;

        for iteration in 1..=self.max_iterations {
            let history = session.history();
            let request = LlmRequest {
                system: self.system_prompt.as_deref(),
                messages: &history,
                tools: self.executor.registry().specs(),
            };
            tracing::debug!(
                session_id = session.id(),
                iteration,
                messages = history.len(),
                "invoking model"
            );
            let response = self.llm.invoke(&request).await?;
            usage = LlmUsage::accumulate(usage, response.usage.as_ref());

            if response.tool_uses.is_empty() {
                let reply = if response.content.trim().is_empty() {
                    EMPTY_REPLY_FALLBACK.to_string()
                } else {
                    response.content
                };
                session.append(Message::assistant(reply.clone(), &[]));
                return Ok(TurnOutcome {
                    reply,
                    status: TurnStatus::Complete,
                    tool_calls: std::mem::take(tool_calls),
                    iterations: iteration,
                    usage,
                });
            }

            session.append(Message::assistant(response.content, &response.tool_uses));
            let records = self
                .run_tool_uses(session, &response.tool_uses, events)
                .await;
            let results = response
                .tool_uses
                .iter()
                .zip(&records)
                .map(|(tool_use, record)| ContentBlock::ToolResult {
                    tool_use_id: tool_use.id.clone(),
                    content: record.result_text(),
                    is_error: record.status == ToolCallStatus::Error,
                })
                .collect();
            session.append(Message::tool_results(results));
            tool_calls.extend(records);
        }

        tracing::warn!(
            session_id = session.id(),
            max_iterations = self.max_iterations,
            "iteration cap reached"
        );
        session.append(Message::assistant(LOOP_EXHAUSTED_REPLY, &[]));
        Ok(TurnOutcome {
            reply: LOOP_EXHAUSTED_REPLY.to_string(),
            status: TurnStatus::LoopExhausted,
            tool_calls: std::mem::take(tool_calls),
            iterations: self.max_iterations,
            usage,
        })
    }

    /// Registers all tool uses as pending, then validates and executes them concurrently.
    /// Returns the resolved records in request order.
    ///
    /// A session deleted from its store is no longer tracked: its calls still run, but as
    /// detached records that never reach the tracker.
    async fn run_tool_uses(
        &self,
        session: &Session,
        tool_uses: &[ToolUse],
        events: Option<&mpsc::Sender<TurnEvent>>,
    ) -> Vec<ToolCallRecord> {
        let session_id = session.id();
        let pending = if session.is_closed() {
            detached_records(session_id, tool_uses)
        } else {
            let registered: Vec<ToolCallRecord> = tool_uses
                .iter()
                .map(|u| {
                    let id = self
                        .tracker
                        .register(session_id, &u.name, u.input.clone(), Some(&u.id));
                    self.tracker
                        .get(session_id, &id)
                        .unwrap_or_else(|| detached_record(session_id, id, u))
                })
                .collect();
            // The store may have dropped the session between the check and the registration.
            if session.is_closed() {
                let ids: Vec<String> = registered.iter().map(|r| r.id.clone()).collect();
                self.tracker.forget(session_id, &ids);
            }
            registered
        };
        emit(events, TurnEvent::ToolCallsRegistered(pending.clone()));

        let runs = pending.into_iter().zip(tool_uses).map(|(record, tool_use)| async move {
            let outcome = self.execute_one(tool_use).await;
            if session.is_closed() {
                tracing::debug!(tool_call_id = %record.id, "session closed, tool call detached");
                let resolved = finish_detached(record, outcome);
                emit(events, TurnEvent::ToolCallResolved(resolved.clone()));
                return resolved;
            }
            let resolved = match self.tracker.resolve(session_id, &record.id, outcome.clone()) {
                Ok(resolved) => resolved,
                Err(e) => {
                    tracing::warn!(tool_call_id = %record.id, error = %e, "could not resolve tool call");
                    finish_detached(record, outcome)
                }
            };
            emit(events, TurnEvent::ToolCallResolved(resolved.clone()));
            resolved
        });
        join_all(runs).await
    }

    async fn execute_one(&self, tool_use: &ToolUse) -> Result<Value, String> {
        let result = match self.executor.validate(&tool_use.name, &tool_use.input) {
            Ok(invocation) => self.executor.execute_validated(invocation).await,
            Err(e) => Err(e),
        };
        match result {
            Ok(output) => {
                tracing::debug!(tool = %tool_use.name, "tool call completed");
                Ok(output)
            }
            Err(e) => {
                tracing::warn!(tool = %tool_use.name, error = %e, "tool call failed");
                Err(e.to_string())
            }
        }
    }
}

fn emit(events: Option<&mpsc::Sender<TurnEvent>>, event: TurnEvent) {
    if let Some(tx) = events {
        if let Err(e) = tx.try_send(event) {
            tracing::trace!(error = %e, "turn event dropped");
        }
    }
}

// Tracker records can disappear mid-turn when the session is deleted concurrently.
fn detached_record(session_id: &str, id: String, tool_use: &ToolUse) -> ToolCallRecord {
    ToolCallRecord {
        id,
        tool_name: tool_use.name.clone(),
        input: tool_use.input.clone(),
        tool_use_id: Some(tool_use.id.clone()),
        status: ToolCallStatus::Pending,
        ..ToolCallRecord::not_found(session_id, "")
    }
}

fn detached_records(session_id: &str, tool_uses: &[ToolUse]) -> Vec<ToolCallRecord> {
    tool_uses
        .iter()
        .map(|u| {
            let id = format!("toolu_{}", Uuid::new_v4().simple());
            detached_record(session_id, id, u)
        })
        .collect()
}

fn finish_detached(mut record: ToolCallRecord, outcome: Result<Value, String>) -> ToolCallRecord {
    match outcome {
        Ok(output) => {
            record.status = ToolCallStatus::Completed;
            record.output = Some(output);
        }
        Err(error) => {
            record.status = ToolCallStatus::Error;
            record.error = Some(error);
        }
    }
    record.resolved_at = Some(Utc::now());
    record
}
