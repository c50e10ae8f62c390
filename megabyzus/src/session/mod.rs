//! In-memory session store.
//!
//! Sessions live in a sharded [`DashMap`], so requests for different session ids do not
//! contend. Each [`Session`] owns its transcript behind its own lock and an exclusive
//! turn token: [`Session::try_begin_turn`] hands out at most one [`TurnGuard`] at a time,
//! and a second concurrent turn on the same session is rejected with
//! [`AgentError::SessionBusy`].
//!
//! Transcript locks are only held for the duration of a push or a clone, never across
//! an await, so a long model or tool call does not block readers of the history.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;
use uuid::Uuid;

use crate::agent::TurnStatus;
use crate::error::AgentError;
use crate::message::Message;

/// Summary of the last finished turn, for clients that do not wait on the turn itself.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TurnSummary {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<TurnStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub tool_call_ids: Vec<String>,
    pub finished_at: DateTime<Utc>,
}

/// Exclusive right to run a turn on one session; released on drop.
pub struct TurnGuard {
    _guard: tokio::sync::OwnedMutexGuard<()>,
}

/// One conversation: an append-only transcript plus turn bookkeeping.
pub struct Session {
    id: String,
    created_at: DateTime<Utc>,
    transcript: RwLock<Vec<Message>>,
    last_active: Mutex<Instant>,
    turn: Arc<tokio::sync::Mutex<()>>,
    last_turn: Mutex<Option<TurnSummary>>,
    /// Set once the store drops this session; a turn still running on it stops tracking.
    closed: AtomicBool,
}

impl Session {
    fn new(id: String) -> Self {
        Self {
            id,
            created_at: Utc::now(),
            transcript: RwLock::new(Vec::new()),
            last_active: Mutex::new(Instant::now()),
            turn: Arc::new(tokio::sync::Mutex::new(())),
            last_turn: Mutex::new(None),
            closed: AtomicBool::new(false),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Appends a message and returns its ordinal (index in the transcript).
    pub fn append(&self, message: Message) -> usize {
        let ordinal = {
            let mut transcript = self
                .transcript
                .write()
                .unwrap_or_else(PoisonError::into_inner);
            transcript.push(message);
            transcript.len() - 1
        };
        self.touch();
        ordinal
    }

    /// Snapshot of the transcript.
    pub fn history(&self) -> Vec<Message> {
        self.transcript
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn len(&self) -> usize {
        self.transcript
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Takes the session's turn token, or fails with [`AgentError::SessionBusy`].
    pub fn try_begin_turn(&self) -> Result<TurnGuard, AgentError> {
        let guard = Arc::clone(&self.turn)
            .try_lock_owned()
            .map_err(|_| AgentError::SessionBusy(self.id.clone()))?;
        self.touch();
        Ok(TurnGuard { _guard: guard })
    }

    pub fn is_turn_in_progress(&self) -> bool {
        self.turn.try_lock().is_err()
    }

    pub fn touch(&self) {
        *self.last_active.lock().unwrap_or_else(PoisonError::into_inner) = Instant::now();
    }

    pub fn idle_for(&self) -> Duration {
        self.last_active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .elapsed()
    }

    pub fn record_turn(&self, summary: TurnSummary) {
        *self.last_turn.lock().unwrap_or_else(PoisonError::into_inner) = Some(summary);
        self.touch();
    }

    /// True after the session was deleted or evicted from its store.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    pub fn last_turn(&self) -> Option<TurnSummary> {
        self.last_turn
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

/// Concurrency-safe map from session id to [`Session`].
#[derive(Default)]
pub struct SessionStore {
    sessions: DashMap<String, Arc<Session>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the session with this id, creating it if absent. `None` or an empty id
    /// creates a session with a fresh UUID.
    pub fn get_or_create(&self, id: Option<&str>) -> Arc<Session> {
        match id.map(str::trim).filter(|id| !id.is_empty()) {
            Some(id) => {
                let entry = self.sessions.entry(id.to_string()).or_insert_with(|| {
                    tracing::info!(session_id = id, "session created");
                    Arc::new(Session::new(id.to_string()))
                });
                Arc::clone(entry.value())
            }
            None => self.create(),
        }
    }

    /// Creates a session with a fresh UUID.
    pub fn create(&self) -> Arc<Session> {
        let id = Uuid::new_v4().to_string();
        let session = Arc::new(Session::new(id.clone()));
        self.sessions.insert(id.clone(), Arc::clone(&session));
        tracing::info!(session_id = %id, "session created");
        session
    }

    pub fn get(&self, id: &str) -> Option<Arc<Session>> {
        self.sessions.get(id).map(|e| Arc::clone(e.value()))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.sessions.contains_key(id)
    }

    /// Appends to an existing session; returns the message ordinal.
    pub fn append(&self, id: &str, message: Message) -> Result<usize, AgentError> {
        let session = self
            .get(id)
            .ok_or_else(|| AgentError::SessionNotFound(id.to_string()))?;
        Ok(session.append(message))
    }

    /// Removes the session. Returns whether it existed. A turn already running on it
    /// finishes against the detached session; later lookups see nothing.
    pub fn delete(&self, id: &str) -> bool {
        match self.sessions.remove(id) {
            Some((_, session)) => {
                session.close();
                tracing::info!(session_id = id, "session deleted");
                true
            }
            None => false,
        }
    }

    /// Removes sessions idle for longer than `ttl` that are not running a turn.
    pub fn evict_idle(&self, ttl: Duration) -> Vec<String> {
        let expired = |s: &Session| s.idle_for() > ttl && !s.is_turn_in_progress();
        let candidates: Vec<String> = self
            .sessions
            .iter()
            .filter(|e| expired(e.value()))
            .map(|e| e.key().clone())
            .collect();
        candidates
            .into_iter()
            .filter(|id| match self.sessions.remove_if(id, |_, s| expired(s)) {
                Some((_, session)) => {
                    session.close();
                    true
                }
                None => false,
            })
            .collect()
    }

    pub fn ids(&self) -> Vec<String> {
        self.sessions.iter().map(|e| e.key().clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
