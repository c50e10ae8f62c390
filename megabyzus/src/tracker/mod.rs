//! Tool-call lifecycle tracker.
//!
//! Every tool use the model requests is registered as [`ToolCallStatus::Pending`] and
//! later resolved exactly once to `Completed` or `Error`. Records are grouped per session;
//! each group has its own lock, so tracking in one session never waits on another.
//! [`ToolCallTracker::query`] only reads, never blocks on a running tool, and reports
//! `NotFound` for ids it has never seen.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Lifecycle state of one tool call.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolCallStatus {
    Pending,
    Completed,
    Error,
    /// Returned by queries for ids the tracker has never registered.
    NotFound,
}

impl ToolCallStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
            Self::Error => "error",
            Self::NotFound => "not_found",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Error)
    }
}

/// One tracked tool invocation.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ToolCallRecord {
    pub id: String,
    pub session_id: String,
    pub tool_name: String,
    pub input: Value,
    /// Id of the model's tool-use block, when the call came from one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_use_id: Option<String>,
    pub status: ToolCallStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolved_at: Option<DateTime<Utc>>,
}

impl ToolCallRecord {
    /// Placeholder answer for an id that was never registered.
    pub fn not_found(session_id: &str, id: &str) -> Self {
        Self {
            id: id.to_string(),
            session_id: session_id.to_string(),
            tool_name: String::new(),
            input: Value::Null,
            tool_use_id: None,
            status: ToolCallStatus::NotFound,
            output: None,
            error: None,
            created_at: Utc::now(),
            resolved_at: None,
        }
    }

    /// Text fed back to the model as the tool result.
    pub fn result_text(&self) -> String {
        match (&self.output, &self.error) {
            (_, Some(err)) => format!("Error: {}", err),
            (Some(Value::String(s)), None) => s.clone(),
            (Some(v), None) => v.to_string(),
            (None, None) => String::new(),
        }
    }
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum TrackerError {
    #[error("tool call {id} not found in session {session_id}")]
    NotFound { session_id: String, id: String },
    #[error("tool call {id} already resolved as {status:?}")]
    AlreadyResolved { id: String, status: ToolCallStatus },
}

#[derive(Default)]
struct Calls {
    records: HashMap<String, ToolCallRecord>,
    order: Vec<String>,
}

struct SessionCalls {
    calls: RwLock<Calls>,
    last_touched: Mutex<Instant>,
}

impl SessionCalls {
    fn new() -> Self {
        Self {
            calls: RwLock::new(Calls::default()),
            last_touched: Mutex::new(Instant::now()),
        }
    }

    fn touch(&self) {
        *self.last_touched.lock().unwrap_or_else(PoisonError::into_inner) = Instant::now();
    }

    fn idle_for(&self) -> Duration {
        self.last_touched
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .elapsed()
    }

    fn has_pending(&self) -> bool {
        self.calls
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .records
            .values()
            .any(|r| r.status == ToolCallStatus::Pending)
    }
}

/// Per-session registry of tool-call records.
#[derive(Default)]
pub struct ToolCallTracker {
    sessions: DashMap<String, Arc<SessionCalls>>,
}

impl ToolCallTracker {
    pub fn new() -> Self {
        Self::default()
    }

    fn calls(&self, session_id: &str) -> Option<Arc<SessionCalls>> {
        self.sessions.get(session_id).map(|e| Arc::clone(e.value()))
    }

    /// Records a new pending call and returns its tracker id (`toolu_<uuid>`).
    pub fn register(
        &self,
        session_id: &str,
        tool_name: &str,
        input: Value,
        tool_use_id: Option<&str>,
    ) -> String {
        let group = Arc::clone(
            self.sessions
                .entry(session_id.to_string())
                .or_insert_with(|| Arc::new(SessionCalls::new()))
                .value(),
        );
        let mut calls = group.calls.write().unwrap_or_else(PoisonError::into_inner);
        let mut id = format!("toolu_{}", Uuid::new_v4().simple());
        while calls.records.contains_key(&id) {
            id = format!("toolu_{}", Uuid::new_v4().simple());
        }
        calls.records.insert(
            id.clone(),
            ToolCallRecord {
                id: id.clone(),
                session_id: session_id.to_string(),
                tool_name: tool_name.to_string(),
                input,
                tool_use_id: tool_use_id.map(str::to_string),
                status: ToolCallStatus::Pending,
                output: None,
                error: None,
                created_at: Utc::now(),
                resolved_at: None,
            },
        );
        calls.order.push(id.clone());
        drop(calls);
        group.touch();
        tracing::debug!(session_id, tool = tool_name, tool_call_id = %id, "tool call registered");
        id
    }

    /// Moves a pending call to `Completed` (`Ok`) or `Error` (`Err`) and returns the
    /// updated record. Terminal records are never changed.
    pub fn resolve(
        &self,
        session_id: &str,
        id: &str,
        outcome: Result<Value, String>,
    ) -> Result<ToolCallRecord, TrackerError> {
        let not_found = || TrackerError::NotFound {
            session_id: session_id.to_string(),
            id: id.to_string(),
        };
        let group = self.calls(session_id).ok_or_else(not_found)?;
        let mut calls = group.calls.write().unwrap_or_else(PoisonError::into_inner);
        let record = calls.records.get_mut(id).ok_or_else(not_found)?;
        if record.status.is_terminal() {
            return Err(TrackerError::AlreadyResolved {
                id: id.to_string(),
                status: record.status,
            });
        }
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
        let resolved = record.clone();
        drop(calls);
        group.touch();
        Ok(resolved)
    }

    /// Current state of each requested id, in request order. Unknown ids (or an unknown
    /// session) come back as [`ToolCallStatus::NotFound`].
    pub fn query(&self, session_id: &str, ids: &[String]) -> Vec<ToolCallRecord> {
        let Some(group) = self.calls(session_id) else {
            return ids
                .iter()
                .map(|id| ToolCallRecord::not_found(session_id, id))
                .collect();
        };
        let calls = group.calls.read().unwrap_or_else(PoisonError::into_inner);
        ids.iter()
            .map(|id| {
                calls
                    .records
                    .get(id)
                    .cloned()
                    .unwrap_or_else(|| ToolCallRecord::not_found(session_id, id))
            })
            .collect()
    }

    pub fn get(&self, session_id: &str, id: &str) -> Option<ToolCallRecord> {
        let group = self.calls(session_id)?;
        let calls = group.calls.read().unwrap_or_else(PoisonError::into_inner);
        calls.records.get(id).cloned()
    }

    /// All records of a session in registration order.
    pub fn list(&self, session_id: &str) -> Vec<ToolCallRecord> {
        let Some(group) = self.calls(session_id) else {
            return Vec::new();
        };
        let calls = group.calls.read().unwrap_or_else(PoisonError::into_inner);
        calls
            .order
            .iter()
            .filter_map(|id| calls.records.get(id).cloned())
            .collect()
    }

    /// Drops every record of a session; returns how many were removed.
    pub fn remove_session(&self, session_id: &str) -> usize {
        self.sessions
            .remove(session_id)
            .map(|(_, group)| {
                group
                    .calls
                    .read()
                    .unwrap_or_else(PoisonError::into_inner)
                    .records
                    .len()
            })
            .unwrap_or(0)
    }

    /// Drops the given records of a session, and the session's group once it is empty.
    /// Returns how many were removed.
    pub fn forget(&self, session_id: &str, ids: &[String]) -> usize {
        let Some(group) = self.calls(session_id) else {
            return 0;
        };
        let removed = {
            let mut calls = group.calls.write().unwrap_or_else(PoisonError::into_inner);
            let removed = ids
                .iter()
                .filter(|id| calls.records.remove(id.as_str()).is_some())
                .count();
            calls.order.retain(|id| !ids.contains(id));
            removed
        };
        self.sessions.remove_if(session_id, |_, g| {
            g.calls
                .read()
                .unwrap_or_else(PoisonError::into_inner)
                .records
                .is_empty()
        });
        removed
    }

    /// Drops record groups untouched for longer than `ttl` that have nothing pending.
    pub fn evict_idle(&self, ttl: Duration) -> Vec<String> {
        let expired = |g: &SessionCalls| g.idle_for() > ttl && !g.has_pending();
        let candidates: Vec<String> = self
            .sessions
            .iter()
            .filter(|e| expired(e.value()))
            .map(|e| e.key().clone())
            .collect();
        candidates
            .into_iter()
            .filter(|id| self.sessions.remove_if(id, |_, g| expired(g)).is_some())
            .collect()
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn register_then_resolve_completed() {
        let tracker = ToolCallTracker::new();
        let id = tracker.register("s1", "add", json!({"a": 1, "b": 2}), Some("toolu_model"));
        assert!(id.starts_with("toolu_"));
        let pending = tracker.get("s1", &id).unwrap();
        assert_eq!(pending.status, ToolCallStatus::Pending);
        assert_eq!(pending.tool_use_id.as_deref(), Some("toolu_model"));

        let done = tracker.resolve("s1", &id, Ok(json!(3))).unwrap();
        assert_eq!(done.status, ToolCallStatus::Completed);
        assert_eq!(done.output, Some(json!(3)));
        assert!(done.resolved_at.is_some());

        // Stays completed across repeated queries.
        for _ in 0..3 {
            let q = tracker.query("s1", &[id.clone()]);
            assert_eq!(q[0].status, ToolCallStatus::Completed);
            assert_eq!(q[0].output, Some(json!(3)));
        }
    }

    #[test]
    fn resolve_twice_is_rejected_and_state_kept() {
        let tracker = ToolCallTracker::new();
        let id = tracker.register("s1", "divide", json!({}), None);
        tracker
            .resolve("s1", &id, Err("Cannot divide by zero".into()))
            .unwrap();
        let err = tracker.resolve("s1", &id, Ok(json!(1))).unwrap_err();
        assert_eq!(
            err,
            TrackerError::AlreadyResolved {
                id: id.clone(),
                status: ToolCallStatus::Error
            }
        );
        let record = tracker.get("s1", &id).unwrap();
        assert_eq!(record.status, ToolCallStatus::Error);
        assert_eq!(record.error.as_deref(), Some("Cannot divide by zero"));
        assert_eq!(record.result_text(), "Error: Cannot divide by zero");
    }

    #[test]
    fn resolve_unknown_id_is_not_found() {
        let tracker = ToolCallTracker::new();
        assert!(matches!(
            tracker.resolve("s1", "toolu_x", Ok(json!(1))),
            Err(TrackerError::NotFound { .. })
        ));
        tracker.register("s1", "add", json!({}), None);
        assert!(matches!(
            tracker.resolve("s1", "toolu_x", Ok(json!(1))),
            Err(TrackerError::NotFound { .. })
        ));
    }

    #[test]
    fn query_mixes_known_and_unknown_ids() {
        let tracker = ToolCallTracker::new();
        let a = tracker.register("s1", "add", json!({}), None);
        let b = tracker.register("s1", "multiply", json!({}), None);
        tracker.resolve("s1", &a, Ok(json!(60))).unwrap();
        let q = tracker.query("s1", &[a.clone(), "bogus".into(), b.clone()]);
        let statuses: Vec<_> = q.iter().map(|r| r.status).collect();
        assert_eq!(
            statuses,
            vec![
                ToolCallStatus::Completed,
                ToolCallStatus::NotFound,
                ToolCallStatus::Pending
            ]
        );
        assert_eq!(q[1].id, "bogus");
    }

    #[test]
    fn ids_are_scoped_per_session() {
        let tracker = ToolCallTracker::new();
        let id = tracker.register("s1", "add", json!({}), None);
        let q = tracker.query("s2", &[id.clone()]);
        assert_eq!(q[0].status, ToolCallStatus::NotFound);
        assert!(tracker.get("s2", &id).is_none());
    }

    #[test]
    fn list_keeps_registration_order_and_remove_session_clears() {
        let tracker = ToolCallTracker::new();
        let ids: Vec<String> = (0..4)
            .map(|i| tracker.register("s1", "add", json!({"a": i, "b": 0}), None))
            .collect();
        let listed: Vec<String> = tracker.list("s1").into_iter().map(|r| r.id).collect();
        assert_eq!(listed, ids);
        assert_eq!(tracker.remove_session("s1"), 4);
        assert!(tracker.list("s1").is_empty());
        assert_eq!(tracker.query("s1", &ids[..1])[0].status, ToolCallStatus::NotFound);
    }

    #[test]
    fn evict_idle_keeps_groups_with_pending_calls() {
        let tracker = ToolCallTracker::new();
        tracker.register("pending", "add", json!({}), None);
        let id = tracker.register("done", "add", json!({}), None);
        tracker.resolve("done", &id, Ok(json!(0))).unwrap();
        std::thread::sleep(Duration::from_millis(5));
        let evicted = tracker.evict_idle(Duration::from_millis(1));
        assert_eq!(evicted, vec!["done".to_string()]);
        assert_eq!(tracker.session_count(), 1);
    }

    #[test]
    fn forget_drops_only_named_records_and_empty_groups() {
        let tracker = ToolCallTracker::new();
        let keep = tracker.register("s", "add", json!({}), None);
        let drop_me = tracker.register("s", "add", json!({}), None);
        assert_eq!(tracker.forget("s", &[drop_me.clone(), "toolu_x".to_string()]), 1);
        let listed: Vec<String> = tracker.list("s").into_iter().map(|r| r.id).collect();
        assert_eq!(listed, vec![keep.clone()]);
        assert_eq!(tracker.query("s", &[drop_me])[0].status, ToolCallStatus::NotFound);

        assert_eq!(tracker.forget("s", &[keep]), 1);
        assert_eq!(tracker.session_count(), 0);
        assert_eq!(tracker.forget("ghost", &["a".to_string()]), 0);
    }

    #[test]
    fn result_text_unquotes_strings() {
        let tracker = ToolCallTracker::new();
        let id = tracker.register("s", "echo", json!({}), None);
        let r = tracker.resolve("s", &id, Ok(json!("plain"))).unwrap();
        assert_eq!(r.result_text(), "plain");
        assert_eq!(ToolCallStatus::NotFound.as_str(), "not_found");
        assert_eq!(serde_json::to_value(ToolCallStatus::NotFound).unwrap(), "not_found");
    }
}
