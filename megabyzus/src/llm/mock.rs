//! Mock LLM for tests and offline runs.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use super::{LlmClient, LlmRequest, LlmResponse};
use crate::error::AgentError;
use crate::message::ToolUse;

type Responder = dyn Fn(&LlmRequest<'_>, usize) -> Result<LlmResponse, AgentError> + Send + Sync;

/// Mock LLM driven by a closure, a fixed script, or a fixed reply.
///
/// The closure receives the request and the zero-based call index, so tests can read the
/// transcript (e.g. the last tool result) and answer like a model would.
pub struct MockLlm {
    responder: Box<Responder>,
    calls: AtomicUsize,
}

impl MockLlm {
    pub fn from_fn<F>(f: F) -> Self
    where
        F: Fn(&LlmRequest<'_>, usize) -> Result<LlmResponse, AgentError> + Send + Sync + 'static,
    {
        Self {
            responder: Box::new(f),
            calls: AtomicUsize::new(0),
        }
    }

    /// Always replies with `content` and no tool uses.
    pub fn with_no_tool_calls(content: impl Into<String>) -> Self {
        let content = content.into();
        Self::from_fn(move |_, _| Ok(LlmResponse::text(content.clone())))
    }

    /// Requests the same tool on every call, with ids `call-1`, `call-2`, ...
    pub fn always_tool_use(name: impl Into<String>, input: Value) -> Self {
        let name = name.into();
        Self::from_fn(move |_, n| {
            Ok(LlmResponse::with_tool_uses(
                "",
                vec![ToolUse {
                    id: format!("call-{}", n + 1),
                    name: name.clone(),
                    input: input.clone(),
                }],
            ))
        })
    }

    /// Returns the scripted responses in order; errors once the script is used up.
    pub fn scripted(responses: Vec<LlmResponse>) -> Self {
        let queue = Mutex::new(VecDeque::from(responses));
        Self::from_fn(move |_, n| {
            let mut guard = queue
                .lock()
                .map_err(|_| AgentError::Model("mock script lock poisoned".to_string()))?;
            guard
                .pop_front()
                .ok_or_else(|| AgentError::Model(format!("mock script exhausted at call {}", n + 1)))
        })
    }

    /// Fails every call with a model error.
    pub fn failing(message: impl Into<String>) -> Self {
        let message = message.into();
        Self::from_fn(move |_, _| Err(AgentError::Model(message.clone())))
    }

    /// Number of `invoke` calls so far.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LlmClient for MockLlm {
    async fn invoke(&self, request: &LlmRequest<'_>) -> Result<LlmResponse, AgentError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        (self.responder)(request, n)
    }
}
