//! LLM client abstraction for the conversation loop.
//!
//! The loop sends the whole transcript plus the enabled tool specs and gets back either
//! final text or one or more tool-use requests. Vendor protocol details live in the
//! implementations: [`ChatAnthropic`] (Anthropic Messages API) and [`MockLlm`] (tests).

mod anthropic;
mod mock;

pub use anthropic::{ChatAnthropic, DEFAULT_ANTHROPIC_MODEL, DEFAULT_MAX_TOKENS};
pub use mock::MockLlm;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::AgentError;
use crate::message::{Message, ToolUse};
use crate::tools::ToolSpec;

/// Token usage for one LLM call (prompt + completion).
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LlmUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

impl LlmUsage {
    /// Sums two optional usages; `None` only when both are `None`.
    pub fn accumulate(total: Option<LlmUsage>, next: Option<&LlmUsage>) -> Option<LlmUsage> {
        match (total, next) {
            (Some(t), Some(u)) => Some(LlmUsage {
                prompt_tokens: t.prompt_tokens + u.prompt_tokens,
                completion_tokens: t.completion_tokens + u.completion_tokens,
                total_tokens: t.total_tokens + u.total_tokens,
            }),
            (None, Some(u)) => Some(u.clone()),
            (t, None) => t,
        }
    }
}

/// One model request: system prompt, full history, and tool definitions.
#[derive(Clone, Copy, Debug)]
pub struct LlmRequest<'a> {
    pub system: Option<&'a str>,
    pub messages: &'a [Message],
    pub tools: &'a [ToolSpec],
}

/// Model reply: text and any tool-use requests. No tool uses means the turn is done.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LlmResponse {
    pub content: String,
    pub tool_uses: Vec<ToolUse>,
    pub usage: Option<LlmUsage>,
}

impl LlmResponse {
    /// Final text reply.
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            tool_uses: vec![],
            usage: None,
        }
    }

    /// Reply requesting tool use, with optional accompanying text.
    pub fn with_tool_uses(content: impl Into<String>, tool_uses: Vec<ToolUse>) -> Self {
        Self {
            content: content.into(),
            tool_uses,
            usage: None,
        }
    }
}

/// LLM client: given the request, returns assistant text and optional tool uses.
///
/// Implementations must be cheap to share (`Arc<dyn LlmClient>`) and safe to call from
/// concurrent turns of different sessions.
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn invoke(&self, request: &LlmRequest<'_>) -> Result<LlmResponse, AgentError>;
}
