//! Anthropic Messages API client.
//!
//! Converts the transcript into Anthropic's wire format: `tool_result` messages are sent
//! with role `user`, consecutive messages with the same wire role are merged, and empty
//! text blocks are dropped (the API rejects them).

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

use super::{LlmClient, LlmRequest, LlmResponse, LlmUsage};
use crate::error::AgentError;
use crate::message::{ContentBlock, Message, Role, ToolUse};

pub const DEFAULT_ANTHROPIC_MODEL: &str = "claude-3-7-sonnet-20250219";
pub const DEFAULT_MAX_TOKENS: u32 = 8000;

const ANTHROPIC_API_BASE: &str = "https://api.anthropic.com";
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Anthropic chat client over reqwest.
pub struct ChatAnthropic {
    api_key: String,
    model: String,
    max_tokens: u32,
    base_url: String,
    client: reqwest::Client,
}

impl ChatAnthropic {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: DEFAULT_ANTHROPIC_MODEL.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
            base_url: ANTHROPIC_API_BASE.to_string(),
            client: reqwest::Client::new(),
        }
    }

    /// Reads `ANTHROPIC_API_KEY`.
    pub fn from_env() -> Result<Self, AgentError> {
        let key = std::env::var("ANTHROPIC_API_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| AgentError::Config("ANTHROPIC_API_KEY is not set".to_string()))?;
        Ok(Self::new(key))
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Request body for `POST /v1/messages`.
    pub fn request_body(&self, request: &LlmRequest<'_>) -> Value {
        let mut body = json!({
            "model": self.model,
            "max_tokens": self.max_tokens,
            "messages": wire_messages(request.messages),
        });
        if let Some(system) = request.system.filter(|s| !s.is_empty()) {
            body["system"] = json!(system);
        }
        if !request.tools.is_empty() {
            body["tools"] = Value::Array(
                request
                    .tools
                    .iter()
                    .map(|t| {
                        json!({
                            "name": t.name,
                            "description": t.description,
                            "input_schema": t.input_schema,
                        })
                    })
                    .collect(),
            );
        }
        body
    }
}

fn wire_role(role: Role) -> &'static str {
    match role {
        Role::Assistant => "assistant",
        Role::User | Role::ToolResult => "user",
    }
}

fn wire_block(block: &ContentBlock) -> Option<Value> {
    match block {
        ContentBlock::Text { text } if text.is_empty() => None,
        ContentBlock::Text { text } => Some(json!({ "type": "text", "text": text })),
        ContentBlock::ToolUse { id, name, input } => Some(json!({
            "type": "tool_use",
            "id": id,
            "name": name,
            "input": input,
        })),
        ContentBlock::ToolResult {
            tool_use_id,
            content,
            is_error,
        } => Some(json!({
            "type": "tool_result",
            "tool_use_id": tool_use_id,
            "content": content,
            "is_error": is_error,
        })),
    }
}

fn wire_messages(messages: &[Message]) -> Vec<Value> {
    let mut out: Vec<(&'static str, Vec<Value>)> = Vec::new();
    for m in messages {
        let blocks: Vec<Value> = m.content.iter().filter_map(wire_block).collect();
        if blocks.is_empty() {
            continue;
        }
        let role = wire_role(m.role);
        match out.last_mut() {
            Some((last_role, last_blocks)) if *last_role == role => last_blocks.extend(blocks),
            _ => out.push((role, blocks)),
        }
    }
    out.into_iter()
        .map(|(role, content)| json!({ "role": role, "content": content }))
        .collect()
}

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum WireContent {
    Text {
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
        input: Value,
    },
    #[serde(other)]
    Other,
}

#[derive(Deserialize)]
struct WireUsage {
    #[serde(default)]
    input_tokens: u32,
    #[serde(default)]
    output_tokens: u32,
}

#[derive(Deserialize)]
struct WireResponse {
    #[serde(default)]
    content: Vec<WireContent>,
    #[serde(default)]
    usage: Option<WireUsage>,
}

fn parse_response(resp: WireResponse) -> LlmResponse {
    let mut texts = Vec::new();
    let mut tool_uses = Vec::new();
    for block in resp.content {
        match block {
            WireContent::Text { text } => texts.push(text),
            WireContent::ToolUse { id, name, input } => tool_uses.push(ToolUse { id, name, input }),
            WireContent::Other => {}
        }
    }
    LlmResponse {
        content: texts.join("\n"),
        tool_uses,
        usage: resp.usage.map(|u| LlmUsage {
            prompt_tokens: u.input_tokens,
            completion_tokens: u.output_tokens,
            total_tokens: u.input_tokens + u.output_tokens,
        }),
    }
}

#[async_trait]
impl LlmClient for ChatAnthropic {
    async fn invoke(&self, request: &LlmRequest<'_>) -> Result<LlmResponse, AgentError> {
        let body = self.request_body(request);
        tracing::debug!(
            model = %self.model,
            messages = request.messages.len(),
            tools = request.tools.len(),
            "anthropic request"
        );
        let response = self
            .client
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(|e| AgentError::Model(format!("request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(AgentError::Model(format!(
                "anthropic API error {}: {}",
                status, text
            )));
        }

        let wire: WireResponse = response
            .json()
            .await
            .map_err(|e| AgentError::Model(format!("failed to parse response: {}", e)))?;
        Ok(parse_response(wire))
    }
}
