//! Conversation messages.
//!
//! A message is a role plus a list of content blocks. Assistant messages may carry
//! `tool_use` blocks; the reply to them is a single `tool_result` message holding one
//! block per tool use, in request order.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Who produced a message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
    ToolResult,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::ToolResult => "tool_result",
        }
    }
}

/// One segment of message content.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text {
        text: String,
    },
    /// A model request to run a named tool.
    ToolUse {
        id: String,
        name: String,
        input: Value,
    },
    /// Output (or error text) of the tool use with id `tool_use_id`.
    ToolResult {
        tool_use_id: String,
        content: String,
        #[serde(default, skip_serializing_if = "std::ops::Not::not")]
        is_error: bool,
    },
}

/// A tool-use request from the model, before it is tracked.
#[derive(Clone, Debug, PartialEq)]
pub struct ToolUse {
    /// Model-assigned id, echoed back in the matching tool result.
    pub id: String,
    pub name: String,
    pub input: Value,
}

/// A message in a session transcript. Never mutated once appended.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: Vec<ContentBlock>,
}

impl Message {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: vec![ContentBlock::Text { text: text.into() }],
        }
    }

    /// Assistant message with optional text followed by tool-use blocks.
    pub fn assistant(text: impl Into<String>, tool_uses: &[ToolUse]) -> Self {
        let text = text.into();
        let mut content = Vec::with_capacity(tool_uses.len() + 1);
        if !text.is_empty() {
            content.push(ContentBlock::Text { text });
        }
        content.extend(tool_uses.iter().map(|u| ContentBlock::ToolUse {
            id: u.id.clone(),
            name: u.name.clone(),
            input: u.input.clone(),
        }));
        Self {
            role: Role::Assistant,
            content,
        }
    }

    pub fn tool_results(results: Vec<ContentBlock>) -> Self {
        Self {
            role: Role::ToolResult,
            content: results,
        }
    }

    /// Concatenated text blocks; tool blocks are skipped.
    pub fn text(&self) -> String {
        let parts: Vec<&str> = self
            .content
            .iter()
            .filter_map(|b| match b {
                ContentBlock::Text { text } => Some(text.as_str()),
                _ => None,
            })
            .collect();
        parts.join("\n")
    }

    /// Tool-use blocks of this message.
    pub fn tool_uses(&self) -> Vec<ToolUse> {
        self.content
            .iter()
            .filter_map(|b| match b {
                ContentBlock::ToolUse { id, name, input } => Some(ToolUse {
                    id: id.clone(),
                    name: name.clone(),
                    input: input.clone(),
                }),
                _ => None,
            })
            .collect()
    }
}
