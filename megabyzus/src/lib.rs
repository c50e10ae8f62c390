//! # Megabyzus
//!
//! A tool-calling conversation service core: a user message goes to a language model,
//! the model may request tools, the tools run, their results go back to the model, and
//! this repeats until the model answers in plain text or an iteration cap is reached.
//!
//! ## Main modules
//!
//! - [`tools`]: [`ToolRegistry`] (names, descriptions, JSON schemas, validation) and
//!   [`ToolExecutor`] (dispatch with a per-call timeout). Calculator tools and NASA
//!   Technology Transfer search tools are built in.
//! - [`agent`]: [`ConversationLoop`]. Runs one turn against a [`Session`].
//! - [`session`]: [`SessionStore`], [`Session`]. Sharded in-memory store with one turn at
//!   a time per session.
//! - [`tracker`]: [`ToolCallTracker`]. Pending → completed | error lifecycle of every
//!   tool call, queryable while a turn runs.
//! - [`llm`]: [`LlmClient`] trait, [`ChatAnthropic`], [`MockLlm`].
//! - [`message`]: [`Message`], [`ContentBlock`], [`Role`].
//! - [`protocol`]: JSON bodies of the HTTP API.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use megabyzus::{ConversationLoop, MockLlm, SessionStore, ToolCallTracker, ToolExecutor, ToolRegistry};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let registry = Arc::new(ToolRegistry::calculator()?);
//! let conversation = ConversationLoop::new(
//!     Arc::new(MockLlm::with_no_tool_calls("Hello!")),
//!     Arc::new(ToolExecutor::new(registry)),
//!     Arc::new(ToolCallTracker::new()),
//! );
//! let store = SessionStore::new();
//! let session = store.get_or_create(None);
//! let outcome = conversation.run_turn(&session, "hi").await?;
//! println!("{}", outcome.reply);
//! # Ok(())
//! # }
//! ```

pub mod agent;
pub mod error;
pub mod llm;
pub mod message;
pub mod protocol;
pub mod session;
pub mod tools;
pub mod tracker;

pub use agent::{ConversationLoop, TurnEvent, TurnOutcome, TurnStatus};
pub use error::AgentError;
pub use llm::{ChatAnthropic, LlmClient, LlmRequest, LlmResponse, LlmUsage, MockLlm};
pub use message::{ContentBlock, Message, Role, ToolUse};
pub use session::{Session, SessionStore, TurnSummary};
pub use tools::{
    TechTransferClient, TechTransferSearch, ToolError, ToolExecutor, ToolRegistry, ToolSpec,
    Toolset,
};
pub use tracker::{ToolCallRecord, ToolCallStatus, ToolCallTracker, TrackerError};
