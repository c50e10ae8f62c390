//! Conversation loop: drives one user turn through model calls and tool executions.
//!
//! See [`ConversationLoop`] for the turn algorithm and [`TurnEvent`] for the observer
//! channel used by background-mode requests.

mod conversation;

pub use conversation::{
    ConversationLoop, TurnEvent, TurnOutcome, TurnStatus, DEFAULT_MAX_ITERATIONS,
    DEFAULT_SYSTEM_PROMPT, EMPTY_REPLY_FALLBACK, LOOP_EXHAUSTED_REPLY,
};
