//! Terminal rendering of a finished turn.

use megabyzus::{AgentError, ToolCallRecord, TurnOutcome, TurnStatus};

/// Tool calls (one line each) followed by the reply.
pub fn format_outcome(outcome: &TurnOutcome) -> String {
    let mut out = String::new();
    for call in &outcome.tool_calls {
        out.push_str(&format_call(call));
        out.push('\n');
    }
    if outcome.status == TurnStatus::LoopExhausted {
        out.push_str(&format!(
            "(stopped after {} model calls)\n",
            outcome.iterations
        ));
    }
    out.push_str(&outcome.reply);
    out
}

pub fn format_error(error: &AgentError) -> String {
    format!("error: {}", error)
}

fn format_call(call: &ToolCallRecord) -> String {
    format!(
        "  [{}] {} {} -> {}",
        call.status.as_str(),
        call.tool_name,
        call.input,
        truncate(&call.result_text(), 120)
    )
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let head: String = s.chars().take(max.saturating_sub(3)).collect();
    format!("{}...", head)
}
