//! Interactive REPL: read stdin, run a turn in-process, print tool calls and reply,
//! repeat until EOF or quit. One session for the whole REPL.

use std::io::Write;

use cli::{format_error, format_outcome, CliError};
use megabyzus::Toolset;
use serve::{AppState, ServeConfig};
use tokio::io::{AsyncBufReadExt, BufReader};

/// Runs the REPL. `toolset` overrides `MEGABYZUS_TOOLSET`.
///
/// Exits on EOF (Ctrl+D) or `quit`/`exit`/`/quit`. A failed turn is printed to stderr
/// and the loop continues.
pub async fn run_repl(toolset: Option<Toolset>) -> Result<(), CliError> {
    let mut config = ServeConfig::from_env();
    if let Some(t) = toolset {
        config.toolset = t;
    }
    let state = AppState::from_config(&config)?;
    let session = state.sessions.create();
    tracing::debug!(session_id = session.id(), "repl session started");

    let mut reader = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let line = match reader.next_line().await? {
            None => break,
            Some(s) if s.trim().is_empty() => continue,
            Some(s) if is_quit_command(&s) => break,
            Some(s) => s,
        };

        match state.conversation.run_turn(&session, line.trim()).await {
            Ok(outcome) => println!("{}", format_outcome(&outcome)),
            Err(e) => eprintln!("{}", format_error(&e)),
        }
    }
    Ok(())
}

fn is_quit_command(s: &str) -> bool {
    let lower = s.trim().to_lowercase();
    matches!(lower.as_str(), "quit" | "exit" | "/quit")
}
