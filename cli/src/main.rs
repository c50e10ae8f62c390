//! `megabyzus` binary: run the HTTP server, chat in the terminal, or inspect tools.
//!
//! Subcommands: `serve` (HTTP API), `chat` (interactive REPL, in-process), `tools` (list/show).

mod repl;

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use megabyzus::Toolset;

#[derive(Parser, Debug)]
#[command(name = "megabyzus")]
#[command(about = "Megabyzus: tool-calling assistant for arithmetic and NASA technology transfer data")]
struct Args {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug, Clone)]
enum Command {
    /// Run the HTTP server (default 0.0.0.0:8000 or MEGABYZUS_ADDR)
    Serve(ServeArgs),
    /// Chat with the assistant in this terminal; needs ANTHROPIC_API_KEY
    Chat(ChatArgs),
    /// List or show tool definitions
    Tools(ToolsArgs),
}

#[derive(clap::Args, Debug, Clone)]
struct ServeArgs {
    /// Listen address, overrides MEGABYZUS_ADDR
    #[arg(long, value_name = "ADDR")]
    addr: Option<String>,
}

#[derive(clap::Args, Debug, Clone)]
struct ChatArgs {
    /// calculator | nasa | all (default: MEGABYZUS_TOOLSET or all)
    #[arg(long, value_name = "TOOLSET")]
    toolset: Option<Toolset>,
}

#[derive(clap::Args, Debug, Clone)]
struct ToolsArgs {
    #[command(subcommand)]
    sub: ToolsCommand,
    /// calculator | nasa | all
    #[arg(long, value_name = "TOOLSET", global = true, default_value = "all")]
    toolset: Toolset,
    /// Print JSON instead of text
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand, Debug, Clone)]
enum ToolsCommand {
    /// List enabled tools (name and description)
    List,
    /// Show the full definition of one tool (name, description, input_schema)
    Show {
        /// Tool name (e.g. add, search_patents)
        name: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    config::load_and_apply("megabyzus", None).ok();
    let args = Args::parse();

    match args.cmd {
        Command::Serve(sa) => {
            config::tracing_init::init_stderr("info");
            if let Err(e) = serve::run_serve(sa.addr.as_deref()).await {
                eprintln!("serve error: {}", e);
                return ExitCode::FAILURE;
            }
        }
        Command::Chat(ca) => {
            config::tracing_init::init_stderr("warn");
            if let Err(e) = repl::run_repl(ca.toolset).await {
                eprintln!("megabyzus: {}", e);
                return ExitCode::FAILURE;
            }
        }
        Command::Tools(ta) => {
            let out = match &ta.sub {
                ToolsCommand::List => cli::list_tools(ta.toolset, ta.json),
                ToolsCommand::Show { name } => cli::show_tool(ta.toolset, name),
            };
            match out {
                Ok(s) => println!("{}", s),
                Err(e) => {
                    eprintln!("{}", e);
                    return ExitCode::FAILURE;
                }
            }
        }
    }
    ExitCode::SUCCESS
}
