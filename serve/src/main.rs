//! `megabyzus-serve`: the HTTP server binary.

use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    config::load_and_apply("megabyzus", None).ok();
    config::tracing_init::init_stderr("info");
    match serve::run_serve(None).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "server failed");
            ExitCode::FAILURE
        }
    }
}
