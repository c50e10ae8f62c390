//! HTTP server for megabyzus (axum).
//!
//! Listens on `MEGABYZUS_ADDR` (default 0.0.0.0:8000) and serves `POST /message`,
//! `POST /tool-call-status`, `GET /sessions/{id}/history`, `GET /sessions/{id}/turn`,
//! `DELETE /sessions/{id}` and `GET /health`, at the root and under `/api`.
//!
//! **Public API**: [`run_serve`], [`run_serve_on_listener`], [`AppState`], [`ServeConfig`], [`router`].

mod app;
mod message;
mod response;
mod sessions;
mod status;
mod sweeper;

use std::future::Future;

use tokio::net::TcpListener;
use tracing::info;

pub use app::{router, AppState, ServeConfig};
pub use response::ApiError;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Serves `state` on an existing listener until `shutdown` resolves. Used by tests (bind to
/// 127.0.0.1:0 then pass the listener) and by [`run_serve`].
pub async fn run_serve_on_listener<F>(
    listener: TcpListener,
    state: AppState,
    config: &ServeConfig,
    shutdown: F,
) -> Result<(), BoxError>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = listener.local_addr()?;
    info!("megabyzus listening on http://{}", addr);
    let sweeper = sweeper::spawn(state.clone(), config.session_ttl, config.sweep_interval);
    let result = axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await;
    sweeper.abort();
    info!("server stopped");
    result.map_err(Into::into)
}

/// Runs the server from environment configuration. `addr` overrides `MEGABYZUS_ADDR`.
/// Stops on Ctrl-C.
pub async fn run_serve(addr: Option<&str>) -> Result<(), BoxError> {
    let config = ServeConfig::from_env();
    let state = AppState::from_config(&config)?;
    let addr = addr.unwrap_or(config.addr.as_str());
    let listener = TcpListener::bind(addr).await?;
    run_serve_on_listener(listener, state, &config, async {
        if tokio::signal::ctrl_c().await.is_err() {
            std::future::pending::<()>().await;
        }
    })
    .await
}
