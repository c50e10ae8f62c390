//! Axum app: configuration, shared state, and router.
//!
//! Every route is mounted at the root and again under `/api`, behind permissive CORS
//! and per-request tracing.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    routing::{delete, get, post},
    Router,
};
use megabyzus::agent::{DEFAULT_MAX_ITERATIONS, DEFAULT_SYSTEM_PROMPT};
use megabyzus::llm::{DEFAULT_ANTHROPIC_MODEL, DEFAULT_MAX_TOKENS};
use megabyzus::tools::DEFAULT_TOOL_TIMEOUT;
use megabyzus::{
    AgentError, ChatAnthropic, ConversationLoop, SessionStore, TechTransferClient,
    ToolCallTracker, ToolExecutor, ToolRegistry, Toolset,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::{message, sessions, status};

pub(crate) const DEFAULT_ADDR: &str = "0.0.0.0:8000";

/// Server configuration.
#[derive(Clone, Debug)]
pub struct ServeConfig {
    pub addr: String,
    pub model: String,
    pub max_tokens: u32,
    pub max_iterations: usize,
    pub tool_timeout: Duration,
    /// Idle time after which a session and its tool-call records are evicted.
    pub session_ttl: Duration,
    pub sweep_interval: Duration,
    pub toolset: Toolset,
    pub system_prompt: String,
}

impl Default for ServeConfig {
    fn default() -> Self {
        Self {
            addr: DEFAULT_ADDR.to_string(),
            model: DEFAULT_ANTHROPIC_MODEL.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            tool_timeout: DEFAULT_TOOL_TIMEOUT,
            session_ttl: Duration::from_secs(3600),
            sweep_interval: Duration::from_secs(60),
            toolset: Toolset::default(),
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|s| s.trim().parse().ok())
}

fn env_secs(key: &str) -> Option<Duration> {
    env_parse::<u64>(key)
        .filter(|s| *s > 0)
        .map(Duration::from_secs)
}

impl ServeConfig {
    /// Builds config from environment variables, falling back to [`Default`] for unset or
    /// invalid values.
    ///
    /// - `MEGABYZUS_ADDR` (default 0.0.0.0:8000)
    /// - `MEGABYZUS_MODEL`, `MEGABYZUS_MAX_TOKENS`
    /// - `MEGABYZUS_MAX_ITERATIONS` (default 8)
    /// - `MEGABYZUS_TOOL_TIMEOUT_SECS` (default 30)
    /// - `MEGABYZUS_SESSION_TTL_SECS` (default 3600), `MEGABYZUS_SWEEP_INTERVAL_SECS` (default 60)
    /// - `MEGABYZUS_TOOLSET`: calculator | nasa | all
    /// - `MEGABYZUS_SYSTEM_PROMPT`
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            addr: std::env::var("MEGABYZUS_ADDR")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .unwrap_or(default.addr),
            model: std::env::var("MEGABYZUS_MODEL")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .unwrap_or(default.model),
            max_tokens: env_parse("MEGABYZUS_MAX_TOKENS")
                .filter(|n| *n > 0)
                .unwrap_or(default.max_tokens),
            max_iterations: env_parse("MEGABYZUS_MAX_ITERATIONS")
                .filter(|n| *n > 0)
                .unwrap_or(default.max_iterations),
            tool_timeout: env_secs("MEGABYZUS_TOOL_TIMEOUT_SECS").unwrap_or(default.tool_timeout),
            session_ttl: env_secs("MEGABYZUS_SESSION_TTL_SECS").unwrap_or(default.session_ttl),
            sweep_interval: env_secs("MEGABYZUS_SWEEP_INTERVAL_SECS")
                .unwrap_or(default.sweep_interval),
            toolset: env_parse("MEGABYZUS_TOOLSET").unwrap_or(default.toolset),
            system_prompt: std::env::var("MEGABYZUS_SYSTEM_PROMPT")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .unwrap_or(default.system_prompt),
        }
    }
}

/// Shared state for the HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<SessionStore>,
    pub conversation: Arc<ConversationLoop>,
}

impl AppState {
    pub fn new(conversation: ConversationLoop) -> Self {
        Self {
            sessions: Arc::new(SessionStore::new()),
            conversation: Arc::new(conversation),
        }
    }

    pub fn tracker(&self) -> &Arc<ToolCallTracker> {
        self.conversation.tracker()
    }

    /// Production state: Anthropic model (key from `ANTHROPIC_API_KEY`), the configured
    /// toolset, and the NASA Technology Transfer API as the search backend.
    pub fn from_config(config: &ServeConfig) -> Result<Self, AgentError> {
        let llm = ChatAnthropic::from_env()?
            .with_model(config.model.clone())
            .with_max_tokens(config.max_tokens);
        let registry = Arc::new(ToolRegistry::for_toolset(config.toolset)?);
        let executor = ToolExecutor::new(registry)
            .with_search(Arc::new(TechTransferClient::new()))
            .with_timeout(config.tool_timeout);
        let conversation = ConversationLoop::new(
            Arc::new(llm),
            Arc::new(executor),
            Arc::new(ToolCallTracker::new()),
        )
        .with_system_prompt(config.system_prompt.clone())
        .with_max_iterations(config.max_iterations);
        Ok(Self::new(conversation))
    }
}

fn routes() -> Router<AppState> {
    Router::new()
        .route("/message", post(message::post_message))
        .route("/tool-call-status", post(status::post_tool_call_status))
        .route("/sessions/:id/history", get(sessions::get_history))
        .route("/sessions/:id/turn", get(sessions::get_turn))
        .route("/sessions/:id", delete(sessions::delete_session))
        .route("/health", get(sessions::health))
}

/// Builds the router with every route at `/` and under `/api`.
pub fn router(state: AppState) -> Router {
    Router::new()
        .merge(routes())
        .nest("/api", routes())
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
