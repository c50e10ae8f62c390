//! Shared helpers for e2e tests. Responses are logged with `[e2e] received: ...`; run with
//! `--nocapture` to see them.

use std::sync::Arc;
use std::time::Duration;

use megabyzus::tools::nasa::RawResults;
use megabyzus::tools::SearchCategory;
use megabyzus::{
    AgentError, ContentBlock, ConversationLoop, LlmResponse, Message, MockLlm, Role,
    TechTransferSearch, ToolCallTracker, ToolError, ToolExecutor, ToolRegistry, ToolUse,
};
use serde_json::{json, Value};
use serve::{AppState, ServeConfig};
use tokio::net::TcpListener;
use tokio::sync::{oneshot, Notify};

pub struct TestServer {
    pub base: String,
    pub state: AppState,
    client: reqwest::Client,
    shutdown: Option<oneshot::Sender<()>>,
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}

/// Binds to a random port and serves `conversation` until the returned server is dropped.
pub async fn spawn_server(conversation: ConversationLoop) -> TestServer {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let state = AppState::new(conversation);
    let (tx, rx) = oneshot::channel::<()>();
    let server_state = state.clone();
    tokio::spawn(async move {
        let config = ServeConfig::default();
        serve::run_serve_on_listener(listener, server_state, &config, async {
            let _ = rx.await;
        })
        .await
    });
    TestServer {
        base: format!("http://{}", addr),
        state,
        client: reqwest::Client::new(),
        shutdown: Some(tx),
    }
}

impl TestServer {
    async fn read(resp: reqwest::Response) -> (u16, Value) {
        let status = resp.status().as_u16();
        let text = resp.text().await.unwrap();
        eprintln!("[e2e] received: {} {}", status, text);
        let body = serde_json::from_str(&text).unwrap_or(Value::Null);
        (status, body)
    }

    pub async fn post(&self, path: &str, body: Value) -> (u16, Value) {
        let resp = self
            .client
            .post(format!("{}{}", self.base, path))
            .json(&body)
            .send()
            .await
            .unwrap();
        Self::read(resp).await
    }

    pub async fn post_raw(&self, path: &str, body: &'static str) -> (u16, Value) {
        let resp = self
            .client
            .post(format!("{}{}", self.base, path))
            .header("content-type", "application/json")
            .body(body)
            .send()
            .await
            .unwrap();
        Self::read(resp).await
    }

    pub async fn get(&self, path: &str) -> (u16, Value) {
        let resp = self
            .client
            .get(format!("{}{}", self.base, path))
            .send()
            .await
            .unwrap();
        Self::read(resp).await
    }

    pub async fn delete(&self, path: &str) -> (u16, Value) {
        let resp = self
            .client
            .delete(format!("{}{}", self.base, path))
            .send()
            .await
            .unwrap();
        Self::read(resp).await
    }

    /// Polls `GET /sessions/{id}/turn` until no turn is in progress.
    pub async fn wait_for_turn(&self, session_id: &str) -> Value {
        for _ in 0..200 {
            let (status, body) = self.get(&format!("/sessions/{}/turn", session_id)).await;
            assert_eq!(status, 200);
            if body["in_progress"] == false && body.get("status").is_some() {
                return body;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        panic!("turn on {} did not finish", session_id);
    }
}

pub fn conversation_with(llm: MockLlm, registry: ToolRegistry) -> ConversationLoop {
    ConversationLoop::new(
        Arc::new(llm),
        Arc::new(ToolExecutor::new(Arc::new(registry))),
        Arc::new(ToolCallTracker::new()),
    )
}

pub fn calculator_conversation(llm: MockLlm) -> ConversationLoop {
    conversation_with(llm, ToolRegistry::calculator().unwrap())
}

fn last_tool_result(messages: &[Message]) -> Option<String> {
    messages
        .iter()
        .rev()
        .filter(|m| m.role == Role::ToolResult)
        .flat_map(|m| m.content.iter())
        .find_map(|b| match b {
            ContentBlock::ToolResult { content, .. } => Some(content.clone()),
            _ => None,
        })
}

fn single_tool_use(n: usize, name: &str, input: Value) -> LlmResponse {
    LlmResponse::with_tool_uses(
        "",
        vec![ToolUse {
            id: format!("model-{}", n),
            name: name.to_string(),
            input,
        }],
    )
}

/// Asks for `add` on "plus", `multiply` on "Multiply that result", and reports the last
/// tool result after a tool round.
pub fn calculator_model() -> MockLlm {
    MockLlm::from_fn(|req, n| {
        let last = req
            .messages
            .last()
            .ok_or_else(|| AgentError::Model("empty transcript".to_string()))?;
        if last.role == Role::ToolResult {
            let result = last_tool_result(req.messages).unwrap_or_default();
            return Ok(LlmResponse::text(format!("The result is {}.", result)));
        }
        let text = last.text();
        if text.contains("plus") {
            Ok(single_tool_use(n, "add", json!({"a": 42, "b": 18})))
        } else if text.contains("Multiply that result") {
            let previous: f64 = last_tool_result(req.messages)
                .and_then(|s| s.parse().ok())
                .ok_or_else(|| AgentError::Model("no previous result".to_string()))?;
            Ok(single_tool_use(n, "multiply", json!({"a": previous, "b": 2.5})))
        } else {
            Ok(LlmResponse::text("Ask me some arithmetic."))
        }
    })
}

/// Search backend that blocks until released, to hold a turn open.
#[derive(Default)]
pub struct GatedSearch {
    pub release: Notify,
}

#[async_trait::async_trait]
impl TechTransferSearch for GatedSearch {
    async fn search(
        &self,
        _category: SearchCategory,
        _query: &str,
        _limit: Option<usize>,
    ) -> Result<RawResults, ToolError> {
        self.release.notified().await;
        Ok(RawResults {
            rows: vec![vec![json!("1"), json!("GSC-1"), json!("Heat shield")]],
            total: 1,
        })
    }
}

/// Searches patents once, then answers "found".
pub fn gated_search_conversation(search: Arc<GatedSearch>) -> ConversationLoop {
    let llm = MockLlm::from_fn(|req, n| {
        let last_is_result = req
            .messages
            .last()
            .map(|m| m.role == Role::ToolResult)
            .unwrap_or(false);
        if last_is_result {
            Ok(LlmResponse::text("found"))
        } else {
            Ok(single_tool_use(n, "search_patents", json!({"query": "heat shield"})))
        }
    });
    let executor = ToolExecutor::new(Arc::new(ToolRegistry::nasa().unwrap()))
        .with_search(search)
        .with_timeout(Duration::from_secs(10));
    ConversationLoop::new(
        Arc::new(llm),
        Arc::new(executor),
        Arc::new(ToolCallTracker::new()),
    )
}
