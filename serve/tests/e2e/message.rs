//! `POST /message`: foreground and background turns, validation, model failures.

use std::sync::Arc;
use std::time::Duration;

use megabyzus::{LlmResponse, MockLlm, Role, ToolCallStatus, ToolRegistry, ToolUse};
use serde_json::json;

use super::common::{self, GatedSearch};

/// Scenario: "What is 42 plus 18?" runs add and answers 60; the follow-up on the same
/// session multiplies that result by 2.5 and answers 150.
#[tokio::test]
async fn e2e_calculator_turn_and_follow_up() {
    let server = common::spawn_server(common::calculator_conversation(common::calculator_model())).await;

    let (status, body) = server
        .post("/message", json!({"message": "What is 42 plus 18?"}))
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["status"], "complete");
    assert_eq!(body["toolCalls"][0]["toolName"], "add");
    assert_eq!(body["toolCalls"][0]["inputs"], json!({"a": 42, "b": 18}));
    assert_eq!(body["toolCalls"][0]["status"], "completed");
    assert_eq!(body["toolCalls"][0]["output"], 60);
    assert!(body["response"].as_str().unwrap().contains("60"));
    let session_id = body["session_id"].as_str().unwrap().to_string();

    let (status, body) = server
        .post(
            "/message",
            json!({"message": "Multiply that result by 2.5", "session_id": session_id}),
        )
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["session_id"], session_id.as_str());
    assert_eq!(body["toolCalls"][0]["toolName"], "multiply");
    assert_eq!(body["toolCalls"][0]["inputs"]["a"].as_f64(), Some(60.0));
    assert_eq!(body["toolCalls"][0]["output"], 150);
    assert!(body["response"].as_str().unwrap().contains("150"));
}

/// Scenario: the same routes answer under the `/api` prefix.
#[tokio::test]
async fn e2e_api_prefix_routes() {
    let server = common::spawn_server(common::calculator_conversation(MockLlm::with_no_tool_calls("hello"))).await;
    let (status, body) = server.post("/api/message", json!({"message": "hi"})).await;
    assert_eq!(status, 200);
    assert_eq!(body["response"], "hello");
    assert_eq!(body["toolCalls"], json!([]));
}

/// Scenario: blank messages and malformed JSON are rejected with 400.
#[tokio::test]
async fn e2e_invalid_requests_are_bad_request() {
    let server = common::spawn_server(common::calculator_conversation(MockLlm::with_no_tool_calls("x"))).await;

    let (status, body) = server.post("/message", json!({"message": "   "})).await;
    assert_eq!(status, 400);
    assert!(body["error"].as_str().unwrap().contains("empty"));

    let (status, body) = server.post_raw("/message", "{not json").await;
    assert_eq!(status, 400);
    assert_eq!(body["kind"], "bad_request");

    let (status, _) = server.post("/message", json!({"session_id": "s"})).await;
    assert_eq!(status, 400);
}

/// Scenario: a failing model yields HTTP 200 with status "error" and the error text.
#[tokio::test]
async fn e2e_model_failure_reports_error_status() {
    let server = common::spawn_server(common::calculator_conversation(MockLlm::failing("upstream unavailable"))).await;
    let (status, body) = server.post("/message", json!({"message": "hello"})).await;
    assert_eq!(status, 200);
    assert_eq!(body["status"], "error");
    assert!(body["error"].as_str().unwrap().contains("upstream unavailable"));
    assert!(body["session_id"].as_str().is_some());
}

/// Scenario: a model that always asks for a tool exhausts the iteration cap; the response
/// reports loop_exhausted with one tool call per iteration.
#[tokio::test]
async fn e2e_loop_exhausted_is_reported() {
    let conversation = common::calculator_conversation(MockLlm::always_tool_use(
        "add",
        json!({"a": 1, "b": 1}),
    ))
    .with_max_iterations(2);
    let server = common::spawn_server(conversation).await;
    let (status, body) = server.post("/message", json!({"message": "loop"})).await;
    assert_eq!(status, 200);
    assert_eq!(body["status"], "loop_exhausted");
    assert_eq!(body["toolCalls"].as_array().unwrap().len(), 2);
    assert!(!body["response"].as_str().unwrap().is_empty());
}

/// Scenario: a background request returns as soon as the tool call is pending; the
/// status endpoint shows pending then completed, and the turn endpoint the final reply.
#[tokio::test]
async fn e2e_background_turn_reports_progress() {
    let search = Arc::new(GatedSearch::default());
    let server = common::spawn_server(common::gated_search_conversation(search.clone())).await;

    let (status, body) = server
        .post(
            "/message",
            json!({"message": "heat shield patents", "session_id": "bg", "background": true}),
        )
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["status"], "in_progress");
    assert_eq!(body["toolCalls"][0]["toolName"], "search_patents");
    assert_eq!(body["toolCalls"][0]["status"], "pending");
    let id = body["toolCalls"][0]["id"].as_str().unwrap().to_string();

    let (_, q) = server
        .post("/tool-call-status", json!({"session_id": "bg", "tool_call_ids": [id]}))
        .await;
    assert_eq!(q["tool_calls"][0]["status"], "pending");

    search.release.notify_one();
    let turn = server.wait_for_turn("bg").await;
    assert_eq!(turn["response"], "found");
    assert_eq!(turn["status"], "complete");

    let (_, q) = server
        .post("/tool-call-status", json!({"session_id": "bg", "tool_call_ids": [id]}))
        .await;
    assert_eq!(q["tool_calls"][0]["status"], "completed");
    assert_eq!(q["tool_calls"][0]["result"]["results"][0]["title"], "Heat shield");
}

/// Scenario: while a turn runs on a session, a second message to that session gets 409;
/// other sessions are unaffected.
#[tokio::test]
async fn e2e_concurrent_turn_on_same_session_conflicts() {
    let search = Arc::new(GatedSearch::default());
    let server = common::spawn_server(common::gated_search_conversation(search.clone())).await;

    let (status, _) = server
        .post(
            "/message",
            json!({"message": "patents", "session_id": "busy", "background": true}),
        )
        .await;
    assert_eq!(status, 200);

    let (status, body) = server
        .post("/message", json!({"message": "again", "session_id": "busy"}))
        .await;
    assert_eq!(status, 409);
    assert_eq!(body["kind"], "session_busy");

    search.release.notify_one();
    let turn = server.wait_for_turn("busy").await;
    assert_eq!(turn["status"], "complete");
}

/// Scenario: a tool rejected by the registry is reported as an error tool call, and the
/// turn still completes.
#[tokio::test]
async fn e2e_invalid_tool_input_is_an_error_call() {
    let llm = MockLlm::scripted(vec![
        LlmResponse::with_tool_uses(
            "",
            vec![ToolUse {
                id: "m1".into(),
                name: "divide".into(),
                input: json!({"dividend": 4, "divisor": "two"}),
            }],
        ),
        LlmResponse::text("I could not divide that."),
    ]);
    let server = common::spawn_server(common::conversation_with(llm, ToolRegistry::calculator().unwrap())).await;
    let (status, body) = server.post("/message", json!({"message": "4 / two"})).await;
    assert_eq!(status, 200);
    assert_eq!(body["status"], "complete");
    assert_eq!(body["toolCalls"][0]["status"], "error");
    assert!(body["toolCalls"][0]["error"].as_str().unwrap().contains("divide"));
}

/// Scenario: the client gives up on a foreground request while a tool runs. The turn keeps
/// going: its tool call completes and the transcript ends with the tool result and the
/// final reply.
#[tokio::test]
async fn e2e_client_disconnect_does_not_cancel_turn() {
    let search = Arc::new(GatedSearch::default());
    let server = common::spawn_server(common::gated_search_conversation(search.clone())).await;

    let impatient = reqwest::Client::builder()
        .timeout(Duration::from_millis(300))
        .build()
        .unwrap();
    let sent = impatient
        .post(format!("{}/message", server.base))
        .json(&json!({"message": "heat shield patents", "session_id": "fg"}))
        .send()
        .await;
    assert!(sent.is_err());

    search.release.notify_one();
    let turn = server.wait_for_turn("fg").await;
    assert_eq!(turn["status"], "complete");
    assert_eq!(turn["response"], "found");

    let records = server.state.tracker().list("fg");
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].status, ToolCallStatus::Completed);

    let roles: Vec<Role> = server
        .state
        .sessions
        .get("fg")
        .unwrap()
        .history()
        .into_iter()
        .map(|m| m.role)
        .collect();
    assert_eq!(
        roles,
        vec![Role::User, Role::Assistant, Role::ToolResult, Role::Assistant]
    );
}
