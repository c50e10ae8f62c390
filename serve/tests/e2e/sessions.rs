//! Session routes: history, turn, delete, and health.

use megabyzus::MockLlm;
use serde_json::json;

use super::common;

/// Scenario: history lists every message of the session with ordinals and roles.
#[tokio::test]
async fn e2e_history_lists_transcript_in_order() {
    let server = common::spawn_server(common::calculator_conversation(common::calculator_model())).await;
    server
        .post("/message", json!({"message": "What is 42 plus 18?", "session_id": "h1"}))
        .await;

    let (status, body) = server.get("/sessions/h1/history").await;
    assert_eq!(status, 200);
    assert_eq!(body["session_id"], "h1");
    assert!(body["created_at"].as_str().is_some());
    let history = body["history"].as_array().unwrap();
    let roles: Vec<&str> = history.iter().map(|m| m["role"].as_str().unwrap()).collect();
    assert_eq!(roles, vec!["user", "assistant", "tool_result", "assistant"]);
    let ordinals: Vec<u64> = history.iter().map(|m| m["ordinal"].as_u64().unwrap()).collect();
    assert_eq!(ordinals, vec![0, 1, 2, 3]);
    assert_eq!(history[1]["content"][0]["type"], "tool_use");
    assert_eq!(history[2]["content"][0]["type"], "tool_result");
    assert_eq!(history[2]["content"][0]["content"], "60");
}

/// Scenario: history and turn of an unknown session are 404.
#[tokio::test]
async fn e2e_unknown_session_is_not_found() {
    let server = common::spawn_server(common::calculator_conversation(MockLlm::with_no_tool_calls("x"))).await;
    let (status, body) = server.get("/sessions/ghost/history").await;
    assert_eq!(status, 404);
    assert_eq!(body["kind"], "session_not_found");
    let (status, _) = server.get("/api/sessions/ghost/turn").await;
    assert_eq!(status, 404);
}

/// Scenario: delete is idempotent; after it the session id starts from an empty history
/// and its tool-call ids are not_found.
#[tokio::test]
async fn e2e_delete_then_reuse_starts_empty() {
    let server = common::spawn_server(common::calculator_conversation(common::calculator_model())).await;
    let (_, body) = server
        .post("/message", json!({"message": "What is 42 plus 18?", "session_id": "d1"}))
        .await;
    let id = body["toolCalls"][0]["id"].as_str().unwrap().to_string();

    let (status, body) = server.delete("/sessions/d1").await;
    assert_eq!(status, 200);
    assert_eq!(body["status"], "success");
    assert_eq!(body["deleted"], true);

    let (status, body) = server.delete("/api/sessions/d1").await;
    assert_eq!(status, 200);
    assert_eq!(body["status"], "success");
    assert_eq!(body["deleted"], false);

    let (status, _) = server.get("/sessions/d1/history").await;
    assert_eq!(status, 404);
    let (_, body) = server
        .post("/tool-call-status", json!({"session_id": "d1", "tool_call_ids": [id]}))
        .await;
    assert_eq!(body["tool_calls"][0]["status"], "not_found");

    server
        .post("/message", json!({"message": "hello again", "session_id": "d1"}))
        .await;
    let (_, body) = server.get("/sessions/d1/history").await;
    let history = body["history"].as_array().unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0]["content"][0]["text"], "hello again");
    assert!(server.state.sessions.contains("d1"));
}

/// Scenario: the turn endpoint reports the last reply once the turn is done.
#[tokio::test]
async fn e2e_turn_reports_last_reply() {
    let server = common::spawn_server(common::calculator_conversation(MockLlm::with_no_tool_calls("done"))).await;
    server
        .post("/message", json!({"message": "hi", "session_id": "t1"}))
        .await;
    let (status, body) = server.get("/sessions/t1/turn").await;
    assert_eq!(status, 200);
    assert_eq!(body["in_progress"], false);
    assert_eq!(body["response"], "done");
    assert_eq!(body["status"], "complete");
}

/// Scenario: health answers at the root and under /api.
#[tokio::test]
async fn e2e_health() {
    let server = common::spawn_server(common::calculator_conversation(MockLlm::with_no_tool_calls("x"))).await;
    for path in ["/health", "/api/health"] {
        let (status, body) = server.get(path).await;
        assert_eq!(status, 200);
        assert_eq!(body, json!({"status": "healthy"}));
    }
}
