//! `POST /tool-call-status`: real statuses for known ids, not_found for the rest.

use megabyzus::MockLlm;
use serde_json::json;

use super::common;

/// Scenario: a mix of a real id and unknown ids returns completed and not_found, in
/// request order.
#[tokio::test]
async fn e2e_mixed_ids_return_real_and_not_found() {
    let server = common::spawn_server(common::calculator_conversation(common::calculator_model())).await;
    let (_, body) = server
        .post("/message", json!({"message": "What is 42 plus 18?", "session_id": "s1"}))
        .await;
    let id = body["toolCalls"][0]["id"].as_str().unwrap().to_string();

    let (status, body) = server
        .post(
            "/tool-call-status",
            json!({"session_id": "s1", "tool_call_ids": ["toolu_unknown", id, "other"]}),
        )
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["session_id"], "s1");
    let calls = body["tool_calls"].as_array().unwrap();
    assert_eq!(calls.len(), 3);
    assert_eq!(calls[0], json!({"tool_call_id": "toolu_unknown", "status": "not_found"}));
    assert_eq!(calls[1]["tool_call_id"], id.as_str());
    assert_eq!(calls[1]["status"], "completed");
    assert_eq!(calls[1]["result"], 60);
    assert_eq!(calls[2]["status"], "not_found");
}

/// Scenario: an unknown session answers not_found for every id; repeated queries give the
/// same answer.
#[tokio::test]
async fn e2e_unknown_session_is_all_not_found() {
    let server = common::spawn_server(common::calculator_conversation(MockLlm::with_no_tool_calls("x"))).await;
    for _ in 0..2 {
        let (status, body) = server
            .post(
                "/api/tool-call-status",
                json!({"session_id": "nobody", "tool_call_ids": ["a", "b"]}),
            )
            .await;
        assert_eq!(status, 200);
        let statuses: Vec<&str> = body["tool_calls"]
            .as_array()
            .unwrap()
            .iter()
            .map(|c| c["status"].as_str().unwrap())
            .collect();
        assert_eq!(statuses, vec!["not_found", "not_found"]);
    }
}

/// Scenario: ids are scoped to their session.
#[tokio::test]
async fn e2e_ids_from_another_session_are_not_found() {
    let server = common::spawn_server(common::calculator_conversation(common::calculator_model())).await;
    let (_, body) = server
        .post("/message", json!({"message": "What is 42 plus 18?", "session_id": "a"}))
        .await;
    let id = body["toolCalls"][0]["id"].as_str().unwrap().to_string();
    let (_, body) = server
        .post("/tool-call-status", json!({"session_id": "b", "tool_call_ids": [id]}))
        .await;
    assert_eq!(body["tool_calls"][0]["status"], "not_found");
}
