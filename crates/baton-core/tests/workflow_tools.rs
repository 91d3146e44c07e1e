//! Integration tests for the tool surface.
//!
//! Each test works on a temp workspace through `WorkflowTools`, the same way
//! agent tool calls reach the bus, and checks the persisted document.

use std::path::Path;
use std::sync::Arc;

use baton_core::models::{Caller, WorkflowStatus, HUMAN_PARTNER};
use baton_core::store::StateStore;
use baton_core::{Dag, EngineConfig, WorkflowTools};
use serde_json::json;

fn tools_for(dir: &Path, flow: &str) -> (WorkflowTools, Arc<StateStore>) {
    let dag = Dag::parse_flow(flow, dir).expect("flow should parse");
    let store = Arc::new(StateStore::new(&EngineConfig::default()));
    (WorkflowTools::new(store.clone(), dir, dag.agents()), store)
}

#[tokio::test]
async fn test_message_round_trip_between_agents() {
    let dir = tempfile::tempdir().unwrap();
    let (tools, store) = tools_for(dir.path(), "planner -> dev; dev -> qa");
    let coordinator = Caller::new("coordinator");
    let dev = Caller::with_model("dev", "opus");

    let sent = tools
        .dispatch(
            &coordinator,
            "send_message",
            json!({ "toAgent": "dev", "body": "Implement login\nUse OAuth." }),
        )
        .await
        .unwrap();
    assert!(sent.success);
    assert_eq!(sent.data.as_ref().unwrap()["messageId"], 1);

    let outbox = tools.dispatch(&coordinator, "check_outbox", json!({})).await.unwrap();
    assert_eq!(outbox.data.as_ref().unwrap()["pending"][0]["subject"], "Implement login");

    let inbox = tools.dispatch(&dev, "check_inbox", json!({})).await.unwrap();
    let messages = inbox.data.as_ref().unwrap()["messages"].as_array().unwrap().clone();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0]["body"], "Implement login\nUse OAuth.");

    let outbox = tools.dispatch(&coordinator, "check_outbox", json!({})).await.unwrap();
    let data = outbox.data.unwrap();
    assert!(data["pending"].as_array().unwrap().is_empty());
    assert_eq!(data["delivered"][0]["readBy"], "dev:opus");

    let reply = tools
        .dispatch(&dev, "send_message", json!({ "toAgent": "qa", "body": "Ready for review" }))
        .await
        .unwrap();
    assert!(reply.data.unwrap()["reminder"].is_string());

    let state = store.load(dir.path()).await.unwrap();
    assert_eq!(state.messages.len(), 2);
    assert_eq!(state.messages[1].from_agent, "dev:opus");
}

#[tokio::test]
async fn test_unknown_recipient_is_soft_error() {
    let dir = tempfile::tempdir().unwrap();
    let (tools, store) = tools_for(dir.path(), "");

    let result = tools
        .send_message(&Caller::new("coordinator"), "architect", "hello")
        .await
        .unwrap();
    assert!(!result.success);
    assert!(result.error.unwrap().contains("Unknown agent"));
    assert!(store.load(dir.path()).await.unwrap().messages.is_empty());
}

#[tokio::test]
async fn test_todos_gate_completion() {
    let dir = tempfile::tempdir().unwrap();
    let (tools, store) = tools_for(dir.path(), "");
    let coordinator = Caller::new("coordinator");

    tools
        .dispatch(
            &coordinator,
            "update_todos",
            json!({ "todos": [
                { "id": "1", "content": "plan", "status": "completed" },
                { "id": "2", "content": "verify", "status": "in_progress", "priority": "high" }
            ]}),
        )
        .await
        .unwrap();

    let refused = tools
        .dispatch(&coordinator, "update_workflow_state", json!({ "status": "complete" }))
        .await
        .unwrap();
    assert!(!refused.success);
    assert!(refused.error.unwrap().contains("1 unfinished todo"));
    assert_eq!(store.load(dir.path()).await.unwrap().status, WorkflowStatus::Working);

    tools
        .dispatch(
            &coordinator,
            "update_todos",
            json!({ "todos": [
                { "id": "1", "content": "plan", "status": "completed" },
                { "id": "2", "content": "verify", "status": "completed" }
            ]}),
        )
        .await
        .unwrap();
    let done = tools
        .dispatch(
            &coordinator,
            "update_workflow_state",
            json!({ "status": "complete", "addProgress": "all verified" }),
        )
        .await
        .unwrap();
    assert!(done.success);

    let state = store.load(dir.path()).await.unwrap();
    assert_eq!(state.status, WorkflowStatus::Complete);
    assert_eq!(state.progress.last().unwrap().description, "all verified");
}

#[tokio::test]
async fn test_work_gate_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let (tools, store) = tools_for(dir.path(), "");
    let coordinator = Caller::new("coordinator");

    let gate = tools
        .dispatch(&coordinator, "ask_user_work_gate", json!({ "summary": "Build the API" }))
        .await
        .unwrap();
    assert!(gate.success);

    // An agent cannot talk its way past a pending question.
    let preserved = tools
        .dispatch(
            &coordinator,
            "update_workflow_state",
            json!({ "status": "agent-done", "task": "waiting" }),
        )
        .await
        .unwrap();
    assert_eq!(preserved.data.unwrap()["preserved"], true);
    let state = store.load(dir.path()).await.unwrap();
    assert_eq!(state.status, WorkflowStatus::WaitingForHuman);
    assert_eq!(state.task, "waiting");

    let answered = tools
        .answer_question(&[baton_core::bus::WORK_GATE_APPROVE.to_string()])
        .await
        .unwrap();
    assert!(answered.success);

    let state = store.load(dir.path()).await.unwrap();
    assert_eq!(state.status, WorkflowStatus::Working);
    assert_eq!(state.interaction_mode, baton_core::models::InteractionMode::Building);
    assert_eq!(state.messages.last().unwrap().from_agent, HUMAN_PARTNER);
}

#[tokio::test]
async fn test_concurrent_sends_get_distinct_ids() {
    let dir = tempfile::tempdir().unwrap();
    let (tools, store) = tools_for(dir.path(), "");

    let mut handles = Vec::new();
    for i in 0..16 {
        let tools = tools.clone();
        handles.push(tokio::spawn(async move {
            tools
                .send_message(&Caller::new("coordinator"), "general-purpose", &format!("task {}", i))
                .await
                .unwrap()
        }));
    }
    for handle in handles {
        assert!(handle.await.unwrap().success);
    }

    let state = store.load(dir.path()).await.unwrap();
    let mut ids: Vec<u64> = state.messages.iter().map(|m| m.id).collect();
    ids.sort_unstable();
    assert_eq!(ids, (1..=16).collect::<Vec<u64>>());
}
