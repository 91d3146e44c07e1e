//! WorkflowTools: the tool calls agents use to reach the message bus.
//!
//! Provides:
//!   1. send_message          - Message another agent of the flow
//!   2. check_inbox           - Read (and mark read) messages addressed to the caller
//!   3. check_outbox          - Pending vs delivered messages sent by the caller
//!   4. peek_message_bus      - Every message (coordinator only)
//!   5. update_workflow_state - Status, task and progress notes
//!   6. ask_user_question     - Multi-choice questions for the human
//!   7. ask_user_work_gate    - Ask the human to approve building
//!   8. update_todos          - Replace the caller's todo list
//!
//! Each call is one `StateStore` transaction. Soft errors come back as
//! `ToolResult::error` and leave the document untouched.

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::bus::{self, BusResult, StatusUpdate};
use crate::error::EngineError;
use crate::models::{Caller, Question, Todo, WorkflowState};
use crate::store::StateStore;

/// Names accepted by `dispatch`.
pub const TOOL_NAMES: [&str; 8] = [
    "send_message",
    "check_inbox",
    "check_outbox",
    "peek_message_bus",
    "update_workflow_state",
    "ask_user_question",
    "ask_user_work_gate",
    "update_todos",
];

/// Result of a tool operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ToolResult {
    pub fn success(data: impl Serialize) -> Self {
        Self {
            success: true,
            data: Some(serde_json::to_value(data).unwrap_or_default()),
            error: None,
        }
    }

    pub fn error(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(msg.into()),
        }
    }
}

impl From<BusResult> for ToolResult {
    fn from(result: BusResult) -> Self {
        match result {
            Ok(data) => ToolResult::success(data),
            Err(msg) => ToolResult::error(msg),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SendMessageArgs {
    to_agent: String,
    body: String,
}

#[derive(Debug, Deserialize)]
struct AskUserQuestionArgs {
    questions: Vec<Question>,
}

#[derive(Debug, Deserialize)]
struct WorkGateArgs {
    summary: String,
}

#[derive(Debug, Deserialize)]
struct TodosArgs {
    todos: Vec<Todo>,
}

/// Tool surface bound to one workspace and the agents of its flow.
#[derive(Clone)]
pub struct WorkflowTools {
    store: Arc<StateStore>,
    workspace: PathBuf,
    known_agents: BTreeSet<String>,
}

impl WorkflowTools {
    pub fn new(
        store: Arc<StateStore>,
        workspace: impl Into<PathBuf>,
        known_agents: impl IntoIterator<Item = String>,
    ) -> Self {
        Self {
            store,
            workspace: workspace.into(),
            known_agents: known_agents.into_iter().collect(),
        }
    }

    pub fn known_agents(&self) -> &BTreeSet<String> {
        &self.known_agents
    }

    async fn apply<F>(&self, op: F) -> Result<ToolResult, EngineError>
    where
        F: FnOnce(&mut WorkflowState) -> BusResult,
    {
        let result = self.store.try_transaction(&self.workspace, op).await?;
        Ok(result.into())
    }

    // ─── Messaging ──────────────────────────────────────────────────────

    pub async fn send_message(
        &self,
        caller: &Caller,
        to_agent: &str,
        body: &str,
    ) -> Result<ToolResult, EngineError> {
        let known = &self.known_agents;
        self.apply(|state| bus::send_message(state, known, caller, to_agent, body))
            .await
    }

    pub async fn check_inbox(&self, caller: &Caller) -> Result<ToolResult, EngineError> {
        self.apply(|state| bus::check_inbox(state, caller)).await
    }

    pub async fn check_outbox(&self, caller: &Caller) -> Result<ToolResult, EngineError> {
        let state = self.store.load(&self.workspace).await?;
        Ok(bus::check_outbox(&state, caller).into())
    }

    pub async fn peek_message_bus(&self, caller: &Caller) -> Result<ToolResult, EngineError> {
        let state = self.store.snapshot(&self.workspace).await?;
        Ok(bus::peek_message_bus(&state, caller).into())
    }

    pub async fn post_human_message(
        &self,
        body: &str,
        to: Option<&str>,
    ) -> Result<ToolResult, EngineError> {
        self.apply(|state| bus::post_human_message(state, body, to))
            .await
    }

    // ─── Status ─────────────────────────────────────────────────────────

    pub async fn update_workflow_state(
        &self,
        caller: &Caller,
        update: &StatusUpdate,
    ) -> Result<ToolResult, EngineError> {
        self.apply(|state| bus::update_workflow_state(state, caller, update))
            .await
    }

    // ─── Human gate ─────────────────────────────────────────────────────

    pub async fn ask_user_question(
        &self,
        caller: &Caller,
        questions: Vec<Question>,
    ) -> Result<ToolResult, EngineError> {
        if !caller.is_coordinator() {
            return Ok(ToolResult::error(
                "Only the coordinator can ask the human. Send your question to the coordinator instead.",
            ));
        }
        self.apply(|state| bus::ask_user_question(state, questions))
            .await
    }

    pub async fn ask_user_work_gate(
        &self,
        caller: &Caller,
        summary: &str,
    ) -> Result<ToolResult, EngineError> {
        if !caller.is_coordinator() {
            return Ok(ToolResult::error("Only the coordinator can open a work gate."));
        }
        self.apply(|state| bus::ask_user_work_gate(state, summary))
            .await
    }

    pub async fn answer_question(&self, answers: &[String]) -> Result<ToolResult, EngineError> {
        self.apply(|state| bus::answer_question(state, answers))
            .await
    }

    // ─── Todos ──────────────────────────────────────────────────────────

    pub async fn update_todos(
        &self,
        caller: &Caller,
        todos: Vec<Todo>,
    ) -> Result<ToolResult, EngineError> {
        self.apply(|state| bus::update_todos(state, caller, todos))
            .await
    }

    pub async fn update_project_todos(&self, todos: Vec<Todo>) -> Result<ToolResult, EngineError> {
        self.apply(|state| bus::update_project_todos(state, todos))
            .await
    }

    // ─── Dispatch ───────────────────────────────────────────────────────

    /// Route a tool call by name with camelCase JSON arguments.
    pub async fn dispatch(
        &self,
        caller: &Caller,
        name: &str,
        args: serde_json::Value,
    ) -> Result<ToolResult, EngineError> {
        tracing::debug!("[WorkflowTools] {} called {}", caller.identity(), name);
        match name {
            "send_message" => match parse_args::<SendMessageArgs>(name, args) {
                Ok(a) => self.send_message(caller, &a.to_agent, &a.body).await,
                Err(e) => Ok(e),
            },
            "check_inbox" => self.check_inbox(caller).await,
            "check_outbox" => self.check_outbox(caller).await,
            "peek_message_bus" => self.peek_message_bus(caller).await,
            "update_workflow_state" => match parse_args::<StatusUpdate>(name, args) {
                Ok(update) => self.update_workflow_state(caller, &update).await,
                Err(e) => Ok(e),
            },
            "ask_user_question" => match parse_args::<AskUserQuestionArgs>(name, args) {
                Ok(a) => self.ask_user_question(caller, a.questions).await,
                Err(e) => Ok(e),
            },
            "ask_user_work_gate" => match parse_args::<WorkGateArgs>(name, args) {
                Ok(a) => self.ask_user_work_gate(caller, &a.summary).await,
                Err(e) => Ok(e),
            },
            "update_todos" => match parse_args::<TodosArgs>(name, args) {
                Ok(a) => self.update_todos(caller, a.todos).await,
                Err(e) => Ok(e),
            },
            other => Ok(ToolResult::error(format!(
                "Unknown tool '{}'. Available: {}",
                other,
                TOOL_NAMES.join(", ")
            ))),
        }
    }
}

fn parse_args<T: DeserializeOwned>(tool: &str, args: serde_json::Value) -> Result<T, ToolResult> {
    let args = if args.is_null() {
        serde_json::Value::Object(Default::default())
    } else {
        args
    };
    serde_json::from_value(args)
        .map_err(|e| ToolResult::error(format!("Invalid arguments for {}: {}", tool, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use serde_json::json;

    fn tools(dir: &std::path::Path) -> WorkflowTools {
        let store = Arc::new(StateStore::new(&EngineConfig::default()));
        WorkflowTools::new(
            store,
            dir,
            ["coordinator", "dev", "qa"].iter().map(|s| s.to_string()),
        )
    }

    #[tokio::test]
    async fn test_dispatch_unknown_tool() {
        let dir = tempfile::tempdir().unwrap();
        let result = tools(dir.path())
            .dispatch(&Caller::new("dev"), "launch_rockets", json!({}))
            .await
            .unwrap();
        assert!(!result.success);
        assert!(result.error.unwrap().contains("Unknown tool"));
    }

    #[tokio::test]
    async fn test_dispatch_bad_args_is_soft_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = tools(dir.path())
            .dispatch(&Caller::new("dev"), "send_message", json!({ "to": "qa" }))
            .await
            .unwrap();
        assert!(!result.success);
        assert!(result.error.unwrap().starts_with("Invalid arguments for send_message"));
    }

    #[tokio::test]
    async fn test_soft_error_leaves_file_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let tools = tools(dir.path());
        let result = tools
            .dispatch(
                &Caller::new("dev"),
                "send_message",
                json!({ "toAgent": "ghost", "body": "hi" }),
            )
            .await
            .unwrap();
        assert!(!result.success);
        assert!(!tools.store.state_path(dir.path()).exists());
    }

    #[tokio::test]
    async fn test_only_coordinator_asks_human() {
        let dir = tempfile::tempdir().unwrap();
        let tools = tools(dir.path());
        let result = tools
            .ask_user_work_gate(&Caller::new("dev"), "ship it")
            .await
            .unwrap();
        assert!(!result.success);

        let result = tools
            .dispatch(
                &Caller::new("coordinator"),
                "ask_user_question",
                json!({ "questions": [{ "question": "Which db?", "choices": ["sqlite"], "multiSelect": false }] }),
            )
            .await
            .unwrap();
        assert!(result.success, "{:?}", result.error);
    }

    #[tokio::test]
    async fn test_null_args_for_argless_tools() {
        let dir = tempfile::tempdir().unwrap();
        let result = tools(dir.path())
            .dispatch(&Caller::new("qa"), "check_inbox", serde_json::Value::Null)
            .await
            .unwrap();
        assert!(result.success);
        assert_eq!(result.data.unwrap()["summary"], bus::NO_MESSAGES);
    }
}
