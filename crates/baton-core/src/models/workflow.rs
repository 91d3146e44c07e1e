//! The workflow state document: one JSON file per workspace.
//!
//! Every field tolerates being absent, and unknown fields are carried in
//! `extra` so a document written by a newer version survives a round trip
//! through an older one.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::agent::{bare_name, COORDINATOR};
use super::message::Message;
use super::question::MultiChoiceQuestion;
use super::todo::Todo;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WorkflowStatus {
    #[default]
    Working,
    AgentDone,
    Complete,
    WaitingForHuman,
}

impl WorkflowStatus {
    pub const ALL: [WorkflowStatus; 4] = [
        Self::Working,
        Self::AgentDone,
        Self::Complete,
        Self::WaitingForHuman,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Working => "working",
            Self::AgentDone => "agent-done",
            Self::Complete => "complete",
            Self::WaitingForHuman => "waiting-for-human",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|status| status.as_str() == s.trim())
    }

    /// `agent-done` and `complete` end a phase and are gated on todos.
    pub fn is_yield(&self) -> bool {
        matches!(self, Self::AgentDone | Self::Complete)
    }
}

impl std::fmt::Display for WorkflowStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InteractionMode {
    #[default]
    Brainstorming,
    Building,
    SelfDrive,
    Continuous,
}

impl InteractionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Brainstorming => "brainstorming",
            Self::Building => "building",
            Self::SelfDrive => "self-drive",
            Self::Continuous => "continuous",
        }
    }

    /// Modes in which nobody answers questions.
    pub fn is_unattended(&self) -> bool {
        matches!(self, Self::SelfDrive | Self::Continuous)
    }
}

/// One line of the append-only progress log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressEntry {
    #[serde(default)]
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub agent: String,
    #[serde(default)]
    pub description: String,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowState {
    #[serde(default)]
    pub status: WorkflowStatus,
    #[serde(default)]
    pub current_agent: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_model: Option<String>,
    #[serde(default)]
    pub task: String,
    #[serde(default)]
    pub progress: Vec<ProgressEntry>,
    #[serde(default)]
    pub messages: Vec<Message>,
    #[serde(default)]
    pub visit_counts: BTreeMap<String, u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub multi_choice_question: Option<MultiChoiceQuestion>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub human_message: String,
    /// Per-agent todo lists, keyed by bare agent name
    #[serde(default)]
    pub todos: BTreeMap<String, Vec<Todo>>,
    #[serde(default)]
    pub project_todos: Vec<Todo>,
    #[serde(default)]
    pub interaction_mode: InteractionMode,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub goal_checksum: String,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl WorkflowState {
    /// Empty state owned by `agent`.
    pub fn for_agent(agent: &str) -> Self {
        Self {
            current_agent: agent.to_string(),
            ..Default::default()
        }
    }

    /// Current agent's bare name; an empty document belongs to the coordinator.
    pub fn active_agent(&self) -> &str {
        if self.current_agent.trim().is_empty() {
            COORDINATOR
        } else {
            bare_name(&self.current_agent)
        }
    }

    pub fn add_progress(&mut self, agent: &str, description: impl Into<String>) {
        self.progress.push(ProgressEntry {
            timestamp: Utc::now(),
            agent: agent.to_string(),
            description: description.into(),
            extra: serde_json::Map::new(),
        });
    }

    /// Todos of `agent` that are not completed.
    pub fn pending_todos(&self, agent: &str) -> usize {
        self.todos
            .get(bare_name(agent))
            .map(|todos| todos.iter().filter(|t| !t.is_completed()).count())
            .unwrap_or(0)
    }

    pub fn next_message_id(&self) -> u64 {
        self.messages.iter().map(|m| m.id).max().unwrap_or(0) + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_parse() {
        assert_eq!(WorkflowStatus::from_str("agent-done"), Some(WorkflowStatus::AgentDone));
        assert_eq!(
            WorkflowStatus::from_str(" waiting-for-human "),
            Some(WorkflowStatus::WaitingForHuman)
        );
        assert_eq!(WorkflowStatus::from_str("done"), None);
        assert_eq!(WorkflowStatus::from_str("AGENT-DONE"), None);
    }

    #[test]
    fn test_empty_document_defaults() {
        let state: WorkflowState = serde_json::from_str("{}").unwrap();
        assert_eq!(state.status, WorkflowStatus::Working);
        assert_eq!(state.active_agent(), COORDINATOR);
        assert!(state.messages.is_empty());
        assert_eq!(state.next_message_id(), 1);
    }

    #[test]
    fn test_round_trip_preserves_unknown_fields() {
        let raw = serde_json::json!({
            "status": "agent-done",
            "currentAgent": "qa:opus",
            "task": "reviewing",
            "interactionMode": "self-drive",
            "visitCounts": { "qa": 2 },
            "messages": [{
                "id": 7,
                "fromAgent": "coordinator",
                "toAgent": "qa",
                "body": "hello",
                "read": false,
                "createdAt": "2026-01-01T00:00:00Z",
                "threadId": "T9"
            }, {
                "id": 8,
                "fromAgent": "qa",
                "toAgent": "coordinator",
                "body": "legacy message without a timestamp"
            }],
            "progress": [{ "agent": "qa", "description": "old entry", "source": "hook" }],
            "projectTodos": [{ "id": "p1", "content": "ship", "owner": "ops" }],
            "futureField": { "nested": [1, 2, 3] },
            "slackThread": "C123"
        });

        let state: WorkflowState = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(state.status, WorkflowStatus::AgentDone);
        assert_eq!(state.active_agent(), "qa");
        assert_eq!(state.interaction_mode, InteractionMode::SelfDrive);
        assert_eq!(state.next_message_id(), 9);
        assert_eq!(state.messages[1].body, "legacy message without a timestamp");
        assert!(!state.messages[1].read);

        let back = serde_json::to_value(&state).unwrap();
        assert_eq!(back["messages"][0]["threadId"], "T9");
        assert_eq!(back["progress"][0]["source"], "hook");
        assert_eq!(back["projectTodos"][0]["owner"], "ops");
        assert_eq!(back["futureField"], raw["futureField"]);
        assert_eq!(back["slackThread"], "C123");
        assert_eq!(back["status"], "agent-done");

        let again: WorkflowState = serde_json::from_value(back).unwrap();
        assert_eq!(again, state);
    }

    #[test]
    fn test_pending_todos_uses_bare_name() {
        let mut state = WorkflowState::default();
        state.todos.insert(
            "dev".to_string(),
            vec![
                Todo {
                    id: "1".into(),
                    content: "write code".into(),
                    status: crate::models::TodoStatus::Completed,
                    ..Default::default()
                },
                Todo {
                    id: "2".into(),
                    content: "write tests".into(),
                    status: crate::models::TodoStatus::InProgress,
                    ..Default::default()
                },
            ],
        );
        assert_eq!(state.pending_todos("dev:opus"), 1);
        assert_eq!(state.pending_todos("qa"), 0);
    }
}
