use serde::Deserialize;
use serde_json::json;

use super::BusResult;
use crate::models::{Caller, WorkflowState, WorkflowStatus};

/// Arguments of `update_workflow_state`. Every field is optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusUpdate {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub task: Option<String>,
    #[serde(default)]
    pub add_progress: Option<String>,
}

/// Apply a status/task/progress update from an agent.
///
/// Rules, in order:
/// - an unrecognized status is rejected outright;
/// - while `waiting-for-human` the requested status is dropped, but task and
///   progress still apply;
/// - `agent-done`/`complete` is refused while the current agent has
///   unfinished todos;
/// - a successful yield clears `task`.
pub fn update_workflow_state(
    state: &mut WorkflowState,
    caller: &Caller,
    update: &StatusUpdate,
) -> BusResult {
    let requested = match update.status.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(raw) => match WorkflowStatus::from_str(raw) {
            Some(status) => Some(status),
            None => {
                let valid: Vec<&str> = WorkflowStatus::ALL.iter().map(|s| s.as_str()).collect();
                return Err(format!(
                    "Invalid status '{}'. Valid values: {}",
                    raw,
                    valid.join(", ")
                ));
            }
        },
    };

    let preserved = state.status == WorkflowStatus::WaitingForHuman && requested.is_some();

    if let Some(status) = requested.filter(|_| !preserved) {
        if status.is_yield() {
            let agent = state.active_agent().to_string();
            let pending = state.pending_todos(&agent);
            if pending > 0 {
                return Err(format!(
                    "Cannot set status '{}': {} has {} unfinished todo(s). Complete them or \
                     update the todo list first.",
                    status, agent, pending
                ));
            }
        }
    }

    if let Some(task) = &update.task {
        state.task = task.clone();
    }
    if let Some(note) = update.add_progress.as_deref().filter(|n| !n.trim().is_empty()) {
        state.add_progress(&caller.identity(), note);
    }

    if preserved {
        tracing::info!(
            "[MessageBus] {} requested '{}' while waiting for human; status preserved",
            caller.identity(),
            requested.map(|s| s.as_str()).unwrap_or_default()
        );
        return Ok(json!({
            "status": state.status,
            "preserved": true,
            "message": "Status preserved: a question to the human is pending. Task and progress were updated.",
        }));
    }

    if let Some(status) = requested {
        state.status = status;
        if status.is_yield() {
            state.task.clear();
        }
        tracing::info!("[MessageBus] {} set status {}", caller.identity(), status);
    }

    Ok(json!({
        "status": state.status,
        "task": state.task,
        "preserved": false,
    }))
}
