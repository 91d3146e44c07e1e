use serde_json::json;

use super::BusResult;
use crate::models::{Caller, Todo, TodoStatus, WorkflowState};

fn validate(todos: &[Todo]) -> Result<(), String> {
    let mut seen = std::collections::HashSet::new();
    for todo in todos {
        if todo.id.trim().is_empty() || todo.content.trim().is_empty() {
            return Err("Every todo needs an id and content".to_string());
        }
        if !seen.insert(todo.id.as_str()) {
            return Err(format!("Duplicate todo id '{}'", todo.id));
        }
    }
    Ok(())
}

fn counts(todos: &[Todo]) -> serde_json::Value {
    let done = todos.iter().filter(|t| t.status == TodoStatus::Completed).count();
    json!({ "total": todos.len(), "completed": done, "pending": todos.len() - done })
}

/// Replace the caller's todo list.
pub fn update_todos(state: &mut WorkflowState, caller: &Caller, todos: Vec<Todo>) -> BusResult {
    validate(&todos)?;
    let data = counts(&todos);
    state.todos.insert(caller.bare().to_string(), todos);
    Ok(data)
}

pub fn update_project_todos(state: &mut WorkflowState, todos: Vec<Todo>) -> BusResult {
    validate(&todos)?;
    let data = counts(&todos);
    state.project_todos = todos;
    Ok(data)
}
