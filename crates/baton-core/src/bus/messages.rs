use std::collections::BTreeSet;

use serde_json::json;

use super::BusResult;
use crate::models::{bare_name, Caller, Message, WorkflowState, COORDINATOR, HUMAN_PARTNER};

/// Returned by `check_inbox` when nothing unread is addressed to the caller.
pub const NO_MESSAGES: &str = "No new messages.";

const YIELD_REMINDER: &str = "Message queued. When you have finished your part, set status to \
     'agent-done' with update_workflow_state so the recipient can run. Only the coordinator can \
     talk to the human.";

pub fn send_message(
    state: &mut WorkflowState,
    known_agents: &BTreeSet<String>,
    caller: &Caller,
    to_agent: &str,
    body: &str,
) -> BusResult {
    let to_agent = to_agent.trim();
    let recipient = bare_name(to_agent);
    if !known_agents.contains(recipient) && recipient != HUMAN_PARTNER {
        let known: Vec<&str> = known_agents.iter().map(String::as_str).collect();
        return Err(format!(
            "Unknown agent '{}'. Known agents: {}",
            to_agent,
            known.join(", ")
        ));
    }
    if recipient == HUMAN_PARTNER && !caller.is_coordinator() {
        return Err("Only the coordinator can message the Human Partner".to_string());
    }
    if body.trim().is_empty() {
        return Err("Message body must not be empty".to_string());
    }

    let id = state.next_message_id();
    let from = caller.identity();
    state.messages.push(Message::new(
        id,
        from.clone(),
        to_agent.to_string(),
        body.to_string(),
    ));
    tracing::info!("[MessageBus] #{} {} -> {}", id, from, to_agent);

    let mut data = json!({
        "messageId": id,
        "from": from,
        "to": to_agent,
    });
    if !caller.is_coordinator() {
        data["reminder"] = json!(YIELD_REMINDER);
    }
    Ok(data)
}

fn addressed_to(message: &Message, caller: &Caller) -> bool {
    let to = message.to_agent.as_str();
    to == caller.bare() || caller.model_identity().as_deref() == Some(to)
}

/// Deliver every unread message addressed to the caller and mark those read.
pub fn check_inbox(state: &mut WorkflowState, caller: &Caller) -> BusResult {
    let reader = caller.identity();
    let mut delivered = Vec::new();
    for message in state.messages.iter_mut() {
        if message.read || !addressed_to(message, caller) {
            continue;
        }
        message.mark_read(&reader);
        delivered.push(json!({
            "id": message.id,
            "from": message.from_agent,
            "body": message.body,
            "createdAt": message.created_at,
        }));
    }

    if delivered.is_empty() {
        return Ok(json!({ "messages": [], "summary": NO_MESSAGES }));
    }
    tracing::debug!("[MessageBus] {} read {} message(s)", reader, delivered.len());
    Ok(json!({
        "messages": delivered,
        "summary": format!("{} new message(s).", delivered.len()),
    }))
}

/// The caller's sent messages, split into pending and delivered.
pub fn check_outbox(state: &WorkflowState, caller: &Caller) -> BusResult {
    let identity = caller.identity();
    let mut pending = Vec::new();
    let mut delivered = Vec::new();
    for message in &state.messages {
        let from = message.from_agent.as_str();
        if from != identity && from != caller.bare() {
            continue;
        }
        if message.read {
            delivered.push(json!({
                "id": message.id,
                "to": message.to_agent,
                "subject": message.subject(),
                "readAt": message.read_at,
                "readBy": message.read_by,
            }));
        } else {
            pending.push(json!({
                "id": message.id,
                "to": message.to_agent,
                "subject": message.subject(),
            }));
        }
    }
    Ok(json!({ "pending": pending, "delivered": delivered }))
}

/// Every message regardless of read state. Coordinator only.
pub fn peek_message_bus(state: &WorkflowState, caller: &Caller) -> BusResult {
    if !caller.is_coordinator() {
        return Err(format!(
            "peek_message_bus is reserved for the {}",
            COORDINATOR
        ));
    }
    Ok(json!({
        "total": state.messages.len(),
        "unread": state.messages.iter().filter(|m| !m.read).count(),
        "messages": state.messages,
    }))
}

/// A message from the human, injected by an operator surface. Defaults to
/// the coordinator when `to` is empty.
pub fn post_human_message(state: &mut WorkflowState, body: &str, to: Option<&str>) -> BusResult {
    if body.trim().is_empty() {
        return Err("Message body must not be empty".to_string());
    }
    let to = to
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .unwrap_or(COORDINATOR)
        .to_string();
    let id = state.next_message_id();
    state.messages.push(Message::new(
        id,
        HUMAN_PARTNER.to_string(),
        to.clone(),
        body.to_string(),
    ));
    tracing::info!("[MessageBus] #{} {} -> {}", id, HUMAN_PARTNER, to);
    Ok(json!({ "messageId": id, "to": to }))
}
