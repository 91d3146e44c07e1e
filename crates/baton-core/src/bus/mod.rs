//! MessageBus: the per-workspace mailbox and the workflow status machine.
//!
//! Every operation here is a pure function over a `WorkflowState` that the
//! caller has already loaded inside a `StateStore` transaction. A returned
//! `Err(String)` is a soft error for the calling agent, and the transaction
//! discards whatever the function touched.

mod messages;
mod questions;
mod routing;
mod status;
mod todos;

pub use messages::{
    check_inbox, check_outbox, peek_message_bus, post_human_message, send_message, NO_MESSAGES,
};
pub use questions::{
    answer_question, ask_user_question, ask_user_work_gate, WORK_GATE_APPROVE,
    WORK_GATE_KEEP_BRAINSTORMING,
};
pub use routing::{handoff, route_after_agent_done, RouteTarget};
pub use status::{update_workflow_state, StatusUpdate};
pub use todos::{update_project_todos, update_todos};

/// Outcome of a bus operation: JSON payload for the agent, or a soft error.
pub type BusResult = Result<serde_json::Value, String>;
