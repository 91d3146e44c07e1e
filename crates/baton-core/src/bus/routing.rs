use crate::models::{WorkflowState, WorkflowStatus, COORDINATOR, HUMAN_PARTNER};

/// Who runs next, as a bare agent name plus an optional model variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteTarget {
    pub agent: String,
    pub model: Option<String>,
}

impl RouteTarget {
    pub fn coordinator() -> Self {
        Self {
            agent: COORDINATOR.to_string(),
            model: None,
        }
    }

    fn from_recipient(recipient: &str) -> Self {
        match recipient.split_once(':') {
            Some((agent, model)) if !model.trim().is_empty() => Self {
                agent: agent.to_string(),
                model: Some(model.to_string()),
            },
            Some((agent, _)) => Self {
                agent: agent.to_string(),
                model: None,
            },
            None => Self {
                agent: recipient.to_string(),
                model: None,
            },
        }
    }
}

/// After `agent-done`: the recipient of the oldest unread message, else the
/// coordinator. Messages to the human never route.
pub fn route_after_agent_done(state: &WorkflowState) -> RouteTarget {
    state
        .messages
        .iter()
        .filter(|m| !m.read && m.to_agent != HUMAN_PARTNER)
        .min_by_key(|m| m.id)
        .map(|m| RouteTarget::from_recipient(&m.to_agent))
        .unwrap_or_else(RouteTarget::coordinator)
}

/// Give control to `target` and count the visit.
pub fn handoff(state: &mut WorkflowState, target: &RouteTarget) {
    let from = state.active_agent().to_string();
    state.current_agent = target.agent.clone();
    state.current_model = target.model.clone();
    state.status = WorkflowStatus::Working;
    *state.visit_counts.entry(target.agent.clone()).or_insert(0) += 1;

    let to = match &target.model {
        Some(model) => format!("{}:{}", target.agent, model),
        None => target.agent.clone(),
    };
    state.add_progress(&from, format!("Handoff {} -> {}", from, to));
    tracing::info!("[MessageBus] Handoff {} -> {}", from, to);
}
