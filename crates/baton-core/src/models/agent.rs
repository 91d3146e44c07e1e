//! Agent identifiers.
//!
//! An identifier is a bare agent name, optionally followed by `:variant`
//! for multi-model addressing (`"backend-go-developer:opus"`). The part
//! before the colon is the canonical agent.

use serde::{Deserialize, Serialize};

/// The hub agent: sole DAG entry point, sole agent allowed to talk to the human.
pub const COORDINATOR: &str = "coordinator";

/// Always wired as a successor of the coordinator.
pub const CRITIC_COUNCIL: &str = "project-critic-council";

/// Worker used by the default (`""` / `"auto"`) flow.
pub const GENERAL_PURPOSE: &str = "general-purpose";

/// Sender name for messages originating from the human.
pub const HUMAN_PARTNER: &str = "Human Partner";

/// Attribution used by the continuous-mode loop.
pub const CONTINUOUS_MODE: &str = "continuous-mode";

/// Strip a `:variant` suffix.
pub fn bare_name(id: &str) -> &str {
    match id.split_once(':') {
        Some((bare, _)) => bare,
        None => id,
    }
}

/// The agent on whose behalf a tool call is made.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Caller {
    pub agent: String,
    /// Active model variant, either `"opus"` or the full `"agent:opus"`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

impl Caller {
    pub fn new(agent: impl Into<String>) -> Self {
        Self {
            agent: agent.into(),
            model: None,
        }
    }

    pub fn with_model(agent: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            agent: agent.into(),
            model: Some(model.into()),
        }
    }

    pub fn bare(&self) -> &str {
        bare_name(&self.agent)
    }

    /// Full variant identity, when a model variant is active.
    pub fn model_identity(&self) -> Option<String> {
        let model = self.model.as_deref().map(str::trim).filter(|m| !m.is_empty())?;
        if model.contains(':') {
            Some(model.to_string())
        } else {
            Some(format!("{}:{}", self.bare(), model))
        }
    }

    /// Identity used for `fromAgent` / `readBy`: the variant identity when
    /// set, else the bare name.
    pub fn identity(&self) -> String {
        self.model_identity()
            .unwrap_or_else(|| self.bare().to_string())
    }

    pub fn is_coordinator(&self) -> bool {
        self.bare() == COORDINATOR
    }
}
