//! Engine configuration.

use std::time::Duration;

/// Name of the per-workspace directory holding Baton's files.
pub const DEFAULT_STATE_DIR: &str = ".baton";

/// Runtime knobs for the engine. Goal-document settings (flow, models,
/// continuous-mode schedule) live in `goal::GoalConfig` instead.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Directory (relative to the workspace) holding `workflow-state.json`
    pub state_dir: String,
    /// Granularity of every continuous-mode wait
    pub poll_interval: Duration,
    /// Attempts for the continuous-mode prompt before moving on
    pub continuous_attempts: u32,
    /// Upper bound on agent turns in a single workflow run
    pub max_handoffs: usize,
    /// Endpoint handed to agent processes so they can reach the tool surface
    pub rpc_url: String,
    /// Agent Runner executable
    pub runner_command: String,
    /// Arguments passed before the prompt is written on stdin
    pub runner_args: Vec<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            state_dir: DEFAULT_STATE_DIR.to_string(),
            poll_interval: Duration::from_secs(2),
            continuous_attempts: 3,
            max_handoffs: 200,
            rpc_url: "http://127.0.0.1:3210/rpc".to_string(),
            runner_command: "claude".to_string(),
            runner_args: vec!["-p".to_string()],
        }
    }
}
