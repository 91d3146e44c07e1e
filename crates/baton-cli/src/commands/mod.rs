//! CLI command implementations.
//!
//! Each submodule corresponds to a top-level CLI command and reuses the
//! baton-core engine through a shared `Context`.

pub mod continuous;
pub mod dag;
pub mod run;
pub mod status;
pub mod steer;
pub mod tool;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use baton_core::orchestration::Conductor;
use baton_core::tools::WorkflowTools;
use baton_core::{Engine, EngineConfig, EngineInner};

/// Engine plus the workspace and goal every command operates on.
pub struct Context {
    pub engine: Engine,
    pub workspace: PathBuf,
    pub goal_path: PathBuf,
}

impl Context {
    pub fn new(
        workspace: &Path,
        goal: &Path,
        runner: Option<&str>,
        rpc_url: Option<&str>,
        poll_ms: Option<u64>,
    ) -> Self {
        let config = build_config(runner, rpc_url, poll_ms);
        Self {
            engine: Arc::new(EngineInner::with_process_runner(config)),
            workspace: workspace.to_path_buf(),
            goal_path: workspace.join(goal),
        }
    }

    pub fn conductor(&self) -> Conductor {
        Conductor::new(self.engine.clone(), &self.workspace, &self.goal_path)
    }

    /// Tool surface bound to the agents of the goal's flow.
    pub async fn tools(&self) -> Result<WorkflowTools, String> {
        let (_, _, dag) = self.conductor().load_dag().await.map_err(|e| e.to_string())?;
        Ok(self.engine.tools(&self.workspace, &dag))
    }
}

/// Apply command-line overrides to the default engine configuration.
pub fn build_config(runner: Option<&str>, rpc_url: Option<&str>, poll_ms: Option<u64>) -> EngineConfig {
    let mut config = EngineConfig::default();
    if let Some(runner) = runner {
        let mut parts = runner.split_whitespace().map(String::from);
        if let Some(command) = parts.next() {
            config.runner_command = command;
            config.runner_args = parts.collect();
        }
    }
    if let Some(url) = rpc_url.filter(|u| !u.trim().is_empty()) {
        config.rpc_url = url.to_string();
    }
    if let Some(ms) = poll_ms.filter(|ms| *ms > 0) {
        config.poll_interval = Duration::from_millis(ms);
    }
    config
}

/// Pretty-print a JSON value to stdout.
pub fn print_json(value: &serde_json::Value) {
    println!(
        "{}",
        serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_config_overrides() {
        let config = build_config(Some("codex exec --full-auto"), Some("http://h:1/rpc"), Some(500));
        assert_eq!(config.runner_command, "codex");
        assert_eq!(config.runner_args, vec!["exec", "--full-auto"]);
        assert_eq!(config.rpc_url, "http://h:1/rpc");
        assert_eq!(config.poll_interval, Duration::from_millis(500));
    }

    #[test]
    fn test_build_config_defaults() {
        let config = build_config(Some("   "), None, Some(0));
        let defaults = EngineConfig::default();
        assert_eq!(config.runner_command, defaults.runner_command);
        assert_eq!(config.poll_interval, defaults.poll_interval);
    }

    #[tokio::test]
    async fn test_tools_use_goal_flow_agents() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("GOAL.md"),
            "---\nflow: \"architect -> dev\"\n---\nShip it.\n",
        )
        .unwrap();

        let ctx = Context::new(dir.path(), Path::new("GOAL.md"), Some("true"), None, None);
        let tools = ctx.tools().await.unwrap();

        assert!(tools.known_agents().contains("architect"));
        assert!(tools.known_agents().contains("dev"));
        assert!(tools.known_agents().contains("coordinator"));
    }

    #[tokio::test]
    async fn test_tools_missing_goal_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = Context::new(dir.path(), Path::new("GOAL.md"), None, None, None);
        assert!(ctx.tools().await.is_err());
    }
}
