//! Conductor: drives one workflow to completion.
//!
//! Each turn loads the state document and acts on its status:
//!   - `working`           - run the current agent through the `AgentRunner`
//!   - `agent-done`        - route to the next agent and hand off
//!   - `complete`          - run the completion gate, then stop
//!   - `waiting-for-human` - stop when unattended, otherwise wait for an answer
//!
//! Agents change the status themselves through tool calls while they run.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::bus::{self, RouteTarget};
use crate::dag::Dag;
use crate::error::EngineError;
use crate::goal::{GoalConfig, GoalDocument};
use crate::models::{InteractionMode, WorkflowState, WorkflowStatus, COORDINATOR};
use crate::prompt::{build_agent_prompt, PromptContext};
use crate::runner::RunRequest;
use crate::state::Engine;

/// How a workflow run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowOutcome {
    Complete,
    WaitingForHuman,
    HandoffLimit,
    Cancelled,
}

/// Something that can run a workflow to completion. The continuous loop
/// depends on this rather than on `Conductor` directly.
#[async_trait]
pub trait Workflow: Send + Sync {
    async fn run_to_completion(&self) -> Result<WorkflowOutcome, EngineError>;
}

pub struct Conductor {
    engine: Engine,
    workspace: PathBuf,
    goal_path: PathBuf,
    interactive: Option<bool>,
    cancel: CancellationToken,
}

impl Conductor {
    pub fn new(engine: Engine, workspace: impl Into<PathBuf>, goal_path: impl Into<PathBuf>) -> Self {
        Self {
            engine,
            workspace: workspace.into(),
            goal_path: goal_path.into(),
            interactive: None,
            cancel: CancellationToken::new(),
        }
    }

    /// Override the goal's `interactive` setting.
    pub fn with_interactive(mut self, interactive: bool) -> Self {
        self.interactive = Some(interactive);
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    fn goal_dir(&self) -> &Path {
        self.goal_path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(Path::new("."))
    }

    /// Build the flow declared by the goal document.
    pub async fn load_dag(&self) -> Result<(GoalDocument, GoalConfig, Dag), EngineError> {
        let goal = GoalDocument::load(&self.goal_path).await?;
        let config = goal.config()?;
        let dag = Dag::parse_flow(config.flow(), self.goal_dir())?;
        Ok((goal, config, dag))
    }

    async fn prepare(&self, interactive: bool) -> Result<(), EngineError> {
        let checksum = self.engine.goal_checksum(&self.goal_path).await?;
        self.engine
            .state_store
            .transaction(&self.workspace, |state| {
                if state.current_agent.trim().is_empty() {
                    state.current_agent = COORDINATOR.to_string();
                }
                if !interactive && state.interaction_mode == InteractionMode::Brainstorming {
                    state.interaction_mode = InteractionMode::SelfDrive;
                }
                state.goal_checksum = checksum;
            })
            .await
    }

    async fn run_turn(
        &self,
        state: &WorkflowState,
        goal: &GoalDocument,
        config: &GoalConfig,
        dag: &Dag,
        interactive: bool,
    ) -> Result<(), EngineError> {
        let store = &self.engine.state_store;
        let agent = state.active_agent().to_string();

        if !dag.contains(&agent) {
            tracing::warn!("[Conductor] '{}' is not part of the flow, returning to coordinator", agent);
            store
                .transaction(&self.workspace, |s| {
                    s.add_progress(COORDINATOR, format!("Agent '{}' is not in the flow", agent));
                    bus::handoff(s, &RouteTarget::coordinator());
                })
                .await?;
            return Ok(());
        }

        let model = state
            .current_model
            .clone()
            .filter(|m| !m.trim().is_empty())
            .or_else(|| config.model_for(&agent));
        let identity = match &model {
            Some(m) => format!("{}:{}", agent, m),
            None => agent.clone(),
        };
        let successors = dag.successors(&agent);
        let predecessors = dag.predecessors(&agent);
        let prompt = build_agent_prompt(&PromptContext {
            agent: &agent,
            identity: &identity,
            mode: state.interaction_mode,
            task: &state.task,
            successors: &successors,
            predecessors: &predecessors,
            goal_body: &goal.body,
        });

        let request = RunRequest {
            prompt,
            workspace: self.workspace.clone(),
            agent: agent.clone(),
            model,
            interactive,
        };

        let result = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return Ok(()),
            result = self.engine.runner.run(request) => result,
        };

        match result {
            Ok(()) => {
                store
                    .transaction(&self.workspace, |s| {
                        // The agent exited without yielding.
                        if s.status == WorkflowStatus::Working && s.active_agent() == agent {
                            s.status = WorkflowStatus::AgentDone;
                            s.task.clear();
                        }
                    })
                    .await?;
                Ok(())
            }
            Err(e) if agent == COORDINATOR => Err(e),
            Err(e) => {
                tracing::warn!("[Conductor] {} failed: {}", identity, e);
                store
                    .transaction(&self.workspace, |s| {
                        s.add_progress(&identity, format!("Run failed: {}", e));
                        bus::handoff(s, &RouteTarget::coordinator());
                    })
                    .await?;
                Ok(())
            }
        }
    }

    async fn wait_for_answer(&self) -> Result<bool, EngineError> {
        loop {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return Ok(false),
                _ = tokio::time::sleep(self.engine.config.poll_interval) => {}
            }
            let state = self.engine.state_store.load(&self.workspace).await?;
            if state.status != WorkflowStatus::WaitingForHuman {
                return Ok(true);
            }
        }
    }
}

#[async_trait]
impl Workflow for Conductor {
    async fn run_to_completion(&self) -> Result<WorkflowOutcome, EngineError> {
        let (goal, config, dag) = self.load_dag().await?;
        let interactive = self.interactive.unwrap_or_else(|| config.is_interactive());
        self.prepare(interactive).await?;

        let store = &self.engine.state_store;
        let max_turns = self.engine.config.max_handoffs;
        tracing::info!(
            "[Conductor] Running {} (agents: {})",
            self.workspace.display(),
            dag.agents().join(", ")
        );

        for _ in 0..max_turns {
            if self.cancel.is_cancelled() {
                return Ok(WorkflowOutcome::Cancelled);
            }
            let state = store.load(&self.workspace).await?;

            match state.status {
                WorkflowStatus::WaitingForHuman => {
                    if !interactive || state.interaction_mode.is_unattended() {
                        tracing::info!("[Conductor] Waiting for human, stopping");
                        return Ok(WorkflowOutcome::WaitingForHuman);
                    }
                    if !self.wait_for_answer().await? {
                        return Ok(WorkflowOutcome::Cancelled);
                    }
                }
                WorkflowStatus::Complete => {
                    let Some(gate) = config.completion_gate.as_deref().filter(|g| !g.trim().is_empty())
                    else {
                        tracing::info!("[Conductor] Workflow complete");
                        return Ok(WorkflowOutcome::Complete);
                    };
                    match run_completion_gate(gate, &self.workspace).await {
                        Ok(()) => {
                            tracing::info!("[Conductor] Completion gate passed");
                            return Ok(WorkflowOutcome::Complete);
                        }
                        Err(output) => {
                            tracing::warn!("[Conductor] Completion gate failed: {}", output);
                            store
                                .transaction(&self.workspace, |s| {
                                    s.add_progress(
                                        COORDINATOR,
                                        format!("Completion gate `{}` failed:\n{}", gate, output),
                                    );
                                    bus::handoff(s, &RouteTarget::coordinator());
                                })
                                .await?;
                        }
                    }
                }
                WorkflowStatus::AgentDone => {
                    store
                        .transaction(&self.workspace, |s| {
                            let target = bus::route_after_agent_done(s);
                            bus::handoff(s, &target);
                        })
                        .await?;
                }
                WorkflowStatus::Working => {
                    self.run_turn(&state, &goal, &config, &dag, interactive).await?;
                }
            }
        }

        tracing::warn!("[Conductor] Stopped after {} turns", max_turns);
        Ok(WorkflowOutcome::HandoffLimit)
    }
}

/// Run the completion gate command in the workspace. `Err` carries its output.
async fn run_completion_gate(command: &str, workspace: &Path) -> Result<(), String> {
    #[cfg(windows)]
    let mut cmd = {
        let mut c = tokio::process::Command::new("cmd");
        c.args(["/C", command]);
        c
    };
    #[cfg(not(windows))]
    let mut cmd = {
        let mut c = tokio::process::Command::new("sh");
        c.args(["-c", command]);
        c
    };

    let output = cmd
        .current_dir(workspace)
        .output()
        .await
        .map_err(|e| format!("failed to run: {}", e))?;
    if output.status.success() {
        return Ok(());
    }

    let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
    text.push_str(&String::from_utf8_lossy(&output.stderr));
    let lines: Vec<&str> = text.lines().collect();
    let tail = lines[lines.len().saturating_sub(20)..].join("\n");
    Err(format!("{} {}", output.status, tail).trim().to_string())
}
