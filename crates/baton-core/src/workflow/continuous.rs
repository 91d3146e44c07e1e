//! ContinuousLoop: one long-lived, sequential cycle per workspace.
//!
//! Per cycle:
//!   1. Run the workflow to completion
//!   2. Reload state for the log (an empty coordinator state if that fails)
//!   3. Run the continuous prompt, up to `continuous_attempts` tries
//!   4. Checksum the goal body (fatal on failure)
//!   5. Work out the next timed deadline
//!   6. Poll until something triggers or the token is cancelled
//!   7. Fold a steering message into the goal
//!   8. Reset the state for the next cycle
//!
//! Cancellation wins at every wait. Only the goal checksum can stop the
//! loop with an error; every other persistence failure is logged.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use super::trigger::{next_deadline, Deadline, Trigger};
use crate::error::EngineError;
use crate::goal::{self, GoalConfig, GoalDocument};
use crate::models::{
    InteractionMode, WorkflowState, WorkflowStatus, CONTINUOUS_MODE, COORDINATOR, HUMAN_PARTNER,
};
use crate::orchestration::Workflow;
use crate::runner::RunRequest;
use crate::state::Engine;

pub struct ContinuousLoop {
    engine: Engine,
    workspace: PathBuf,
    goal_path: PathBuf,
    workflow: Arc<dyn Workflow>,
    cancel: CancellationToken,
}

impl ContinuousLoop {
    pub fn new(
        engine: Engine,
        workspace: impl Into<PathBuf>,
        goal_path: impl Into<PathBuf>,
        workflow: Arc<dyn Workflow>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            engine,
            workspace: workspace.into(),
            goal_path: goal_path.into(),
            workflow,
            cancel,
        }
    }

    /// Cycle until cancelled. Returns `Trigger::None` on cancellation.
    pub async fn run(&self) -> Result<Trigger, EngineError> {
        tracing::info!("[Continuous] Starting for {}", self.workspace.display());
        let mut cycle = 0u64;
        loop {
            if self.cancel.is_cancelled() {
                return Ok(Trigger::None);
            }
            cycle += 1;
            tracing::info!("[Continuous] Cycle {}", cycle);
            match self.run_cycle().await? {
                Trigger::None => {
                    tracing::info!("[Continuous] Cancelled after {} cycle(s)", cycle);
                    return Ok(Trigger::None);
                }
                trigger => tracing::info!("[Continuous] Cycle {} triggered by {}", cycle, trigger),
            }
        }
    }

    /// One cycle, steps 1 to 8. Returns what triggered the next one.
    pub async fn run_cycle(&self) -> Result<Trigger, EngineError> {
        // 1
        let outcome = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return Ok(Trigger::None),
            outcome = self.workflow.run_to_completion() => outcome,
        };
        match outcome {
            Ok(outcome) => tracing::info!("[Continuous] Workflow ended: {:?}", outcome),
            Err(e) => {
                tracing::error!("[Continuous] Workflow failed: {}", e);
                self.log_progress_safe(format!("Workflow failed: {}", e)).await;
            }
        }

        // 2: the reloaded state only feeds the log below. An unreadable
        // document falls back to an empty coordinator state so the cycle
        // still reaches the prompt and the trigger watch.
        let state = self.reload_state().await;
        tracing::debug!(
            "[Continuous] After workflow: {} ({})",
            state.status,
            state.active_agent()
        );
        let config = self.goal_config().await;

        // 3
        if let Some(prompt) = config.continuous_prompt() {
            if !self.run_continuous_prompt(prompt, &config).await {
                return Ok(Trigger::None);
            }
        }

        // 4
        let baseline = self.engine.goal_checksum(&self.goal_path).await?;

        // 5
        let deadline = next_deadline(&config, Instant::now());
        if let Some(d) = &deadline {
            tracing::info!(
                "[Continuous] Next {} in {:?}",
                d.kind,
                d.at.saturating_duration_since(Instant::now())
            );
        }

        // 6
        let trigger = self.watch_for_trigger(&baseline, deadline).await?;
        if trigger == Trigger::None {
            return Ok(Trigger::None);
        }

        // 7
        let state = self.reload_state().await;
        if trigger == Trigger::SteeringMessage {
            self.apply_steering(&state).await;
        }

        // 8
        self.reset_for_next_cycle().await;
        Ok(trigger)
    }

    /// Poll until the goal body changes, the human sends a message, the
    /// deadline passes, or the token is cancelled.
    pub async fn watch_for_trigger(
        &self,
        baseline: &str,
        deadline: Option<Deadline>,
    ) -> Result<Trigger, EngineError> {
        let poll = self.engine.config.poll_interval;
        loop {
            let wait = match &deadline {
                Some(d) => poll.min(d.at.saturating_duration_since(Instant::now())),
                None => poll,
            };
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return Ok(Trigger::None),
                _ = tokio::time::sleep(wait) => {}
            }
            if self.cancel.is_cancelled() {
                return Ok(Trigger::None);
            }

            let checksum = self.engine.goal_checksum(&self.goal_path).await?;
            if checksum != baseline {
                return Ok(Trigger::GoalChanged);
            }

            match self.engine.state_store.load(&self.workspace).await {
                Ok(state) if has_steering_message(&state) => return Ok(Trigger::SteeringMessage),
                Ok(_) => {}
                Err(e) => tracing::warn!("[Continuous] Could not read state while polling: {}", e),
            }

            if let Some(d) = &deadline {
                if Instant::now() >= d.at {
                    return Ok(d.kind);
                }
            }
        }
    }

    async fn reload_state(&self) -> WorkflowState {
        match self.engine.state_store.load(&self.workspace).await {
            Ok(state) => state,
            Err(e) => {
                tracing::warn!("[Continuous] Reload failed, using empty state: {}", e);
                WorkflowState::for_agent(COORDINATOR)
            }
        }
    }

    /// Goal configuration for this cycle. An unreadable goal yields the
    /// defaults; the checksum step reports the real failure.
    async fn goal_config(&self) -> GoalConfig {
        match GoalDocument::load(&self.goal_path).await.and_then(|g| g.config()) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("[Continuous] Could not read goal config: {}", e);
                GoalConfig::default()
            }
        }
    }

    /// Returns `false` when cancelled.
    async fn run_continuous_prompt(&self, prompt: &str, config: &GoalConfig) -> bool {
        let attempts = self.engine.config.continuous_attempts.max(1);
        for attempt in 1..=attempts {
            let request = RunRequest {
                prompt: prompt.to_string(),
                workspace: self.workspace.clone(),
                agent: CONTINUOUS_MODE.to_string(),
                model: config.model_for(COORDINATOR),
                interactive: false,
            };
            let result = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return false,
                result = self.engine.runner.run(request) => result,
            };
            match result {
                Ok(()) => return true,
                Err(e) => {
                    tracing::warn!(
                        "[Continuous] Prompt attempt {}/{} failed: {}",
                        attempt,
                        attempts,
                        e
                    );
                    self.log_progress_safe(format!(
                        "Continuous prompt attempt {}/{} failed: {}",
                        attempt, attempts, e
                    ))
                    .await;
                }
            }
        }
        tracing::warn!("[Continuous] Continuous prompt gave up after {} attempts", attempts);
        true
    }

    async fn apply_steering(&self, state: &WorkflowState) {
        let Some(message) = state
            .messages
            .iter()
            .filter(|m| !m.read && m.from_agent == HUMAN_PARTNER)
            .min_by_key(|m| m.id)
        else {
            return;
        };

        if let Err(e) = goal::prepend_steering_message(&self.goal_path, &message.body).await {
            tracing::warn!("[Continuous] Could not write steering message to goal: {}", e);
        }

        let id = message.id;
        let marked = self
            .engine
            .state_store
            .transaction(&self.workspace, |s| {
                if let Some(m) = s.messages.iter_mut().find(|m| m.id == id) {
                    m.mark_read(CONTINUOUS_MODE);
                }
            })
            .await;
        if let Err(e) = marked {
            tracing::warn!("[Continuous] Could not mark message #{} read: {}", id, e);
        }
    }

    async fn reset_for_next_cycle(&self) {
        let result = self
            .engine
            .state_store
            .transaction(&self.workspace, |s| {
                s.status = WorkflowStatus::Working;
                s.interaction_mode = InteractionMode::Continuous;
                s.current_agent = COORDINATOR.to_string();
                s.current_model = None;
            })
            .await;
        if let Err(e) = result {
            tracing::warn!("[Continuous] Could not reset state: {}", e);
        }
    }

    async fn log_progress_safe(&self, description: String) {
        let result = self
            .engine
            .state_store
            .transaction(&self.workspace, |s| s.add_progress(CONTINUOUS_MODE, description))
            .await;
        if let Err(e) = result {
            tracing::warn!("[Continuous] Could not record progress: {}", e);
        }
    }
}

fn has_steering_message(state: &WorkflowState) -> bool {
    state
        .messages
        .iter()
        .any(|m| !m.read && m.from_agent == HUMAN_PARTNER)
}
