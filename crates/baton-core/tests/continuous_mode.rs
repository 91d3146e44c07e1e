//! Integration tests for the continuous-mode loop, driven by test doubles for
//! the workflow and the Agent Runner.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use baton_core::models::{InteractionMode, WorkflowStatus, CONTINUOUS_MODE, COORDINATOR};
use baton_core::orchestration::{Workflow, WorkflowOutcome};
use baton_core::runner::{AgentRunner, RunRequest};
use baton_core::workflow::{ContinuousLoop, Trigger};
use baton_core::{EngineConfig, EngineError, EngineInner};
use tokio_util::sync::CancellationToken;

/// Fails every continuous prompt.
#[derive(Default)]
struct FailingRunner {
    calls: AtomicUsize,
}

#[async_trait]
impl AgentRunner for FailingRunner {
    async fn run(&self, request: RunRequest) -> Result<(), EngineError> {
        assert_eq!(request.agent, CONTINUOUS_MODE);
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(EngineError::Runner("agent crashed".into()))
    }
}

#[derive(Default)]
struct CountingWorkflow {
    runs: AtomicUsize,
}

#[async_trait]
impl Workflow for CountingWorkflow {
    async fn run_to_completion(&self) -> Result<WorkflowOutcome, EngineError> {
        self.runs.fetch_add(1, Ordering::SeqCst);
        Ok(WorkflowOutcome::Complete)
    }
}

const GOAL: &str = "---\ncontinuous:\n  prompt: \"Summarize progress\"\n  autoDuration: 1h\n---\n# Goal\nShip v1.\n";

fn engine(runner: Arc<FailingRunner>) -> Arc<EngineInner> {
    let config = EngineConfig {
        poll_interval: Duration::from_millis(20),
        ..Default::default()
    };
    Arc::new(EngineInner::new(config, runner))
}

#[tokio::test]
async fn test_steering_cycle_updates_goal_and_resets_state() {
    let dir = tempfile::tempdir().unwrap();
    let goal_path = dir.path().join("GOAL.md");
    std::fs::write(&goal_path, GOAL).unwrap();

    let runner = Arc::new(FailingRunner::default());
    let engine = engine(runner.clone());
    engine
        .state_store
        .transaction(dir.path(), |s| {
            s.status = WorkflowStatus::Complete;
            s.current_agent = "dev".into();
            baton_core::bus::post_human_message(s, "Add dark mode.", None).unwrap();
        })
        .await
        .unwrap();

    let workflow = Arc::new(CountingWorkflow::default());
    let looper = ContinuousLoop::new(
        engine.clone(),
        dir.path(),
        &goal_path,
        workflow.clone(),
        CancellationToken::new(),
    );

    let trigger = looper.run_cycle().await.unwrap();
    assert_eq!(trigger, Trigger::SteeringMessage);
    assert_eq!(workflow.runs.load(Ordering::SeqCst), 1);

    // Exhausted retries are recorded but do not stop the cycle.
    assert_eq!(runner.calls.load(Ordering::SeqCst), 3);
    let state = engine.state_store.load(dir.path()).await.unwrap();
    let failures: Vec<_> = state
        .progress
        .iter()
        .filter(|p| p.description.starts_with("Continuous prompt attempt"))
        .collect();
    assert_eq!(failures.len(), 3);
    assert!(failures[2].description.contains("3/3"));

    // The steering message lands right after the frontmatter.
    let goal = std::fs::read_to_string(&goal_path).unwrap();
    assert!(goal.starts_with("---\ncontinuous:\n"));
    assert!(goal.contains("---\nAdd dark mode.\n\n# Goal\nShip v1.\n"));

    let message = &state.messages[0];
    assert!(message.read);
    assert_eq!(message.read_by.as_deref(), Some(CONTINUOUS_MODE));

    assert_eq!(state.status, WorkflowStatus::Working);
    assert_eq!(state.interaction_mode, InteractionMode::Continuous);
    assert_eq!(state.current_agent, COORDINATOR);
}

#[tokio::test]
async fn test_run_stops_on_cancel_between_cycles() {
    let dir = tempfile::tempdir().unwrap();
    let goal_path = dir.path().join("GOAL.md");
    std::fs::write(&goal_path, "# Goal\n").unwrap();

    let engine = engine(Arc::new(FailingRunner::default()));
    let workflow = Arc::new(CountingWorkflow::default());
    let cancel = CancellationToken::new();
    let looper = ContinuousLoop::new(engine, dir.path(), &goal_path, workflow.clone(), cancel.clone());

    let edit_path = goal_path.clone();
    let stopper = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(60)).await;
        std::fs::write(&edit_path, "# Goal\nv2\n").unwrap();
        tokio::time::sleep(Duration::from_millis(150)).await;
        stopper.cancel();
    });

    let result = tokio::time::timeout(Duration::from_secs(5), looper.run()).await;
    assert_eq!(result.unwrap().unwrap(), Trigger::None);
    assert_eq!(workflow.runs.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_unreadable_goal_stops_the_loop() {
    let dir = tempfile::tempdir().unwrap();
    let engine = engine(Arc::new(FailingRunner::default()));
    let looper = ContinuousLoop::new(
        engine,
        dir.path(),
        dir.path().join("missing.md"),
        Arc::new(CountingWorkflow::default()),
        CancellationToken::new(),
    );
    assert!(matches!(looper.run().await, Err(EngineError::Io(_))));
}
