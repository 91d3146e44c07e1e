//! Shared engine context, passed by handle to every workflow and loop.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::EngineConfig;
use crate::dag::Dag;
use crate::error::EngineError;
use crate::goal;
use crate::runner::{AgentRunner, ProcessRunner};
use crate::singleflight::SingleFlight;
use crate::store::StateStore;
use crate::tools::WorkflowTools;

pub struct EngineInner {
    pub config: EngineConfig,
    pub state_store: Arc<StateStore>,
    pub runner: Arc<dyn AgentRunner>,
    /// Goal checksums keyed by goal path; concurrent requests share one read
    checksums: SingleFlight<PathBuf, Result<String, EngineError>>,
}

pub type Engine = Arc<EngineInner>;

impl EngineInner {
    pub fn new(config: EngineConfig, runner: Arc<dyn AgentRunner>) -> Self {
        Self {
            state_store: Arc::new(StateStore::new(&config)),
            runner,
            checksums: SingleFlight::new(),
            config,
        }
    }

    /// Engine that runs agents with the configured process runner.
    pub fn with_process_runner(config: EngineConfig) -> Self {
        let runner = Arc::new(ProcessRunner::from_config(&config));
        Self::new(config, runner)
    }

    pub async fn goal_checksum(&self, goal_path: &Path) -> Result<String, EngineError> {
        let path = goal_path.to_path_buf();
        self.checksums
            .run(path.clone(), || async move { goal::checksum_file(&path).await })
            .await
    }

    /// Tool surface for `workspace`, with the agents of `dag` as recipients.
    pub fn tools(&self, workspace: &Path, dag: &Dag) -> WorkflowTools {
        WorkflowTools::new(self.state_store.clone(), workspace, dag.agents())
    }
}
