//! AgentRunner: runs one agent turn as an external process.
//!
//! The core only cares whether the run succeeded. The prompt goes in on
//! stdin, the agent talks back through tool calls over the RPC endpoint,
//! and stdout/stderr are drained to the debug log.

use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWriteExt, BufReader};

use crate::config::EngineConfig;
use crate::error::EngineError;

pub const ENV_RPC_URL: &str = "BATON_RPC_URL";
pub const ENV_INTERACTIVE: &str = "BATON_INTERACTIVE";
pub const ENV_AGENT: &str = "BATON_AGENT";
pub const ENV_MODEL: &str = "BATON_MODEL";

/// One agent turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunRequest {
    pub prompt: String,
    pub workspace: PathBuf,
    /// Bare agent name
    pub agent: String,
    pub model: Option<String>,
    pub interactive: bool,
}

#[async_trait]
pub trait AgentRunner: Send + Sync {
    async fn run(&self, request: RunRequest) -> Result<(), EngineError>;
}

/// Spawns the configured agent CLI for every turn.
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    command: String,
    args: Vec<String>,
    rpc_url: String,
}

impl ProcessRunner {
    pub fn new(command: impl Into<String>, args: Vec<String>, rpc_url: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            args,
            rpc_url: rpc_url.into(),
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(
            config.runner_command.clone(),
            config.runner_args.clone(),
            config.rpc_url.clone(),
        )
    }
}

#[async_trait]
impl AgentRunner for ProcessRunner {
    async fn run(&self, request: RunRequest) -> Result<(), EngineError> {
        let label = match &request.model {
            Some(model) => format!("{}:{}", request.agent, model),
            None => request.agent.clone(),
        };
        tracing::info!(
            "[Runner] Starting {} for {} in {}",
            self.command,
            label,
            request.workspace.display()
        );

        let mut child = tokio::process::Command::new(&self.command)
            .args(&self.args)
            .current_dir(&request.workspace)
            .env(ENV_RPC_URL, &self.rpc_url)
            .env(ENV_INTERACTIVE, if request.interactive { "1" } else { "0" })
            .env(ENV_AGENT, &request.agent)
            .env(ENV_MODEL, request.model.as_deref().unwrap_or_default())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                EngineError::Runner(format!(
                    "Failed to spawn '{}': {}. Is it installed and in PATH?",
                    self.command, e
                ))
            })?;

        if let Some(stdout) = child.stdout.take() {
            tokio::spawn(drain(stdout, label.clone(), "stdout"));
        }
        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(drain(stderr, label.clone(), "stderr"));
        }

        if let Some(mut stdin) = child.stdin.take() {
            // The agent may exit without reading its prompt.
            if let Err(e) = stdin.write_all(request.prompt.as_bytes()).await {
                tracing::warn!("[Runner] Could not write prompt to {}: {}", label, e);
            }
            let _ = stdin.shutdown().await;
        }

        let status = child
            .wait()
            .await
            .map_err(|e| EngineError::Runner(format!("Failed to wait for {}: {}", label, e)))?;

        if status.success() {
            tracing::info!("[Runner] {} finished", label);
            Ok(())
        } else {
            Err(EngineError::Runner(format!("{} exited with {}", label, status)))
        }
    }
}

async fn drain<R: AsyncRead + Unpin>(reader: R, label: String, stream: &'static str) {
    let mut lines = BufReader::new(reader).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        tracing::debug!("[Runner:{} {}] {}", label, stream, line);
    }
}
