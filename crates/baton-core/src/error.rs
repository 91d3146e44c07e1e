//! Core error type for the Baton engine.
//!
//! `EngineError` is the fatal tier: malformed flows, cycles, unreadable goal
//! documents and persistence failures. Mistakes an agent can correct (bad
//! status value, unknown recipient, ...) are not errors at all; they travel
//! back as `ToolResult::error` so the agent can retry.

#[derive(Debug, Clone, thiserror::Error)]
pub enum EngineError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(String),

    #[error("State error: {0}")]
    State(String),

    #[error("Runner error: {0}")]
    Runner(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<std::io::Error> for EngineError {
    fn from(err: std::io::Error) -> Self {
        EngineError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for EngineError {
    fn from(err: serde_json::Error) -> Self {
        EngineError::State(err.to_string())
    }
}
