//! Baton Core: transport-agnostic orchestration for cooperating agent workers.
//!
//! This crate owns the parts of Baton that decide *who runs next*:
//!
//! - `dag`: the declared agent topology (flow specification to normalized DAG)
//! - `bus`: the per-workspace mailbox and the workflow status state machine
//! - `tools`: the tool-call surface agents use to reach the bus
//! - `orchestration`: runs one workflow to completion through an `AgentRunner`
//! - `workflow`: continuous mode: trigger detection, retries, cycle resets
//!
//! It has no transport dependency. The CLI (`baton-cli`) and any RPC adapter
//! build an `Engine` and call into these modules directly.

pub mod bus;
pub mod config;
pub mod dag;
pub mod error;
pub mod goal;
pub mod models;
pub mod orchestration;
pub mod prompt;
pub mod runner;
pub mod singleflight;
pub mod state;
pub mod store;
pub mod tools;
pub mod workflow;

// Convenience re-exports
pub use config::EngineConfig;
pub use dag::Dag;
pub use error::EngineError;
pub use state::{Engine, EngineInner};
pub use tools::{ToolResult, WorkflowTools};
