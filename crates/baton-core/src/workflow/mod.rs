//! Continuous mode: run the workflow, wait for a reason to run it again,
//! fold any steering into the goal, reset, repeat.

pub mod continuous;
pub mod trigger;

pub use continuous::ContinuousLoop;
pub use trigger::{next_cron_tick, next_deadline, Deadline, Trigger};
