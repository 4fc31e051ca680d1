//! Domain layer for the task scheduler.

pub mod schedule;
pub mod task;

pub use schedule::{is_due, SkipReason};
pub use task::{ChainTask, TaskFrequencyMode, TaskId, TaskOutcome, TaskSpec};
