//! # Ledger Core - Task Scheduler (Subsystem 3)
//!
//! **Bounded Context:** Recurring on-chain jobs
//!
//! ## Purpose
//!
//! Contracts can ask the chain to call one of their methods on a schedule.
//! Each `BeginBlock` the scheduler decides which tasks are due, has the chain
//! execute a synthesized transaction for each, and applies the handler's
//! three-way outcome:
//!
//! | Outcome | Effect |
//! |---------|--------|
//! | `KeepRunning` | last-run marker advanced (not for `Always` tasks) |
//! | `Finished` | task removed |
//! | `Crashed` | task removed |
//!
//! ## Module Structure
//!
//! - [`domain`]: `ChainTask`, frequency modes, due-run decision
//! - [`store`]: durable task metadata
//! - [`ports`]: `TaskExecutor` driven port
//! - [`scheduler`]: per-block processing

#![warn(clippy::all)]

pub mod domain;
pub mod ports;
pub mod scheduler;
pub mod store;

mod error;

pub use domain::{is_due, ChainTask, SkipReason, TaskFrequencyMode, TaskId, TaskOutcome, TaskSpec};
pub use error::{Result, TaskError};
pub use ports::TaskExecutor;
pub use scheduler::{BlockContext, ScheduleReport, TaskScheduler, TASK_PAYLOAD};
pub use store::{contract_key, TaskStore};

/// Subsystem identifier used in log prefixes.
pub const SUBSYSTEM_ID: u8 = 3;
