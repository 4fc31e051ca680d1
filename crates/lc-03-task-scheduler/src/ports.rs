//! # Outbound Ports (Driven Ports)
//!
//! The chain runs due tasks through its own execution path; the scheduler
//! only sees it through [`TaskExecutor`].

use crate::domain::{ChainTask, TaskOutcome};
use lc_01_storage_overlay::StorageContext;
use shared_types::Transaction;

/// Executes synthesized task transactions against the open block.
pub trait TaskExecutor {
    /// Storage of the open block.
    fn storage(&mut self) -> &mut dyn StorageContext;

    /// Run `tx` on behalf of `task` and report what the handler decided.
    ///
    /// A failed execution must be reported as [`TaskOutcome::Crashed`].
    fn execute_task(&mut self, task: &ChainTask, tx: &Transaction) -> TaskOutcome;
}
