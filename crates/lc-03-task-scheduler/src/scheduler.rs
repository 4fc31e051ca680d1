//! # Task Scheduler
//!
//! Once per block, walks the durable task list in creation order, runs every
//! due task through the [`TaskExecutor`] and applies the reported outcome.

use crate::domain::{is_due, ChainTask, TaskFrequencyMode, TaskId, TaskOutcome};
use crate::error::Result;
use crate::ports::TaskExecutor;
use crate::store::TaskStore;
use lc_02_gas_extraction::ScriptBuilder;
use shared_types::{Address, Timestamp, Transaction, U256};
use tracing::{debug, info, warn};

/// Payload tagging scheduler-generated transactions.
pub const TASK_PAYLOAD: &[u8] = b"TASK";

/// The block the scheduler is running in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockContext {
    pub chain_name: String,
    pub height: u64,
    pub timestamp: Timestamp,
    /// Gas price declared by task transactions.
    pub minimum_fee: U256,
}

/// What happened to the task list in one block.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScheduleReport {
    /// Executed task transactions, in execution order.
    pub transactions: Vec<Transaction>,
    pub executed: Vec<(TaskId, TaskOutcome)>,
    pub skipped: Vec<TaskId>,
    pub removed: Vec<TaskId>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TaskScheduler {
    store: TaskStore,
}

impl TaskScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn store(&self) -> &TaskStore {
        &self.store
    }

    /// Transaction that runs `task` once: the owner pays, the chain signs.
    pub fn build_transaction(task: &ChainTask, ctx: &BlockContext) -> Transaction {
        let script = ScriptBuilder::new()
            .allow_gas(task.owner, Address::null(), ctx.minimum_fee, task.gas_limit)
            .call_contract(&task.contract, &task.method, Vec::new())
            .spend_gas(task.owner)
            .end_script();

        Transaction::new(
            ctx.chain_name.clone(),
            ctx.chain_name.clone(),
            script,
            ctx.timestamp + 1,
            TASK_PAYLOAD,
        )
    }

    /// Run every due task of the block.
    pub fn process_block(
        &self,
        executor: &mut dyn TaskExecutor,
        ctx: &BlockContext,
    ) -> Result<ScheduleReport> {
        let mut report = ScheduleReport::default();

        for id in self.store.list(executor.storage())? {
            let Some(task) = self.store.get(executor.storage(), id)? else {
                warn!("[lc-03] Task {} listed but has no metadata", id);
                continue;
            };

            let current = task.current_run(ctx.height, ctx.timestamp);
            let last_run = self.store.last_run(executor.storage(), id)?;
            if let Err(reason) = is_due(&task, current, last_run) {
                debug!("[lc-03] Task {} skipped at {}: {:?}", id, current, reason);
                report.skipped.push(id);
                continue;
            }

            let tx = Self::build_transaction(&task, ctx);
            let outcome = executor.execute_task(&task, &tx);
            report.transactions.push(tx);
            report.executed.push((id, outcome));

            match outcome {
                TaskOutcome::KeepRunning => {
                    if task.mode != TaskFrequencyMode::Always {
                        self.store.set_last_run(executor.storage(), id, current)?;
                    }
                }
                TaskOutcome::Finished => {
                    info!("[lc-03] Task {} finished at {}", id, current);
                    self.store.stop_task(executor.storage(), id)?;
                    report.removed.push(id);
                }
                TaskOutcome::Crashed => {
                    warn!("[lc-03] Task {} crashed running {}", id, task.full_method());
                    self.store.stop_task(executor.storage(), id)?;
                    report.removed.push(id);
                }
            }
        }

        Ok(report)
    }
}
