//! DeliverTx and the shared execution path used by task transactions.

use super::{Chain, OpenBlock};
use crate::error::{ChainError, Result};
use crate::ports::{ExecutionContext, RuntimeError};
use lc_01_storage_overlay::StorageContext;
use lc_03_task_scheduler::{ChainTask, TaskExecutor, TaskOutcome};
use shared_types::{
    hash_to_hex, ExecutionState, ScriptValue, Transaction, TransactionResult, U256,
};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{debug, warn};

/// Result of one execution plus what a task handler reported.
pub(crate) struct Executed {
    pub(crate) result: TransactionResult,
    pub(crate) task_outcome: Option<TaskOutcome>,
}

impl Chain {
    /// Execute `tx` in the open block.
    ///
    /// Execution faults come back as a Fault result, never as an error.
    pub fn deliver_tx(&mut self, tx: Transaction) -> Result<TransactionResult> {
        let mut open = self.open.take().ok_or(ChainError::NoOpenBlock)?;
        if open.closed {
            let height = open.block.height;
            self.open = Some(open);
            return Err(ChainError::BlockSealed(height));
        }

        let hash = tx.hash();
        if open.block.transaction_hashes.contains(&hash) {
            self.open = Some(open);
            return Err(ChainError::DuplicateTransaction(hash_to_hex(&hash)));
        }

        let executed = self.run_transaction(&mut open, tx, None);
        self.open = Some(open);
        Ok(executed.result)
    }

    /// Run `tx` against a snapshot of the open changeset.
    ///
    /// The snapshot is merged only on Halt. The terminal state is recorded
    /// on the block whatever the outcome.
    pub(crate) fn run_transaction(
        &mut self,
        open: &mut OpenBlock,
        tx: Transaction,
        task: Option<&ChainTask>,
    ) -> Executed {
        let hash = tx.hash();
        let index = open.transactions.len();
        open.block.add_transaction_hash(hash);
        open.transactions.push(tx);

        let OpenBlock {
            block,
            changeset,
            transactions,
            ..
        } = open;
        let tx = &transactions[index];
        let runtime = Arc::clone(&self.runtime);

        let mut snapshot = changeset.snapshot();
        let chain_name = &self.name;
        let oracle = self.oracle.as_mut();
        let (height, validator, timestamp) = (block.height, block.validator, block.timestamp);
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            runtime.execute(ExecutionContext {
                tx_index: index as u32,
                script: &tx.script,
                offset: 0,
                chain_name,
                height,
                validator,
                timestamp,
                tx,
                storage: &mut snapshot,
                oracle,
                task,
            })
        }))
        .unwrap_or_else(|payload| Err(RuntimeError(panic_message(payload.as_ref()))));

        let executed = match outcome {
            Ok(exec) if exec.state == ExecutionState::Halt => {
                let value = exec.result.clone().unwrap_or(ScriptValue::None);
                match value.to_bytes() {
                    Ok(bytes) => {
                        let writes = snapshot.commit();
                        self.oracle.merge_tx_data();
                        if exec.events.iter().any(|e| e.kind.alters_method_table()) {
                            self.method_table_dirty = true;
                        }
                        block.set_result_for_hash(hash, bytes);
                        block.add_events_for_hash(hash, exec.events.clone());
                        debug!(
                            "[lc-04] Transaction {} halted: {} write(s), {} event(s)",
                            hash_to_hex(&hash),
                            writes,
                            exec.events.len()
                        );
                        Executed {
                            result: TransactionResult::new(
                                hash,
                                ExecutionState::Halt,
                                "",
                                exec.gas_used,
                                exec.events,
                                exec.result,
                            ),
                            task_outcome: exec.task_outcome,
                        }
                    }
                    Err(err) => {
                        snapshot.discard();
                        self.oracle.discard_tx_data();
                        let message = format!("Result could not be encoded: {}", err);
                        self.record_fault(&hash_to_hex(&hash), &message);
                        Executed {
                            result: TransactionResult::new(
                                hash,
                                ExecutionState::Fault,
                                message,
                                exec.gas_used,
                                Vec::new(),
                                None,
                            ),
                            task_outcome: None,
                        }
                    }
                }
            }
            Ok(exec) => {
                snapshot.discard();
                self.oracle.discard_tx_data();
                let message = exec
                    .fault_message
                    .unwrap_or_else(|| format!("Execution ended in {:?}", exec.state));
                self.record_fault(&hash_to_hex(&hash), &message);
                Executed {
                    result: TransactionResult::new(
                        hash,
                        exec.state,
                        message,
                        exec.gas_used,
                        Vec::new(),
                        None,
                    ),
                    task_outcome: exec.task_outcome,
                }
            }
            Err(err) => {
                snapshot.discard();
                self.oracle.discard_tx_data();
                self.record_fault(&hash_to_hex(&hash), &err.0);
                Executed {
                    result: TransactionResult::fault(hash, err.0),
                    task_outcome: None,
                }
            }
        };

        block.set_state_for_hash(hash, executed.result.state);
        self.metrics
            .record_delivery(executed.result.is_success(), gas_as_u64(executed.result.gas_used));
        executed
    }

    fn record_fault(&self, hash: &str, message: &str) {
        warn!("[lc-04] Transaction {} faulted: {}", hash, message);
        if let Err(err) = self.red_filter.on_fault(message) {
            warn!("[lc-04] Red filter update failed: {}", err);
        }
    }
}

/// Message carried by a runtime panic.
fn panic_message(payload: &(dyn Any + Send)) -> String {
    let detail = payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown cause".to_string());
    format!("Runtime panicked: {}", detail)
}

fn gas_as_u64(gas: U256) -> u64 {
    if gas > U256::from(u64::MAX) {
        u64::MAX
    } else {
        gas.low_u64()
    }
}

/// Runs scheduled tasks through [`Chain::run_transaction`] while the block
/// is being opened.
pub(crate) struct TaskRun<'a> {
    chain: &'a mut Chain,
    open: &'a mut OpenBlock,
    transactions: Vec<Transaction>,
}

impl<'a> TaskRun<'a> {
    pub(crate) fn new(chain: &'a mut Chain, open: &'a mut OpenBlock) -> Self {
        Self {
            chain,
            open,
            transactions: Vec::new(),
        }
    }

    /// Task transactions executed so far, signed when the node has a key.
    pub(crate) fn into_transactions(self) -> Vec<Transaction> {
        self.transactions
    }
}

impl TaskExecutor for TaskRun<'_> {
    fn storage(&mut self) -> &mut dyn StorageContext {
        &mut self.open.changeset
    }

    fn execute_task(&mut self, task: &ChainTask, tx: &Transaction) -> TaskOutcome {
        let mut tx = tx.clone();
        if let Some(key) = &self.chain.signing_key {
            tx.sign(key);
        }

        let hash = tx.hash();
        if self.open.block.transaction_hashes.contains(&hash) {
            warn!(
                "[lc-04] Task {} produced a transaction already in block {}",
                task.id, self.open.block.height
            );
            return TaskOutcome::KeepRunning;
        }

        self.transactions.push(tx.clone());
        let executed = self.chain.run_transaction(self.open, tx, Some(task));
        if !executed.result.is_success() {
            return TaskOutcome::Crashed;
        }
        executed.task_outcome.unwrap_or_else(|| {
            warn!(
                "[lc-04] Task {} halted without reporting an outcome",
                task.id
            );
            TaskOutcome::Crashed
        })
    }
}
