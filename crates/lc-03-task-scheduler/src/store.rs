//! # Task Store
//!
//! Durable task metadata inside the `tasks/` partition:
//!
//! | Key | Value |
//! |-----|-------|
//! | `tasks/next_id` | next id to allocate (`u64`) |
//! | `tasks/list` | ids of live tasks, in creation order (`Vec<u64>`) |
//! | `tasks/task.<id>` | [`ChainTask`] |
//! | `tasks/run.<id>` | last run marker (`u64`) |
//!
//! All values are bincode encoded. Every operation works against whatever
//! [`StorageContext`] it is handed, usually the open block's changeset.

use crate::domain::{ChainTask, TaskId, TaskSpec};
use crate::error::{Result, TaskError};
use lc_01_storage_overlay::{Partition, StorageContext, StorageContextExt};
use shared_types::Timestamp;
use tracing::{debug, info};

fn next_id_key() -> Vec<u8> {
    Partition::Tasks.key("next_id")
}

fn list_key() -> Vec<u8> {
    Partition::Tasks.key("list")
}

fn task_key(id: TaskId) -> Vec<u8> {
    Partition::Tasks.key(format!("task.{}", id))
}

fn run_key(id: TaskId) -> Vec<u8> {
    Partition::Tasks.key(format!("run.{}", id))
}

/// Key marking a custom contract as deployed.
pub fn contract_key(name: &str) -> Vec<u8> {
    Partition::Contracts.key(name)
}

/// Access to durable task state.
#[derive(Debug, Clone, Copy, Default)]
pub struct TaskStore;

impl TaskStore {
    pub fn new() -> Self {
        Self
    }

    pub fn is_contract_deployed(&self, storage: &dyn StorageContext, contract: &str) -> Result<bool> {
        Ok(storage.has(&contract_key(contract))?)
    }

    /// Create a task. Returns `None` when `spec.contract` is not deployed.
    pub fn start_task(
        &self,
        storage: &mut dyn StorageContext,
        spec: TaskSpec,
        height: u64,
        timestamp: Timestamp,
    ) -> Result<Option<ChainTask>> {
        if !self.is_contract_deployed(storage, &spec.contract)? {
            debug!(
                "[lc-03] Refusing task for {}.{}: contract not deployed",
                spec.contract, spec.method
            );
            return Ok(None);
        }

        let id: TaskId = storage.get_value(&next_id_key())?.unwrap_or(1);
        let next = id.checked_add(1).ok_or(TaskError::IdsExhausted)?;
        storage.put_value(&next_id_key(), &next)?;

        let task = ChainTask::new(id, spec, height, timestamp);
        storage.put_value(&task_key(id), &task)?;

        let mut ids = self.list(storage)?;
        ids.push(id);
        storage.put_value(&list_key(), &ids)?;

        info!(
            "[lc-03] Task {} started: {} every {} ({:?}) owned by {}",
            id,
            task.full_method(),
            task.frequency,
            task.mode,
            task.owner
        );
        Ok(Some(task))
    }

    /// Remove a task with its run marker. `false` if it did not exist.
    pub fn stop_task(&self, storage: &mut dyn StorageContext, id: TaskId) -> Result<bool> {
        if !storage.has(&task_key(id))? {
            return Ok(false);
        }

        storage.delete(&task_key(id));
        storage.delete(&run_key(id));

        let mut ids = self.list(storage)?;
        ids.retain(|existing| *existing != id);
        storage.put_value(&list_key(), &ids)?;

        info!("[lc-03] Task {} stopped", id);
        Ok(true)
    }

    pub fn get(&self, storage: &dyn StorageContext, id: TaskId) -> Result<Option<ChainTask>> {
        Ok(storage.get_value(&task_key(id))?)
    }

    /// Ids of live tasks in creation order.
    pub fn list(&self, storage: &dyn StorageContext) -> Result<Vec<TaskId>> {
        Ok(storage.get_value(&list_key())?.unwrap_or_default())
    }

    pub fn last_run(&self, storage: &dyn StorageContext, id: TaskId) -> Result<Option<u64>> {
        Ok(storage.get_value(&run_key(id))?)
    }

    pub fn set_last_run(&self, storage: &mut dyn StorageContext, id: TaskId, run: u64) -> Result<()> {
        storage.put_value(&run_key(id), &run)?;
        Ok(())
    }
}
