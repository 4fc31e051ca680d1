//! Task entities.

use serde::{Deserialize, Serialize};
use shared_types::{Address, Timestamp, U256};

/// Chain-unique task identifier.
pub type TaskId = u64;

/// What "current run" is measured in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskFrequencyMode {
    /// Every block, no rate tracking.
    Always,
    /// Frequency and delay count blocks.
    Blocks,
    /// Frequency and delay count seconds.
    Time,
}

/// Parameters of a task to start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskSpec {
    pub owner: Address,
    pub contract: String,
    pub method: String,
    pub frequency: u64,
    pub delay: u64,
    pub mode: TaskFrequencyMode,
    pub gas_limit: U256,
}

/// A recurring contract call run by the chain itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainTask {
    pub id: TaskId,
    pub owner: Address,
    pub contract: String,
    pub method: String,
    pub frequency: u64,
    pub delay: u64,
    pub mode: TaskFrequencyMode,
    pub gas_limit: U256,
    /// Height of the block the task was created in.
    pub height: u64,
    /// Timestamp of the block the task was created in.
    pub created_at: Timestamp,
    pub active: bool,
}

impl ChainTask {
    pub fn new(id: TaskId, spec: TaskSpec, height: u64, created_at: Timestamp) -> Self {
        Self {
            id,
            owner: spec.owner,
            contract: spec.contract,
            method: spec.method,
            frequency: spec.frequency,
            delay: spec.delay,
            mode: spec.mode,
            gas_limit: spec.gas_limit,
            height,
            created_at,
            active: true,
        }
    }

    /// The run counter for this block in the task's own unit.
    pub fn current_run(&self, height: u64, timestamp: Timestamp) -> u64 {
        match self.mode {
            TaskFrequencyMode::Time => timestamp,
            TaskFrequencyMode::Always | TaskFrequencyMode::Blocks => height,
        }
    }

    /// The creation point in the task's own unit.
    pub fn creation_run(&self) -> u64 {
        match self.mode {
            TaskFrequencyMode::Time => self.created_at,
            TaskFrequencyMode::Always | TaskFrequencyMode::Blocks => self.height,
        }
    }

    /// `contract.method`
    pub fn full_method(&self) -> String {
        format!("{}.{}", self.contract, self.method)
    }
}

/// What a task handler reported after running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskOutcome {
    /// Run again at the next due block.
    KeepRunning,
    /// Done; remove the task.
    Finished,
    /// Execution failed; remove the task.
    Crashed,
}
