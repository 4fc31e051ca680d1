//! Outbound ports (driven side)
//!
//! Everything the chain consumes but does not implement: the script runtime,
//! the oracle reader and the multi-chain registry.

use lc_01_storage_overlay::StorageContext;
use lc_02_gas_extraction::{ContractAbi, TokenAbi};
use lc_03_task_scheduler::{ChainTask, TaskOutcome};
use shared_types::{
    Address, Event, ExecutionState, OracleEntry, ScriptValue, Timestamp, Transaction, U256,
};
use thiserror::Error;

/// Inputs of one script execution.
pub struct ExecutionContext<'a> {
    /// Position of the transaction in the open block.
    pub tx_index: u32,
    pub script: &'a [u8],
    /// Byte offset execution starts at.
    pub offset: usize,
    pub chain_name: &'a str,
    pub height: u64,
    pub validator: Address,
    pub timestamp: Timestamp,
    pub tx: &'a Transaction,
    /// Transaction-local snapshot; discarded unless execution halts.
    pub storage: &'a mut dyn StorageContext,
    pub oracle: &'a mut dyn OracleReader,
    /// Task being run, `None` for user transactions.
    pub task: Option<&'a ChainTask>,
}

/// Terminal outcome of one script execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionResult {
    pub state: ExecutionState,
    pub events: Vec<Event>,
    pub gas_used: U256,
    /// Top of the stack on halt.
    pub result: Option<ScriptValue>,
    pub fault_message: Option<String>,
    /// Reported by task handlers only.
    pub task_outcome: Option<TaskOutcome>,
}

impl ExecutionResult {
    pub fn halt(events: Vec<Event>, gas_used: U256, result: Option<ScriptValue>) -> Self {
        Self {
            state: ExecutionState::Halt,
            events,
            gas_used,
            result,
            fault_message: None,
            task_outcome: None,
        }
    }

    pub fn fault(message: impl Into<String>, gas_used: U256) -> Self {
        Self {
            state: ExecutionState::Fault,
            events: Vec::new(),
            gas_used,
            result: None,
            fault_message: Some(message.into()),
            task_outcome: None,
        }
    }

    pub fn with_task_outcome(mut self, outcome: TaskOutcome) -> Self {
        self.task_outcome = Some(outcome);
        self
    }
}

/// The runtime aborted without producing a terminal state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct RuntimeError(pub String);

/// Port: bytecode interpreter
pub trait ScriptRuntime: Send + Sync {
    fn execute(&self, ctx: ExecutionContext<'_>) -> Result<ExecutionResult, RuntimeError>;
}

/// Port: external data reads during execution
pub trait OracleReader: Send {
    /// Read `url` for the running transaction. The read is staged until the
    /// transaction ends.
    fn read(&mut self, url: &str) -> Option<Vec<u8>>;

    /// Keep the reads of the transaction that just halted.
    fn merge_tx_data(&mut self);

    /// Drop the reads of a transaction that did not halt.
    fn discard_tx_data(&mut self) {}

    /// Reads kept so far in this block.
    fn entries(&self) -> Vec<OracleEntry>;

    /// Forget everything; called once the entries are attached to a block.
    fn clear(&mut self);
}

/// Port: multi-chain registry and governance
pub trait Nexus: Send + Sync {
    fn name(&self) -> &str;

    /// Name of the chain that applies inflation.
    fn root_chain_name(&self) -> &str;

    fn protocol_version(&self) -> u32;

    fn has_genesis(&self) -> bool;

    /// Receives block rewards before genesis.
    fn genesis_address(&self) -> Address;

    /// Governance-configured minimum gas price.
    fn minimum_fee(&self) -> U256;

    /// Map a consensus proposer id to a validator.
    fn validator_by_proposer(&self, proposer: &str) -> Option<Address>;

    /// Active primary validators, in rank order.
    fn primary_validators(&self) -> Vec<Address>;

    fn is_known_validator(&self, address: &Address) -> bool;

    /// ABIs of deployed custom contracts.
    fn contracts(&self) -> Vec<ContractAbi>;

    /// ABIs of registered tokens.
    fn tokens(&self) -> Vec<TokenAbi>;
}
