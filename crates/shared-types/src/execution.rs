//! # Execution Outcomes
//!
//! Terminal script states, script values and the per-transaction result
//! produced once per delivered transaction.

use crate::entities::{Address, Hash, U256};
use crate::errors::TypesError;
use crate::events::Event;
use serde::{Deserialize, Serialize};

/// Terminal state of a script execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExecutionState {
    Running,
    Break,
    /// Script raised an unrecoverable error; its writes are discarded.
    Fault,
    /// Script completed successfully; its writes are applied.
    Halt,
}

/// Value left on the script stack when execution ends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScriptValue {
    None,
    Bool(bool),
    Number(U256),
    String(String),
    Bytes(Vec<u8>),
    Address(Address),
}

impl ScriptValue {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ScriptValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<U256> {
        match self {
            ScriptValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_address(&self) -> Option<Address> {
        match self {
            ScriptValue::Address(a) => Some(*a),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ScriptValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, TypesError> {
        Ok(bincode::serialize(self)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, TypesError> {
        Ok(bincode::deserialize(bytes)?)
    }
}

/// Outcome of delivering one transaction. Never mutated after construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionResult {
    pub hash: Hash,
    pub state: ExecutionState,
    /// 0 on success.
    pub code: u32,
    /// Human-readable code space or fault message.
    pub codespace: String,
    pub gas_used: U256,
    pub events: Vec<Event>,
    pub result: Option<ScriptValue>,
}

impl TransactionResult {
    /// Code reported for any non-halting outcome.
    pub const FAULT_CODE: u32 = 1;

    /// Build a result from a terminal state. Halt maps to code 0.
    pub fn new(
        hash: Hash,
        state: ExecutionState,
        codespace: impl Into<String>,
        gas_used: U256,
        events: Vec<Event>,
        result: Option<ScriptValue>,
    ) -> Self {
        let code = if state == ExecutionState::Halt {
            0
        } else {
            Self::FAULT_CODE
        };
        Self {
            hash,
            state,
            code,
            codespace: codespace.into(),
            gas_used,
            events,
            result,
        }
    }

    /// A fault result carrying `message` as its code space.
    pub fn fault(hash: Hash, message: impl Into<String>) -> Self {
        Self::new(hash, ExecutionState::Fault, message, U256::zero(), Vec::new(), None)
    }

    pub fn is_success(&self) -> bool {
        self.code == 0
    }
}
