//! # Consensus Application
//!
//! ABCI-shaped driver over [`Chain`]. Admission verdicts and execution
//! results become plain response values; a [`FatalError`] is handed to the
//! [`HaltHandler`] and the application refuses every later call.

use crate::chain::Chain;
use crate::domain::ValidatorUpdate;
use crate::error::FatalError;
use shared_types::{
    hash_to_hex, Address, CodeType, Event, Hash, Timestamp, Transaction, TransactionResult, U256,
};
use std::sync::Arc;
use tracing::error;

/// Reaction to a consistency violation.
pub trait HaltHandler: Send + Sync {
    fn halt(&self, error: &FatalError);
}

/// Log the cause and exit the process.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessExit;

impl HaltHandler for ProcessExit {
    fn halt(&self, err: &FatalError) {
        error!("[lc-04] Fatal: {}. Halting node", err);
        std::process::exit(1);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestBeginBlock {
    /// Consensus identity of the proposer.
    pub proposer: String,
    pub height: u64,
    pub minimum_fee: U256,
    pub timestamp: Timestamp,
    pub validators: Vec<Address>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseBeginBlock {
    /// System transactions to broadcast.
    pub transactions: Vec<Transaction>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseCheckTx {
    pub code: u32,
    pub log: String,
}

impl ResponseCheckTx {
    pub fn is_ok(&self) -> bool {
        self.code == CodeType::Ok.code()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseDeliverTx {
    pub code: u32,
    pub codespace: String,
    pub gas_used: U256,
    pub events: Vec<Event>,
    /// Encoded return value, empty unless the transaction halted.
    pub data: Vec<u8>,
}

impl ResponseDeliverTx {
    fn from_result(result: TransactionResult) -> Self {
        let data = result
            .result
            .as_ref()
            .and_then(|value| value.to_bytes().ok())
            .unwrap_or_default();
        Self {
            code: result.code,
            codespace: result.codespace,
            gas_used: result.gas_used,
            events: result.events,
            data,
        }
    }

    fn rejected(log: String) -> Self {
        Self {
            code: CodeType::Error.code(),
            codespace: log,
            gas_used: U256::zero(),
            events: Vec::new(),
            data: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseEndBlock {
    pub height: u64,
    pub validator_updates: Vec<ValidatorUpdate>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseCommit {
    /// Hash of the committed block.
    pub data: Hash,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseInfo {
    pub last_block_height: u64,
    pub last_block_hash: Option<Hash>,
}

pub struct ConsensusApp {
    chain: Chain,
    halt: Arc<dyn HaltHandler>,
    halted: bool,
}

impl ConsensusApp {
    pub fn new(chain: Chain) -> Self {
        Self {
            chain,
            halt: Arc::new(ProcessExit),
            halted: false,
        }
    }

    pub fn with_halt_handler(mut self, halt: Arc<dyn HaltHandler>) -> Self {
        self.halt = halt;
        self
    }

    pub fn chain(&self) -> &Chain {
        &self.chain
    }

    /// True once a fatal error was handed to the halt handler.
    pub fn is_halted(&self) -> bool {
        self.halted
    }

    fn fatal(&mut self, err: FatalError) {
        error!("[lc-04] Consistency violation on {}: {}", self.chain.name(), err);
        self.halted = true;
        self.halt.halt(&err);
    }

    pub fn info(&self) -> ResponseInfo {
        match (self.chain.height(), self.chain.last_block_hash()) {
            (Ok(height), Ok(hash)) => ResponseInfo {
                last_block_height: height,
                last_block_hash: hash,
            },
            (Err(err), _) | (_, Err(err)) => {
                error!("[lc-04] Info query failed: {}", err);
                ResponseInfo {
                    last_block_height: 0,
                    last_block_hash: None,
                }
            }
        }
    }

    pub fn begin_block(&mut self, request: RequestBeginBlock) -> Option<ResponseBeginBlock> {
        if self.halted {
            return None;
        }
        match self.chain.begin_block(
            &request.proposer,
            request.height,
            request.minimum_fee,
            request.timestamp,
            &request.validators,
        ) {
            Ok(transactions) => Some(ResponseBeginBlock { transactions }),
            Err(err) => {
                self.fatal(err);
                None
            }
        }
    }

    pub fn check_tx(&self, tx: &Transaction, timestamp: Timestamp) -> ResponseCheckTx {
        if self.halted {
            return ResponseCheckTx {
                code: CodeType::Error.code(),
                log: "Node halted".to_string(),
            };
        }
        let verdict = self.chain.check_tx(tx, timestamp);
        ResponseCheckTx {
            code: verdict.code.code(),
            log: verdict.message,
        }
    }

    pub fn deliver_tx(&mut self, tx: Transaction) -> ResponseDeliverTx {
        if self.halted {
            return ResponseDeliverTx::rejected("Node halted".to_string());
        }
        let hash = tx.hash();
        match self.chain.deliver_tx(tx) {
            Ok(result) => ResponseDeliverTx::from_result(result),
            Err(err) => {
                error!("[lc-04] DeliverTx {} refused: {}", hash_to_hex(&hash), err);
                ResponseDeliverTx::rejected(err.to_string())
            }
        }
    }

    pub fn end_block(&mut self) -> Option<ResponseEndBlock> {
        if self.halted {
            return None;
        }
        match self.chain.end_block() {
            Ok(outcome) => Some(ResponseEndBlock {
                height: outcome.block.height,
                validator_updates: outcome.validator_updates,
            }),
            Err(err) => {
                error!("[lc-04] EndBlock refused: {}", err);
                None
            }
        }
    }

    pub fn commit(&mut self) -> Option<ResponseCommit> {
        if self.halted {
            return None;
        }
        match self.chain.commit() {
            Ok(hash) => Some(ResponseCommit { data: hash }),
            Err(err) => {
                self.fatal(err);
                None
            }
        }
    }
}
