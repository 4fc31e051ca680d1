//! # Ledger Events
//!
//! Events are emitted by scripts during execution and by the chain itself
//! when a block closes. They are stored in blocks and drive the
//! address-to-transaction index.

use crate::entities::{Address, U256};
use crate::errors::TypesError;
use serde::{Deserialize, Serialize};

/// Kind of a ledger event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    /// Fee payer locked gas in escrow.
    GasEscrow,
    /// Escrowed gas was paid out.
    GasPayment,
    TokenSend,
    TokenReceive,
    /// Tokens credited without a matching send (block rewards).
    TokenClaim,
    TokenMint,
    TokenBurn,
    TokenCreate,
    /// The block validator differs from the previous block's.
    ValidatorSwitch,
    ContractDeploy,
    ContractUpgrade,
    ContractKill,
    TaskStart,
    TaskStop,
    /// Application-defined event.
    Custom(u16),
}

impl EventKind {
    /// Kinds that change which methods exist on chain.
    pub fn alters_method_table(&self) -> bool {
        matches!(
            self,
            EventKind::ContractDeploy
                | EventKind::ContractUpgrade
                | EventKind::ContractKill
                | EventKind::TokenCreate
        )
    }
}

/// An event emitted during execution or block closing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub kind: EventKind,
    /// Address the event concerns.
    pub address: Address,
    /// Name of the emitting contract.
    pub contract: String,
    /// Kind-specific payload.
    pub data: Vec<u8>,
}

impl Event {
    pub fn new(kind: EventKind, address: Address, contract: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            kind,
            address,
            contract: contract.into(),
            data,
        }
    }

    /// Decode the payload of a token event.
    pub fn token_data(&self) -> Result<TokenEventData, TypesError> {
        Ok(bincode::deserialize(&self.data)?)
    }
}

/// Payload of token events (`TokenClaim`, `TokenSend`, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenEventData {
    pub symbol: String,
    pub value: U256,
    pub chain_name: String,
}

impl TokenEventData {
    pub fn to_bytes(&self) -> Result<Vec<u8>, TypesError> {
        Ok(bincode::serialize(self)?)
    }
}
