//! # Core Domain Entities
//!
//! ## Clusters
//!
//! - **Identity**: `Hash`, `Address`, `TxSignature`
//! - **Chain**: `Transaction`, `Block`, `OracleEntry`

use crate::errors::TypesError;
use crate::events::Event;
use crate::execution::ExecutionState;
use ed25519_dalek::{Signer, SigningKey, Verifier, VerifyingKey};
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, Bytes};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

// Re-export U256 from primitive-types for use across all subsystems
pub use primitive_types::U256;

// =============================================================================
// CLUSTER A: IDENTITY
// =============================================================================

/// A 32-byte SHA-256 digest.
pub type Hash = [u8; 32];

/// Unix timestamp in seconds since epoch.
pub type Timestamp = u64;

/// The null hash, used as the previous hash of the first block.
pub const NULL_HASH: Hash = [0u8; 32];

/// Compute the SHA-256 digest of `data`.
pub fn sha256(data: &[u8]) -> Hash {
    let digest = Sha256::digest(data);
    let mut hash = [0u8; 32];
    hash.copy_from_slice(&digest);
    hash
}

/// Render a hash as lowercase hex.
pub fn hash_to_hex(hash: &Hash) -> String {
    hex::encode(hash)
}

/// Address length: one kind byte followed by a 20-byte digest.
pub const ADDRESS_LEN: usize = 21;

/// Distinguishes key-controlled accounts from name-derived system accounts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AddressKind {
    /// The all-zero address.
    Null,
    /// Derived from an ed25519 public key.
    User,
    /// Derived from a name (chains, contracts, escrow pots).
    System,
}

impl AddressKind {
    fn tag(self) -> u8 {
        match self {
            AddressKind::Null => 0,
            AddressKind::User => 1,
            AddressKind::System => 2,
        }
    }
}

/// A ledger address.
///
/// Displayed as `0x` followed by 42 hex characters (kind byte + digest).
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
pub struct Address([u8; ADDRESS_LEN]);

impl Address {
    /// The null address.
    pub const fn null() -> Self {
        Address([0u8; ADDRESS_LEN])
    }

    fn with_digest(kind: AddressKind, data: &[u8]) -> Self {
        let digest = sha256(data);
        let mut bytes = [0u8; ADDRESS_LEN];
        bytes[0] = kind.tag();
        bytes[1..].copy_from_slice(&digest[..ADDRESS_LEN - 1]);
        Address(bytes)
    }

    /// Derive the user address controlled by an ed25519 public key.
    pub fn from_public_key(public_key: &[u8; 32]) -> Self {
        Self::with_digest(AddressKind::User, public_key)
    }

    /// Derive the system address for a name (chain, contract, pot).
    pub fn from_name(name: &str) -> Self {
        Self::with_digest(AddressKind::System, name.as_bytes())
    }

    /// Build from raw bytes.
    pub fn from_bytes(bytes: [u8; ADDRESS_LEN]) -> Result<Self, TypesError> {
        match bytes[0] {
            0 if bytes.iter().all(|b| *b == 0) => Ok(Address(bytes)),
            1 | 2 => Ok(Address(bytes)),
            _ => Err(TypesError::InvalidAddress(hex::encode(bytes))),
        }
    }

    /// Raw bytes.
    pub fn as_bytes(&self) -> &[u8; ADDRESS_LEN] {
        &self.0
    }

    pub fn kind(&self) -> AddressKind {
        match self.0[0] {
            1 => AddressKind::User,
            2 => AddressKind::System,
            _ => AddressKind::Null,
        }
    }

    pub fn is_null(&self) -> bool {
        self.kind() == AddressKind::Null
    }

    pub fn is_system(&self) -> bool {
        self.kind() == AddressKind::System
    }

    pub fn is_user(&self) -> bool {
        self.kind() == AddressKind::User
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self)
    }
}

impl FromStr for Address {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s
            .strip_prefix("0x")
            .ok_or_else(|| TypesError::InvalidAddress(s.to_string()))?;
        let raw = hex::decode(digits).map_err(|_| TypesError::InvalidAddress(s.to_string()))?;
        let bytes: [u8; ADDRESS_LEN] = raw
            .try_into()
            .map_err(|_| TypesError::InvalidAddress(s.to_string()))?;
        Address::from_bytes(bytes)
    }
}

/// An ed25519 signature together with the signer's public key.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxSignature {
    /// Signer's ed25519 public key.
    pub public_key: [u8; 32],
    /// Signature over the signed content hash.
    #[serde_as(as = "Bytes")]
    pub signature: [u8; 64],
}

impl TxSignature {
    /// Sign `message` with `key`.
    pub fn create(key: &SigningKey, message: &[u8]) -> Self {
        Self {
            public_key: key.verifying_key().to_bytes(),
            signature: key.sign(message).to_bytes(),
        }
    }

    /// Address of the signer.
    pub fn signer(&self) -> Address {
        Address::from_public_key(&self.public_key)
    }

    /// Verify this signature over `message`.
    pub fn verify(&self, message: &[u8]) -> Result<(), TypesError> {
        let key =
            VerifyingKey::from_bytes(&self.public_key).map_err(|_| TypesError::InvalidPublicKey)?;
        let sig = ed25519_dalek::Signature::from_bytes(&self.signature);
        key.verify(message, &sig)
            .map_err(|_| TypesError::InvalidSignature)
    }
}

// =============================================================================
// CLUSTER B: THE CHAIN
// =============================================================================

/// A transaction: a script targeted at one chain, plus signatures.
///
/// The hash covers every field except the signatures, so signatures can be
/// appended without changing identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Name of the ledger the transaction originates from.
    pub sender_chain: String,
    /// Name of the chain that must execute the script.
    pub target_chain: String,
    /// Bytecode executed by the script runtime.
    pub script: Vec<u8>,
    /// Latest timestamp at which the transaction may be included.
    pub expiration: Timestamp,
    /// Free-form payload ("SYSTEM", "TASK", user memo).
    pub payload: Vec<u8>,
    /// Explicit fee payer (protocol 13 and later).
    pub gas_payer: Option<Address>,
    /// Explicit fee target (protocol 13 and later).
    pub gas_target: Option<Address>,
    /// Explicit gas price (protocol 13 and later).
    pub gas_price: Option<U256>,
    /// Explicit gas limit (protocol 13 and later).
    pub gas_limit: Option<U256>,
    /// Signatures over the transaction hash.
    pub signatures: Vec<TxSignature>,
}

#[derive(Serialize)]
struct UnsignedTransaction<'a> {
    sender_chain: &'a str,
    target_chain: &'a str,
    script: &'a [u8],
    expiration: Timestamp,
    payload: &'a [u8],
    gas_payer: &'a Option<Address>,
    gas_target: &'a Option<Address>,
    gas_price: &'a Option<U256>,
    gas_limit: &'a Option<U256>,
}

impl Transaction {
    /// Create an unsigned transaction without explicit gas fields.
    pub fn new(
        sender_chain: impl Into<String>,
        target_chain: impl Into<String>,
        script: Vec<u8>,
        expiration: Timestamp,
        payload: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            sender_chain: sender_chain.into(),
            target_chain: target_chain.into(),
            script,
            expiration,
            payload: payload.into(),
            gas_payer: None,
            gas_target: None,
            gas_price: None,
            gas_limit: None,
            signatures: Vec::new(),
        }
    }

    /// Declare the fee parameters explicitly instead of through the script.
    pub fn with_gas(mut self, payer: Address, target: Address, price: U256, limit: U256) -> Self {
        self.gas_payer = Some(payer);
        self.gas_target = Some(target);
        self.gas_price = Some(price);
        self.gas_limit = Some(limit);
        self
    }

    /// Content hash (signatures excluded).
    pub fn hash(&self) -> Hash {
        let unsigned = UnsignedTransaction {
            sender_chain: &self.sender_chain,
            target_chain: &self.target_chain,
            script: &self.script,
            expiration: self.expiration,
            payload: &self.payload,
            gas_payer: &self.gas_payer,
            gas_target: &self.gas_target,
            gas_price: &self.gas_price,
            gas_limit: &self.gas_limit,
        };
        // Encoding plain structs into a Vec cannot fail.
        let bytes = bincode::serialize(&unsigned).unwrap_or_default();
        sha256(&bytes)
    }

    /// Append a signature made with `key`.
    pub fn sign(&mut self, key: &SigningKey) {
        let hash = self.hash();
        self.signatures.push(TxSignature::create(key, &hash));
    }

    pub fn has_signatures(&self) -> bool {
        !self.signatures.is_empty()
    }

    /// True when a valid signature by `address` is attached.
    pub fn is_signed_by(&self, address: &Address) -> bool {
        let hash = self.hash();
        self.signatures
            .iter()
            .any(|sig| sig.signer() == *address && sig.verify(&hash).is_ok())
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, TypesError> {
        Ok(bincode::serialize(self)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, TypesError> {
        Ok(bincode::deserialize(bytes)?)
    }
}

/// External data read by scripts during execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OracleEntry {
    /// Oracle URL that was read.
    pub url: String,
    /// Content returned for the URL.
    pub content: Vec<u8>,
}

/// A block of the ledger.
///
/// Mutated only while the chain keeps it open (DeliverTx records per-tx
/// outcomes, closing adds reward events); immutable once committed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    /// Height, starting at 1.
    pub height: u64,
    /// Address of the chain that produced the block.
    pub chain_address: Address,
    /// Consensus timestamp.
    pub timestamp: Timestamp,
    /// Hash of the previous block (`NULL_HASH` at height 1).
    pub previous_hash: Hash,
    /// Protocol version active when the block was opened.
    pub protocol: u32,
    /// Validator that proposed the block.
    pub validator: Address,
    /// Hashes of the delivered transactions, in delivery order.
    pub transaction_hashes: Vec<Hash>,
    /// Terminal execution state per transaction hash.
    pub tx_states: BTreeMap<Hash, ExecutionState>,
    /// Serialized return value per successful transaction hash.
    pub tx_results: BTreeMap<Hash, Vec<u8>>,
    /// Events emitted per successful transaction hash.
    pub tx_events: BTreeMap<Hash, Vec<Event>>,
    /// Block-level events (validator switch, reward claims).
    pub events: Vec<Event>,
    /// Oracle reads performed while the block was open.
    pub oracle_entries: Vec<OracleEntry>,
    /// Validator signature over the block hash.
    pub signature: Option<TxSignature>,
}

#[derive(Serialize)]
struct UnsignedBlock<'a> {
    height: u64,
    chain_address: &'a Address,
    timestamp: Timestamp,
    previous_hash: &'a Hash,
    protocol: u32,
    validator: &'a Address,
    transaction_hashes: &'a [Hash],
    tx_states: &'a BTreeMap<Hash, ExecutionState>,
    tx_results: &'a BTreeMap<Hash, Vec<u8>>,
    tx_events: &'a BTreeMap<Hash, Vec<Event>>,
    events: &'a [Event],
    oracle_entries: &'a [OracleEntry],
}

impl Block {
    /// Open a new, empty block.
    pub fn new(
        height: u64,
        chain_address: Address,
        timestamp: Timestamp,
        previous_hash: Hash,
        protocol: u32,
        validator: Address,
    ) -> Self {
        Self {
            height,
            chain_address,
            timestamp,
            previous_hash,
            protocol,
            validator,
            transaction_hashes: Vec::new(),
            tx_states: BTreeMap::new(),
            tx_results: BTreeMap::new(),
            tx_events: BTreeMap::new(),
            events: Vec::new(),
            oracle_entries: Vec::new(),
            signature: None,
        }
    }

    /// Content hash (signature excluded).
    pub fn hash(&self) -> Hash {
        let unsigned = UnsignedBlock {
            height: self.height,
            chain_address: &self.chain_address,
            timestamp: self.timestamp,
            previous_hash: &self.previous_hash,
            protocol: self.protocol,
            validator: &self.validator,
            transaction_hashes: &self.transaction_hashes,
            tx_states: &self.tx_states,
            tx_results: &self.tx_results,
            tx_events: &self.tx_events,
            events: &self.events,
            oracle_entries: &self.oracle_entries,
        };
        let bytes = bincode::serialize(&unsigned).unwrap_or_default();
        sha256(&bytes)
    }

    pub fn add_transaction_hash(&mut self, hash: Hash) {
        self.transaction_hashes.push(hash);
    }

    pub fn set_state_for_hash(&mut self, hash: Hash, state: ExecutionState) {
        self.tx_states.insert(hash, state);
    }

    pub fn state_for_hash(&self, hash: &Hash) -> Option<ExecutionState> {
        self.tx_states.get(hash).copied()
    }

    pub fn set_result_for_hash(&mut self, hash: Hash, result: Vec<u8>) {
        self.tx_results.insert(hash, result);
    }

    pub fn result_for_hash(&self, hash: &Hash) -> Option<&[u8]> {
        self.tx_results.get(hash).map(Vec::as_slice)
    }

    pub fn add_events_for_hash(&mut self, hash: Hash, events: Vec<Event>) {
        if !events.is_empty() {
            self.tx_events.entry(hash).or_default().extend(events);
        }
    }

    pub fn events_for_hash(&self, hash: &Hash) -> &[Event] {
        self.tx_events.get(hash).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Record a block-level event.
    pub fn notify(&mut self, event: Event) {
        self.events.push(event);
    }

    pub fn add_oracle_entries(&mut self, entries: impl IntoIterator<Item = OracleEntry>) {
        self.oracle_entries.extend(entries);
    }

    /// Sign the block hash.
    pub fn sign(&mut self, key: &SigningKey) {
        let hash = self.hash();
        self.signature = Some(TxSignature::create(key, &hash));
    }

    pub fn is_signed(&self) -> bool {
        self.signature.is_some()
    }

    /// Verify the attached signature was made by the block validator.
    pub fn verify_signature(&self) -> Result<(), TypesError> {
        let signature = self.signature.as_ref().ok_or(TypesError::InvalidSignature)?;
        if signature.signer() != self.validator {
            return Err(TypesError::InvalidSignature);
        }
        signature.verify(&self.hash())
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, TypesError> {
        Ok(bincode::serialize(self)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, TypesError> {
        Ok(bincode::deserialize(bytes)?)
    }
}
