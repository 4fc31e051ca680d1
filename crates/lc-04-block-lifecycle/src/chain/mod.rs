//! # Chain
//!
//! One ledger partition driven through the block lifecycle:
//!
//! ```text
//! begin_block ──► deliver_tx* ──► end_block ──► commit
//!      │               │                          │
//!  open changeset   per-tx snapshot          close_block + persist
//! ```
//!
//! At most one block is open at a time. The open block exclusively owns its
//! [`StorageChangeSet`]; nothing reaches the durable store before `commit`.

mod admission;
mod commit;
mod execution;
mod queries;

pub use admission::CheckTxResult;
pub use commit::BLOCK_ESCROW;

use crate::adapters::BufferedOracle;
use crate::config::ChainConfig;
use crate::domain::{diff_validators, RedFilter, ValidatorUpdate};
use crate::error::{ChainError, FatalError, Result};
use crate::metrics::ChainMetrics;
use crate::ports::{Nexus, OracleReader, ScriptRuntime};
use execution::TaskRun;
use ed25519_dalek::SigningKey;
use lc_01_storage_overlay::{
    Compressor, Partition, SharedStore, StorageChangeSet, StorageContext, StorageContextExt,
};
use lc_02_gas_extraction::{MethodTable, MethodTableCache, ScriptBuilder};
use lc_03_task_scheduler::{BlockContext, TaskScheduler};
use shared_types::{Address, Block, ScriptValue, Timestamp, Transaction, NULL_HASH, U256};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Payload tagging chain-generated system transactions.
pub const SYSTEM_PAYLOAD: &[u8] = b"SYSTEM";

/// Seconds a system transaction stays valid.
const SYSTEM_TX_LIFETIME: u64 = 300;

/// The block being built, with everything that goes with it.
pub(crate) struct OpenBlock {
    pub(crate) block: Block,
    pub(crate) changeset: StorageChangeSet,
    pub(crate) transactions: Vec<Transaction>,
    /// Set once rewards are distributed; no more transactions after that.
    pub(crate) closed: bool,
}

/// What EndBlock reports back to consensus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndBlockOutcome {
    pub validator_updates: Vec<ValidatorUpdate>,
    pub block: Block,
}

pub struct Chain {
    name: String,
    address: Address,
    nexus: Arc<dyn Nexus>,
    signing_key: Option<SigningKey>,
    open: Option<OpenBlock>,
    store: SharedStore,
    runtime: Arc<dyn ScriptRuntime>,
    oracle: Box<dyn OracleReader>,
    config: ChainConfig,
    metrics: Arc<ChainMetrics>,
    red_filter: RedFilter,
    method_cache: MethodTableCache,
    method_table_dirty: bool,
    last_validators: Option<Vec<Address>>,
    compressor: Box<dyn Compressor>,
    scheduler: TaskScheduler,
}

impl Chain {
    pub fn new(
        name: impl Into<String>,
        nexus: Arc<dyn Nexus>,
        store: SharedStore,
        runtime: Arc<dyn ScriptRuntime>,
        config: ChainConfig,
    ) -> Self {
        let name = name.into();
        info!("[lc-04] Initializing chain {}", name);
        info!("  Fuel token: {}", config.fuel_token_symbol);
        info!("  Red filter: {}", config.red_filter.enabled);

        let red_filter = RedFilter::new(Arc::clone(&store), config.red_filter.enabled);
        let compressor = config.compression.to_compression_config().build();

        Self {
            address: Address::from_name(&name),
            name,
            nexus,
            signing_key: None,
            open: None,
            store,
            runtime,
            oracle: Box::new(BufferedOracle::new()),
            config,
            metrics: Arc::new(ChainMetrics::new()),
            red_filter,
            method_cache: MethodTableCache::new(),
            method_table_dirty: false,
            last_validators: None,
            compressor,
            scheduler: TaskScheduler::new(),
        }
    }

    /// Key this node signs blocks and system transactions with.
    pub fn with_signing_key(mut self, key: SigningKey) -> Self {
        self.signing_key = Some(key);
        self
    }

    pub fn with_oracle(mut self, oracle: Box<dyn OracleReader>) -> Self {
        self.oracle = oracle;
        self
    }

    /// Share counters with the host.
    pub fn with_metrics(mut self, metrics: Arc<ChainMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn config(&self) -> &ChainConfig {
        &self.config
    }

    pub fn metrics(&self) -> &Arc<ChainMetrics> {
        &self.metrics
    }

    pub fn red_filter(&self) -> &RedFilter {
        &self.red_filter
    }

    pub fn red_filter_mut(&mut self) -> &mut RedFilter {
        &mut self.red_filter
    }

    pub fn store(&self) -> &SharedStore {
        &self.store
    }

    /// Address of this node's signing key, if it has one.
    pub fn node_address(&self) -> Option<Address> {
        self.signing_key
            .as_ref()
            .map(|key| Address::from_public_key(&key.verifying_key().to_bytes()))
    }

    pub fn has_open_block(&self) -> bool {
        self.open.is_some()
    }

    pub fn current_block(&self) -> Option<&Block> {
        self.open.as_ref().map(|open| &open.block)
    }

    /// Transactions delivered into the open block, in order.
    pub fn pending_transactions(&self) -> &[Transaction] {
        self.open
            .as_ref()
            .map(|open| open.transactions.as_slice())
            .unwrap_or(&[])
    }

    /// Point-in-time copy of the open block's changeset.
    pub fn open_changeset(&self) -> Option<StorageChangeSet> {
        self.open.as_ref().map(|open| open.changeset.clone())
    }

    /// Method table for disassembly, rebuilt only after invalidation.
    pub fn method_table(&self) -> Arc<MethodTable> {
        self.method_cache.get_or_build(|| {
            let contracts = self.nexus.contracts();
            let tokens = self.nexus.tokens();
            let table =
                MethodTable::build(&contracts, &tokens, &self.config.staking_token_symbol);
            debug!("[lc-04] Method table rebuilt with {} entries", table.len());
            table
        })
    }

    /// Drop the cached method table; the next use rebuilds it.
    pub fn invalidate_method_table(&self) {
        self.method_cache.invalidate();
    }

    /// Open block `height` and run the due system work.
    ///
    /// Returns the system transactions to broadcast: the inflation
    /// transaction (root chain only) followed by the executed task
    /// transactions.
    pub fn begin_block(
        &mut self,
        proposer: &str,
        height: u64,
        minimum_fee: U256,
        timestamp: Timestamp,
        available_validators: &[Address],
    ) -> std::result::Result<Vec<Transaction>, FatalError> {
        if let Some(open) = &self.open {
            return Err(FatalError::BlockAlreadyOpen {
                height,
                open: open.block.height,
            });
        }

        let validator = self
            .resolve_validator(proposer, available_validators)
            .ok_or_else(|| FatalError::UnknownValidator(proposer.to_string()))?;

        let expected_height = self.height()? + 1;
        if height != expected_height {
            return Err(FatalError::BlockMismatch {
                field: "height",
                detail: format!("expected {}, found {}", expected_height, height),
            });
        }
        let previous_hash = self.last_block_hash()?.unwrap_or(NULL_HASH);
        let protocol = self.nexus.protocol_version();

        let mut open = OpenBlock {
            block: Block::new(height, self.address, timestamp, previous_hash, protocol, validator),
            changeset: StorageChangeSet::new(Arc::clone(&self.store)),
            transactions: Vec::new(),
            closed: false,
        };
        info!(
            "[lc-04] Block {} opened on {} by {}",
            height, self.name, validator
        );

        let mut system_transactions = Vec::new();
        if self.name == self.nexus.root_chain_name() && is_inflation_ready(&open.changeset)? {
            if let Some(tx) = self.inflation_transaction(validator, minimum_fee, timestamp, protocol) {
                system_transactions.push(tx);
            }
        }

        let ctx = BlockContext {
            chain_name: self.name.clone(),
            height,
            timestamp,
            minimum_fee,
        };
        let scheduler = self.scheduler;
        let mut run = TaskRun::new(self, &mut open);
        let report = scheduler.process_block(&mut run, &ctx)?;
        system_transactions.extend(run.into_transactions());

        self.metrics
            .record_tasks(report.executed.len(), report.removed.len());
        if !report.executed.is_empty() {
            info!(
                "[lc-04] Block {}: {} task(s) executed, {} removed",
                height,
                report.executed.len(),
                report.removed.len()
            );
        }

        self.open = Some(open);
        Ok(system_transactions)
    }

    /// Attach the oracle reads, apply deferred cache invalidation and report
    /// validator set changes.
    pub fn end_block(&mut self) -> Result<EndBlockOutcome> {
        let entries = self.oracle.entries();
        let open = self.open.as_mut().ok_or(ChainError::NoOpenBlock)?;
        open.block.add_oracle_entries(entries);
        self.oracle.clear();

        if self.method_table_dirty {
            self.method_cache.invalidate();
            self.method_table_dirty = false;
            debug!("[lc-04] Method table invalidated at block {}", open.block.height);
        }

        let current = self.nexus.primary_validators();
        let validator_updates = match self.last_validators.replace(current.clone()) {
            Some(previous) => diff_validators(&previous, &current),
            None => Vec::new(),
        };
        if !validator_updates.is_empty() {
            info!(
                "[lc-04] Validator set changed: {} update(s)",
                validator_updates.len()
            );
        }

        Ok(EndBlockOutcome {
            validator_updates,
            block: open.block.clone(),
        })
    }

    /// Registry lookup first, then the caller's list by address hex.
    fn resolve_validator(&self, proposer: &str, available: &[Address]) -> Option<Address> {
        if let Some(address) = self.nexus.validator_by_proposer(proposer) {
            return Some(address);
        }
        let wanted = proposer.trim();
        let wanted = wanted.strip_prefix("0x").unwrap_or(wanted).to_ascii_lowercase();
        available
            .iter()
            .copied()
            .find(|address| hex::encode(address.as_bytes()) == wanted)
    }

    fn inflation_transaction(
        &self,
        validator: Address,
        minimum_fee: U256,
        timestamp: Timestamp,
        protocol: u32,
    ) -> Option<Transaction> {
        let key = match &self.signing_key {
            Some(key) if self.node_address() == Some(validator) => key,
            _ => {
                warn!(
                    "[lc-04] Inflation is due but this node cannot sign for {}",
                    validator
                );
                return None;
            }
        };

        let script = ScriptBuilder::new()
            .allow_gas(
                validator,
                Address::null(),
                minimum_fee,
                self.config.inflation_gas_limit(protocol),
            )
            .call_contract("gas", "ApplyInflation", vec![ScriptValue::Address(validator)])
            .spend_gas(validator)
            .end_script();

        let mut tx = Transaction::new(
            self.name.clone(),
            self.name.clone(),
            script,
            timestamp + SYSTEM_TX_LIFETIME,
            SYSTEM_PAYLOAD,
        );
        tx.sign(key);
        info!("[lc-04] Inflation transaction created by {}", validator);
        Some(tx)
    }
}

fn is_inflation_ready(storage: &dyn StorageContext) -> Result<bool> {
    let key = Partition::native_field_key("gas", "inflation_ready");
    Ok(storage.get_value::<bool>(&key)?.unwrap_or(false))
}

impl fmt::Debug for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Chain")
            .field("name", &self.name)
            .field("address", &self.address)
            .field("open_height", &self.open.as_ref().map(|open| open.block.height))
            .finish()
    }
}
