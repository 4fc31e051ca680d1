//! Closing, validating and persisting the open block.
//!
//! Every failure here is a [`FatalError`]: once a block is being committed
//! there is no safe way back.

use super::queries::{meta_key, META_GENESIS, META_HEIGHT, META_LAST_BLOCK};
use super::{Chain, OpenBlock};
use crate::domain::split_reward;
use crate::error::FatalError;
use lc_01_storage_overlay::{
    encode_record, BalanceSheet, Partition, StorageChangeSet, StorageContext,
};
use shared_types::{
    hash_to_hex, Address, Block, Event, EventKind, Hash, TokenEventData, Transaction, U256,
};
use std::collections::BTreeSet;
use tracing::{debug, info};

/// Name of the escrow that collects the block's fees.
pub const BLOCK_ESCROW: &str = "block";

/// Contract name carried by chain-emitted block events.
const BLOCK_CONTRACT: &str = "block";

/// Native contract whose self-referential events are not indexed.
const GAS_CONTRACT: &str = "gas";

type Outcome<T> = std::result::Result<T, FatalError>;

fn mismatch(field: &'static str, detail: String) -> FatalError {
    FatalError::BlockMismatch { field, detail }
}

impl Chain {
    /// Close the open block: validator switch event, fee distribution and
    /// signature. Idempotent; returns the closed block.
    pub fn close_block(&mut self) -> Outcome<Block> {
        let mut open = self.open.take().ok_or(FatalError::NoOpenBlock)?;
        let sealed = self.seal(&mut open);
        let block = open.block.clone();
        self.open = Some(open);
        sealed.map(|()| block)
    }

    /// Close, sign and persist the open block. Returns its hash.
    pub fn commit(&mut self) -> Outcome<Hash> {
        let mut open = self.open.take().ok_or(FatalError::NoOpenBlock)?;
        self.seal(&mut open)?;
        self.validate_block(&open.block, &open.block, &open.transactions)?;

        let OpenBlock {
            block,
            transactions,
            changeset,
            ..
        } = open;
        self.persist_block(&block, &transactions, changeset)
    }

    /// Persist a block built elsewhere, after checking it against the
    /// locally built open block.
    ///
    /// `changeset` must carry the closed block's writes, e.g. from
    /// [`Chain::open_changeset`] after [`Chain::close_block`]. On a mismatch
    /// nothing is written and the open block stays open.
    pub fn set_block(
        &mut self,
        block: Block,
        transactions: Vec<Transaction>,
        changeset: StorageChangeSet,
    ) -> Outcome<Hash> {
        let mut open = self.open.take().ok_or(FatalError::NoOpenBlock)?;
        let checked = self
            .seal(&mut open)
            .and_then(|()| self.validate_block(&open.block, &block, &transactions));
        if let Err(err) = checked {
            self.open = Some(open);
            return Err(err);
        }
        self.persist_block(&block, &transactions, changeset)
    }

    fn seal(&self, open: &mut OpenBlock) -> Outcome<()> {
        if open.closed {
            return Ok(());
        }

        if let Some(previous) = self.last_block()? {
            if previous.validator != open.block.validator {
                info!(
                    "[lc-04] Validator switch at block {}: {} -> {}",
                    open.block.height, previous.validator, open.block.validator
                );
                open.block.notify(Event::new(
                    EventKind::ValidatorSwitch,
                    open.block.validator,
                    BLOCK_CONTRACT,
                    previous.validator.as_bytes().to_vec(),
                ));
            }
        }

        self.distribute_fees(open)?;

        if let Some(key) = &self.signing_key {
            if self.node_address() == Some(open.block.validator) && !open.block.is_signed() {
                open.block.sign(key);
            }
        }

        open.closed = true;
        Ok(())
    }

    /// Split the escrowed fuel evenly across the reward targets; the
    /// remainder goes to the block validator.
    fn distribute_fees(&self, open: &mut OpenBlock) -> Outcome<()> {
        let fuel = BalanceSheet::new(self.config.fuel_token_symbol.as_str());
        let escrow = Address::from_name(BLOCK_ESCROW);
        let total = fuel.get(&open.changeset, &escrow)?;
        if total.is_zero() {
            return Ok(());
        }

        let targets = if self.nexus.has_genesis() {
            self.nexus.primary_validators()
        } else {
            vec![self.nexus.genesis_address()]
        };
        let (share, remainder) = split_reward(total, targets.len());

        if !share.is_zero() {
            for target in &targets {
                self.pay_from_escrow(open, &fuel, &escrow, target, share)?;
            }
        }
        if !remainder.is_zero() {
            let validator = open.block.validator;
            self.pay_from_escrow(open, &fuel, &escrow, &validator, remainder)?;
        }

        debug!(
            "[lc-04] Block {} fees: {} {} to {} validator(s)",
            open.block.height,
            total,
            fuel.symbol(),
            targets.len()
        );
        Ok(())
    }

    fn pay_from_escrow(
        &self,
        open: &mut OpenBlock,
        fuel: &BalanceSheet,
        escrow: &Address,
        target: &Address,
        amount: U256,
    ) -> Outcome<()> {
        if !fuel.subtract(&mut open.changeset, escrow, amount)? {
            return Err(FatalError::BlockGeneration(format!(
                "escrow cannot cover {} {}",
                amount,
                fuel.symbol()
            )));
        }
        if !fuel.add(&mut open.changeset, target, amount)? {
            return Err(FatalError::BlockGeneration(format!(
                "balance of {} overflows",
                target
            )));
        }

        let data = TokenEventData {
            symbol: fuel.symbol().to_string(),
            value: amount,
            chain_name: self.name.clone(),
        }
        .to_bytes()
        .map_err(|err| FatalError::BlockGeneration(err.to_string()))?;
        open.block
            .notify(Event::new(EventKind::TokenClaim, *target, BLOCK_CONTRACT, data));
        Ok(())
    }

    /// Field-by-field replay check of `block` against `expected`.
    fn validate_block(
        &self,
        expected: &Block,
        block: &Block,
        transactions: &[Transaction],
    ) -> Outcome<()> {
        if block.previous_hash != expected.previous_hash {
            return Err(mismatch(
                "previous_hash",
                format!(
                    "expected {}, found {}",
                    hash_to_hex(&expected.previous_hash),
                    hash_to_hex(&block.previous_hash)
                ),
            ));
        }
        if block.height != expected.height {
            return Err(mismatch(
                "height",
                format!("expected {}, found {}", expected.height, block.height),
            ));
        }
        if block.timestamp != expected.timestamp {
            return Err(mismatch(
                "timestamp",
                format!("expected {}, found {}", expected.timestamp, block.timestamp),
            ));
        }
        if block.chain_address != expected.chain_address {
            return Err(mismatch(
                "chain_address",
                format!("expected {}, found {}", expected.chain_address, block.chain_address),
            ));
        }
        if block.events != expected.events {
            return Err(mismatch(
                "events",
                format!(
                    "expected {} event(s), found {}",
                    expected.events.len(),
                    block.events.len()
                ),
            ));
        }
        if block.protocol != expected.protocol {
            return Err(mismatch(
                "protocol",
                format!("expected {}, found {}", expected.protocol, block.protocol),
            ));
        }
        if block.validator != expected.validator {
            return Err(mismatch(
                "validator",
                format!("expected {}, found {}", expected.validator, block.validator),
            ));
        }
        if self.nexus.has_genesis() && !self.nexus.is_known_validator(&block.validator) {
            return Err(FatalError::UnknownValidator(block.validator.to_string()));
        }

        let expected_set: BTreeSet<&Hash> = expected.transaction_hashes.iter().collect();
        let found_set: BTreeSet<&Hash> = block.transaction_hashes.iter().collect();
        if expected_set != found_set {
            return Err(mismatch(
                "transaction_hashes",
                format!(
                    "expected {} transaction(s), found {}",
                    expected_set.len(),
                    found_set.len()
                ),
            ));
        }

        let delivered: Vec<Hash> = transactions.iter().map(Transaction::hash).collect();
        if delivered != block.transaction_hashes {
            return Err(mismatch(
                "transactions",
                "transaction list does not match the block's hashes".to_string(),
            ));
        }

        for hash in &expected.transaction_hashes {
            let tx = hash_to_hex(hash);
            if block.state_for_hash(hash) != expected.state_for_hash(hash) {
                return Err(mismatch(
                    "tx_states",
                    format!(
                        "{}: expected {:?}, found {:?}",
                        tx,
                        expected.state_for_hash(hash),
                        block.state_for_hash(hash)
                    ),
                ));
            }
            if block.result_for_hash(hash) != expected.result_for_hash(hash) {
                return Err(mismatch("tx_results", format!("{}: result differs", tx)));
            }
            if block.events_for_hash(hash) != expected.events_for_hash(hash) {
                return Err(mismatch(
                    "tx_events",
                    format!(
                        "{}: expected {} event(s), found {}",
                        tx,
                        expected.events_for_hash(hash).len(),
                        block.events_for_hash(hash).len()
                    ),
                ));
            }
        }
        if block.tx_states.len() != expected.tx_states.len()
            || block.tx_results.len() != expected.tx_results.len()
            || block.tx_events.len() != expected.tx_events.len()
        {
            return Err(mismatch(
                "transactions",
                "block carries outcomes for transactions it does not list".to_string(),
            ));
        }

        if block.oracle_entries != expected.oracle_entries {
            return Err(mismatch(
                "oracle_entries",
                format!(
                    "expected {} entr(ies), found {}",
                    expected.oracle_entries.len(),
                    block.oracle_entries.len()
                ),
            ));
        }

        if block.is_signed() {
            block
                .verify_signature()
                .map_err(|err| mismatch("signature", err.to_string()))?;
        }
        Ok(())
    }

    /// Stage the block, its transactions and every index, then flush the
    /// changeset as one batch.
    fn persist_block(
        &mut self,
        block: &Block,
        transactions: &[Transaction],
        mut changeset: StorageChangeSet,
    ) -> Outcome<Hash> {
        let hash = block.hash();
        let height_bytes = block.height.to_be_bytes();

        changeset.put(&Partition::height_key(block.height), &hash);
        changeset.put(&Partition::HeightOfBlock.key(hash), &height_bytes);
        if block.height == 1 {
            changeset.put(&meta_key(META_GENESIS), &hash);
        }
        changeset.put(&meta_key(META_LAST_BLOCK), &hash);
        changeset.put(&meta_key(META_HEIGHT), &height_bytes);

        let encoded = encode_record(self.compressor.as_ref(), block)
            .map_err(|err| FatalError::persistence("encoding block", err))?;
        changeset.put(&Partition::Blocks.key(hash), &encoded);

        for (position, tx) in transactions.iter().enumerate() {
            let tx_hash = tx.hash();
            let encoded = encode_record(self.compressor.as_ref(), tx)
                .map_err(|err| FatalError::persistence("encoding transaction", err))?;
            changeset.put(&Partition::Transactions.key(tx_hash), &encoded);
            changeset.put(&Partition::TransactionBlocks.key(tx_hash), &hash);

            for address in indexed_addresses(block, &tx_hash) {
                let key =
                    Partition::address_index_key(address.as_bytes(), block.height, position as u32);
                changeset.put(&key, &tx_hash);
            }
        }

        let writes = changeset
            .execute()
            .map_err(|err| FatalError::persistence("flushing block", err))?;

        self.metrics.record_commit();
        info!(
            "[lc-04] Block {} committed on {}: {} ({} tx, {} writes)",
            block.height,
            self.name,
            hash_to_hex(&hash),
            transactions.len(),
            writes
        );
        Ok(hash)
    }
}

/// Addresses the transaction is indexed under: every event address, except
/// `gas` events about system addresses or the block validator.
fn indexed_addresses(block: &Block, tx_hash: &Hash) -> Vec<Address> {
    let mut addresses = Vec::new();
    for event in block.events_for_hash(tx_hash) {
        if event.contract == GAS_CONTRACT
            && (event.address.is_system() || event.address == block.validator)
        {
            continue;
        }
        if !addresses.contains(&event.address) {
            addresses.push(event.address);
        }
    }
    addresses
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::NULL_HASH;

    fn user(seed: u8) -> Address {
        Address::from_public_key(&[seed; 32])
    }

    #[test]
    fn test_indexed_addresses_skip_self_referential_gas_events() {
        let validator = user(1);
        let sender = user(2);
        let receiver = user(3);
        let mut block = Block::new(1, Address::from_name("main"), 0, NULL_HASH, 13, validator);
        let tx_hash = [7u8; 32];
        block.add_events_for_hash(
            tx_hash,
            vec![
                Event::new(EventKind::GasEscrow, sender, GAS_CONTRACT, Vec::new()),
                Event::new(EventKind::GasPayment, validator, GAS_CONTRACT, Vec::new()),
                Event::new(
                    EventKind::GasPayment,
                    Address::from_name(BLOCK_ESCROW),
                    GAS_CONTRACT,
                    Vec::new(),
                ),
                Event::new(EventKind::TokenSend, sender, "token", Vec::new()),
                Event::new(EventKind::TokenReceive, receiver, "token", Vec::new()),
            ],
        );

        assert_eq!(indexed_addresses(&block, &tx_hash), vec![sender, receiver]);
    }

    #[test]
    fn test_validator_is_indexed_outside_gas_events() {
        let validator = user(1);
        let mut block = Block::new(1, Address::from_name("main"), 0, NULL_HASH, 13, validator);
        let tx_hash = [9u8; 32];
        block.add_events_for_hash(
            tx_hash,
            vec![Event::new(EventKind::TokenReceive, validator, "token", Vec::new())],
        );
        assert_eq!(indexed_addresses(&block, &tx_hash), vec![validator]);
    }
}
