//! Read API over committed blocks and transactions.
//!
//! Everything here reads the durable store; the open block is invisible.

use super::Chain;
use crate::error::{ChainError, Result};
use lc_01_storage_overlay::{decode_record, Partition};
use shared_types::{Address, Block, ExecutionState, Hash, Transaction};

pub(crate) const META_GENESIS: &str = "genesis";
pub(crate) const META_LAST_BLOCK: &str = "last_block";
pub(crate) const META_HEIGHT: &str = "height";

pub(crate) fn meta_key(name: &str) -> Vec<u8> {
    Partition::ChainMeta.key(name)
}

fn decode_hash(bytes: &[u8]) -> Result<Hash> {
    bytes
        .try_into()
        .map_err(|_| ChainError::Decoding(format!("hash of {} bytes", bytes.len())))
}

fn decode_height(bytes: &[u8]) -> Result<u64> {
    let raw: [u8; 8] = bytes
        .try_into()
        .map_err(|_| ChainError::Decoding(format!("height of {} bytes", bytes.len())))?;
    Ok(u64::from_be_bytes(raw))
}

impl Chain {
    fn read(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        Ok(self.store.read().get(key)?)
    }

    fn read_hash(&self, key: &[u8]) -> Result<Option<Hash>> {
        self.read(key)?.map(|bytes| decode_hash(&bytes)).transpose()
    }

    /// Height of the last committed block, 0 before the first commit.
    pub fn height(&self) -> Result<u64> {
        match self.read(&meta_key(META_HEIGHT))? {
            Some(bytes) => decode_height(&bytes),
            None => Ok(0),
        }
    }

    pub fn last_block_hash(&self) -> Result<Option<Hash>> {
        self.read_hash(&meta_key(META_LAST_BLOCK))
    }

    pub fn genesis_hash(&self) -> Result<Option<Hash>> {
        self.read_hash(&meta_key(META_GENESIS))
    }

    pub fn block_hash_at_height(&self, height: u64) -> Result<Option<Hash>> {
        self.read_hash(&Partition::height_key(height))
    }

    pub fn height_of_block(&self, hash: &Hash) -> Result<Option<u64>> {
        self.read(&Partition::HeightOfBlock.key(hash))?
            .map(|bytes| decode_height(&bytes))
            .transpose()
    }

    pub fn block_by_hash(&self, hash: &Hash) -> Result<Option<Block>> {
        match self.read(&Partition::Blocks.key(hash))? {
            Some(bytes) => Ok(Some(decode_record(self.compressor.as_ref(), &bytes)?)),
            None => Ok(None),
        }
    }

    pub fn block_by_height(&self, height: u64) -> Result<Option<Block>> {
        match self.block_hash_at_height(height)? {
            Some(hash) => self.block_by_hash(&hash),
            None => Ok(None),
        }
    }

    pub fn last_block(&self) -> Result<Option<Block>> {
        match self.last_block_hash()? {
            Some(hash) => self.block_by_hash(&hash),
            None => Ok(None),
        }
    }

    pub fn transaction_by_hash(&self, hash: &Hash) -> Result<Option<Transaction>> {
        match self.read(&Partition::Transactions.key(hash))? {
            Some(bytes) => Ok(Some(decode_record(self.compressor.as_ref(), &bytes)?)),
            None => Ok(None),
        }
    }

    /// Hash of the block that contains transaction `hash`.
    pub fn block_hash_of_transaction(&self, hash: &Hash) -> Result<Option<Hash>> {
        self.read_hash(&Partition::TransactionBlocks.key(hash))
    }

    /// Committed transactions that touched `address`, oldest first.
    pub fn transaction_hashes_for_address(&self, address: &Address) -> Result<Vec<Hash>> {
        let prefix = Partition::address_index_prefix(address.as_bytes());
        let entries = self.store.read().prefix_scan(&prefix)?;
        entries
            .iter()
            .map(|(_, value)| decode_hash(value))
            .collect()
    }

    fn containing_block(&self, hash: &Hash) -> Result<Option<Block>> {
        match self.block_hash_of_transaction(hash)? {
            Some(block_hash) => self.block_by_hash(&block_hash),
            None => Ok(None),
        }
    }

    /// Terminal state recorded for a committed transaction.
    pub fn transaction_state(&self, hash: &Hash) -> Result<Option<ExecutionState>> {
        Ok(self
            .containing_block(hash)?
            .and_then(|block| block.state_for_hash(hash)))
    }

    /// Encoded return value of a committed transaction that halted.
    pub fn transaction_result(&self, hash: &Hash) -> Result<Option<Vec<u8>>> {
        Ok(self
            .containing_block(hash)?
            .and_then(|block| block.result_for_hash(hash).map(<[u8]>::to_vec)))
    }
}
