//! Named key partitions of the durable store.
//!
//! Every key the ledger writes lives under exactly one partition prefix, so
//! partitions never collide and can be scanned independently.

/// A named key-value partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Partition {
    /// Deployed contract metadata by name.
    Contracts,
    /// Compressed blocks by hash.
    Blocks,
    /// Compressed transactions by hash.
    Transactions,
    /// Token balances by symbol and address.
    Balances,
    /// Organization membership.
    Organizations,
    /// Block hash by height.
    BlockHeights,
    /// Height by block hash.
    HeightOfBlock,
    /// Containing block hash by transaction hash.
    TransactionBlocks,
    /// Transaction hashes by address, one key per entry.
    AddressTransactions,
    /// Scheduled task metadata and markers.
    Tasks,
    /// Chain-level metadata (genesis hash, counters).
    ChainMeta,
    /// Addresses denied by the failure filter.
    Filter,
    /// Native contract fields.
    NativeFields,
}

impl Partition {
    /// Get the byte prefix for this partition.
    pub fn as_bytes(&self) -> &'static [u8] {
        match self {
            Partition::Contracts => b"contracts/",
            Partition::Blocks => b"blocks/",
            Partition::Transactions => b"txs/",
            Partition::Balances => b"balances/",
            Partition::Organizations => b"orgs/",
            Partition::BlockHeights => b"height/",
            Partition::HeightOfBlock => b"block_height/",
            Partition::TransactionBlocks => b"tx_block/",
            Partition::AddressTransactions => b"addr_txs/",
            Partition::Tasks => b"tasks/",
            Partition::ChainMeta => b"chain/",
            Partition::Filter => b"filter/",
            Partition::NativeFields => b"native/",
        }
    }

    /// Build a full key with the given suffix.
    pub fn key(&self, suffix: impl AsRef<[u8]>) -> Vec<u8> {
        let suffix = suffix.as_ref();
        let prefix = self.as_bytes();
        let mut key = Vec::with_capacity(prefix.len() + suffix.len());
        key.extend_from_slice(prefix);
        key.extend_from_slice(suffix);
        key
    }

    /// Height keys are big-endian so scans return them in height order.
    pub fn height_key(height: u64) -> Vec<u8> {
        Partition::BlockHeights.key(height.to_be_bytes())
    }

    /// Prefix under which every index entry of `address` lives.
    pub fn address_index_prefix(address: &[u8]) -> Vec<u8> {
        Partition::AddressTransactions.key(address)
    }

    /// One address index entry, ordered by block height then position in
    /// the block.
    pub fn address_index_key(address: &[u8], height: u64, position: u32) -> Vec<u8> {
        let mut key = Self::address_index_prefix(address);
        key.extend_from_slice(&height.to_be_bytes());
        key.extend_from_slice(&position.to_be_bytes());
        key
    }

    /// Key of a native contract field, e.g. `("gas", "inflation_ready")`.
    pub fn native_field_key(contract: &str, field: &str) -> Vec<u8> {
        Partition::NativeFields.key(format!("{}.{}", contract, field))
    }
}
