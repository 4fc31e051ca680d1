//! Per-token balance sheets.
//!
//! Balances are stored as 32-byte big-endian integers under
//! `balances/<symbol>.<address bytes>` in whatever [`StorageContext`] the
//! caller passes, so balance changes follow the same commit/discard rules as
//! every other write.

use crate::changeset::StorageContext;
use crate::error::{Result, StorageError};
use crate::partition::Partition;
use shared_types::{Address, U256};

/// Balances of one token symbol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BalanceSheet {
    symbol: String,
}

impl BalanceSheet {
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    fn key(&self, address: &Address) -> Vec<u8> {
        let mut suffix = Vec::with_capacity(self.symbol.len() + 1 + address.as_bytes().len());
        suffix.extend_from_slice(self.symbol.as_bytes());
        suffix.push(b'.');
        suffix.extend_from_slice(address.as_bytes());
        Partition::Balances.key(suffix)
    }

    /// Balance of `address`; zero when never credited.
    pub fn get(&self, storage: &dyn StorageContext, address: &Address) -> Result<U256> {
        match storage.get(&self.key(address))? {
            Some(bytes) if bytes.len() == 32 => Ok(U256::from_big_endian(&bytes)),
            Some(bytes) => Err(StorageError::Corruption(format!(
                "balance of {} for {} has {} bytes",
                self.symbol,
                address,
                bytes.len()
            ))),
            None => Ok(U256::zero()),
        }
    }

    fn set(&self, storage: &mut dyn StorageContext, address: &Address, amount: U256) {
        let key = self.key(address);
        if amount.is_zero() {
            storage.delete(&key);
        } else {
            let mut bytes = [0u8; 32];
            amount.to_big_endian(&mut bytes);
            storage.put(&key, &bytes);
        }
    }

    /// Credit `amount`. Returns `false` (and writes nothing) on overflow.
    pub fn add(
        &self,
        storage: &mut dyn StorageContext,
        address: &Address,
        amount: U256,
    ) -> Result<bool> {
        let current = self.get(storage, address)?;
        match current.checked_add(amount) {
            Some(next) => {
                self.set(storage, address, next);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Debit `amount`. Returns `false` (and writes nothing) when the balance
    /// does not cover it.
    pub fn subtract(
        &self,
        storage: &mut dyn StorageContext,
        address: &Address,
        amount: U256,
    ) -> Result<bool> {
        let current = self.get(storage, address)?;
        match current.checked_sub(amount) {
            Some(next) => {
                self.set(storage, address, next);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
