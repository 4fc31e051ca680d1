//! # Red Filter
//!
//! Node-local deny-list of addresses named in execution faults. Entries are
//! written straight to the durable store, outside any block changeset, so
//! they survive restarts without becoming consensus state.

use lc_01_storage_overlay::{Partition, Result, SharedStore, StorageError};
use shared_types::{Address, ADDRESS_LEN};
use std::fmt;
use tracing::warn;

/// Hex digits of a textual address after its `0x` prefix.
const ADDRESS_HEX_LEN: usize = ADDRESS_LEN * 2;

pub struct RedFilter {
    store: SharedStore,
    enabled: bool,
}

impl RedFilter {
    pub fn new(store: SharedStore, enabled: bool) -> Self {
        Self { store, enabled }
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// First well-formed `0x` address in `message`.
    pub fn address_in_message(message: &str) -> Option<Address> {
        let mut rest = message;
        while let Some(start) = rest.find("0x") {
            let candidate = &rest[start..];
            if let Some(text) = candidate.get(..2 + ADDRESS_HEX_LEN) {
                let boundary = candidate[2 + ADDRESS_HEX_LEN..]
                    .chars()
                    .next()
                    .map_or(true, |c| !c.is_ascii_hexdigit());
                if boundary {
                    if let Ok(address) = text.parse::<Address>() {
                        return Some(address);
                    }
                }
            }
            rest = &candidate[2..];
        }
        None
    }

    /// Record the address named in a fault message.
    ///
    /// Returns the address added, or `None` when the gate is closed or the
    /// message names no address.
    pub fn on_fault(&self, message: &str) -> Result<Option<Address>> {
        if !self.enabled {
            return Ok(None);
        }
        let Some(address) = Self::address_in_message(message) else {
            return Ok(None);
        };
        let strikes = self.add(&address)?;
        warn!("[lc-04] Red filter: {} now has {} strike(s)", address, strikes);
        Ok(Some(address))
    }

    /// Add one strike to `address` and return the new count.
    pub fn add(&self, address: &Address) -> Result<u64> {
        let key = Self::key(address);
        let mut store = self.store.write();
        let strikes = match store.get(&key)? {
            Some(bytes) => decode_strikes(&bytes)?,
            None => 0,
        }
        .saturating_add(1);
        store.put(&key, &strikes.to_be_bytes())?;
        Ok(strikes)
    }

    pub fn is_filtered(&self, address: &Address) -> Result<bool> {
        Ok(self.strikes(address)? > 0)
    }

    pub fn strikes(&self, address: &Address) -> Result<u64> {
        match self.store.read().get(&Self::key(address))? {
            Some(bytes) => decode_strikes(&bytes),
            None => Ok(0),
        }
    }

    /// Every filtered address, in key order.
    pub fn filtered_addresses(&self) -> Result<Vec<Address>> {
        let prefix = Partition::Filter.as_bytes();
        self.store
            .read()
            .prefix_scan(prefix)?
            .into_iter()
            .map(|(key, _)| {
                let raw: [u8; ADDRESS_LEN] = key[prefix.len()..]
                    .try_into()
                    .map_err(|_| StorageError::Corruption("red filter key length".to_string()))?;
                Ok(Address::from_bytes(raw)?)
            })
            .collect()
    }

    /// Forgive `address`. Returns whether it was filtered.
    pub fn remove(&self, address: &Address) -> Result<bool> {
        let key = Self::key(address);
        let mut store = self.store.write();
        if !store.exists(&key)? {
            return Ok(false);
        }
        store.delete(&key)?;
        Ok(true)
    }

    fn key(address: &Address) -> Vec<u8> {
        Partition::Filter.key(address.as_bytes())
    }
}

fn decode_strikes(bytes: &[u8]) -> Result<u64> {
    let raw: [u8; 8] = bytes
        .try_into()
        .map_err(|_| StorageError::Corruption("red filter strike count".to_string()))?;
    Ok(u64::from_be_bytes(raw))
}

impl fmt::Debug for RedFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedFilter")
            .field("enabled", &self.enabled)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lc_01_storage_overlay::{shared_store, InMemoryKVStore};

    fn filter(enabled: bool) -> RedFilter {
        RedFilter::new(shared_store(InMemoryKVStore::new()), enabled)
    }

    #[test]
    fn test_address_in_message() {
        let address = Address::from_name("dex");
        let message = format!("contract {} failed: out of gas", address);
        assert_eq!(RedFilter::address_in_message(&message), Some(address));

        assert_eq!(RedFilter::address_in_message("stack underflow"), None);
        assert_eq!(RedFilter::address_in_message("bad value 0x1234"), None);
    }

    #[test]
    fn test_address_needs_boundary() {
        let address = Address::from_name("dex");
        let message = format!("{}ff", address);
        assert_eq!(RedFilter::address_in_message(&message), None);
    }

    #[test]
    fn test_disabled_gate_records_nothing() {
        let filter = filter(false);
        let address = Address::from_name("dex");
        let added = filter.on_fault(&format!("fault in {}", address)).unwrap();

        assert_eq!(added, None);
        assert!(!filter.is_filtered(&address).unwrap());
    }

    #[test]
    fn test_strikes_accumulate() {
        let filter = filter(true);
        let address = Address::from_name("dex");
        let message = format!("fault in {}", address);

        filter.on_fault(&message).unwrap();
        filter.on_fault(&message).unwrap();

        assert_eq!(filter.strikes(&address).unwrap(), 2);
        assert_eq!(filter.filtered_addresses().unwrap(), vec![address]);

        assert!(filter.remove(&address).unwrap());
        assert!(!filter.is_filtered(&address).unwrap());
        assert!(!filter.remove(&address).unwrap());
    }
}
