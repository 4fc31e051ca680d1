//! # Copy-on-Write Changesets
//!
//! [`StorageChangeSet`] buffers the writes of one open block over the shared
//! durable store; [`StagedWrites`] buffers the writes of one transaction over
//! its parent context. Reads fall through the layers top-down, and a buffered
//! delete shadows whatever the layers below hold.

use crate::error::Result;
use crate::ports::{BatchOperation, KeyValueStore};
use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Durable store shared between the chain and its changesets.
pub type SharedStore = Arc<RwLock<dyn KeyValueStore>>;

/// Wrap a concrete store for sharing.
pub fn shared_store<S: KeyValueStore + 'static>(store: S) -> SharedStore {
    Arc::new(RwLock::new(store))
}

/// Buffered writes: `None` marks a delete.
type WriteBuffer = BTreeMap<Vec<u8>, Option<Vec<u8>>>;

/// Keyed state as seen by scripts and the chain.
///
/// Writes are staged in memory and cannot fail; only reads that reach the
/// durable store can.
pub trait StorageContext {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>>;

    fn has(&self, key: &[u8]) -> Result<bool> {
        Ok(self.get(key)?.is_some())
    }

    /// Stage a write.
    fn put(&mut self, key: &[u8], value: &[u8]);

    /// Stage a delete.
    fn delete(&mut self, key: &[u8]);
}

/// Typed access over any [`StorageContext`], bincode encoded.
pub trait StorageContextExt: StorageContext {
    fn get_value<T: DeserializeOwned>(&self, key: &[u8]) -> Result<Option<T>> {
        match self.get(key)? {
            Some(bytes) => Ok(Some(bincode::deserialize(&bytes)?)),
            None => Ok(None),
        }
    }

    fn put_value<T: Serialize + ?Sized>(&mut self, key: &[u8], value: &T) -> Result<()> {
        let bytes = bincode::serialize(value)?;
        self.put(key, &bytes);
        Ok(())
    }
}

impl<T: StorageContext + ?Sized> StorageContextExt for T {}

fn read_through(
    writes: &WriteBuffer,
    key: &[u8],
    below: impl FnOnce() -> Result<Option<Vec<u8>>>,
) -> Result<Option<Vec<u8>>> {
    match writes.get(key) {
        Some(staged) => Ok(staged.clone()),
        None => below(),
    }
}

/// Pending writes of one open block, layered over the durable store.
///
/// `Clone` yields an independent point-in-time copy sharing the same base.
#[derive(Clone)]
pub struct StorageChangeSet {
    base: SharedStore,
    writes: WriteBuffer,
}

impl StorageChangeSet {
    pub fn new(base: SharedStore) -> Self {
        Self {
            base,
            writes: BTreeMap::new(),
        }
    }

    pub fn base(&self) -> &SharedStore {
        &self.base
    }

    /// Open a transaction-local snapshot over this changeset.
    pub fn snapshot(&mut self) -> StagedWrites<'_> {
        StagedWrites::new(self)
    }

    pub fn pending_writes(&self) -> usize {
        self.writes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.writes.is_empty()
    }

    /// Flush every buffered write into the durable store as one atomic batch.
    ///
    /// Consumes the changeset: it cannot be executed twice.
    pub fn execute(self) -> Result<usize> {
        let operations: Vec<BatchOperation> = self
            .writes
            .into_iter()
            .map(|(key, value)| match value {
                Some(value) => BatchOperation::put(key, value),
                None => BatchOperation::delete(key),
            })
            .collect();

        let count = operations.len();
        if count > 0 {
            self.base.write().atomic_batch_write(operations)?;
        }
        Ok(count)
    }
}

impl StorageContext for StorageChangeSet {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        read_through(&self.writes, key, || self.base.read().get(key))
    }

    fn put(&mut self, key: &[u8], value: &[u8]) {
        self.writes.insert(key.to_vec(), Some(value.to_vec()));
    }

    fn delete(&mut self, key: &[u8]) {
        self.writes.insert(key.to_vec(), None);
    }
}

impl fmt::Debug for StorageChangeSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StorageChangeSet")
            .field("pending_writes", &self.writes.len())
            .finish()
    }
}

/// Writes of one transaction, staged over a parent context.
///
/// Applied to the parent only by [`StagedWrites::commit`]; dropped otherwise.
pub struct StagedWrites<'p> {
    parent: &'p mut dyn StorageContext,
    writes: WriteBuffer,
}

impl<'p> StagedWrites<'p> {
    pub fn new(parent: &'p mut dyn StorageContext) -> Self {
        Self {
            parent,
            writes: BTreeMap::new(),
        }
    }

    /// Nested snapshot over this one.
    pub fn snapshot(&mut self) -> StagedWrites<'_> {
        StagedWrites::new(self)
    }

    pub fn pending_writes(&self) -> usize {
        self.writes.len()
    }

    /// Merge the staged writes into the parent, in key order.
    pub fn commit(self) -> usize {
        let StagedWrites { parent, writes } = self;
        let count = writes.len();
        for (key, value) in writes {
            match value {
                Some(value) => parent.put(&key, &value),
                None => parent.delete(&key),
            }
        }
        count
    }

    /// Drop the staged writes explicitly.
    pub fn discard(self) {}
}

impl StorageContext for StagedWrites<'_> {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        read_through(&self.writes, key, || self.parent.get(key))
    }

    fn put(&mut self, key: &[u8], value: &[u8]) {
        self.writes.insert(key.to_vec(), Some(value.to_vec()));
    }

    fn delete(&mut self, key: &[u8]) {
        self.writes.insert(key.to_vec(), None);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::InMemoryKVStore;
    use proptest::prelude::*;

    fn store_with<K: AsRef<[u8]>, V: AsRef<[u8]>>(entries: &[(K, V)]) -> SharedStore {
        let mut store = InMemoryKVStore::new();
        for (k, v) in entries {
            store.put(k.as_ref(), v.as_ref()).unwrap();
        }
        shared_store(store)
    }

    fn empty_store() -> SharedStore {
        shared_store(InMemoryKVStore::new())
    }

    #[test]
    fn test_reads_fall_through_to_base() {
        let changeset = StorageChangeSet::new(store_with(&[(b"k", b"base")]));
        assert_eq!(changeset.get(b"k").unwrap(), Some(b"base".to_vec()));
        assert!(!changeset.has(b"missing").unwrap());
    }

    #[test]
    fn test_buffered_writes_invisible_until_execute() {
        let base = empty_store();
        let mut changeset = StorageChangeSet::new(base.clone());
        changeset.put(b"k", b"v");

        assert_eq!(changeset.get(b"k").unwrap(), Some(b"v".to_vec()));
        assert!(base.read().get(b"k").unwrap().is_none());

        assert_eq!(changeset.execute().unwrap(), 1);
        assert_eq!(base.read().get(b"k").unwrap(), Some(b"v".to_vec()));
    }

    #[test]
    fn test_delete_shadows_base() {
        let base = store_with(&[(b"k", b"v")]);
        let mut changeset = StorageChangeSet::new(base.clone());
        changeset.delete(b"k");
        assert!(changeset.get(b"k").unwrap().is_none());

        changeset.execute().unwrap();
        assert!(!base.read().exists(b"k").unwrap());
    }

    #[test]
    fn test_snapshot_commit_merges_into_parent() {
        let mut changeset = StorageChangeSet::new(empty_store());
        {
            let mut tx = changeset.snapshot();
            tx.put(b"a", b"1");
            assert_eq!(tx.get(b"a").unwrap(), Some(b"1".to_vec()));
            assert_eq!(tx.commit(), 1);
        }
        assert_eq!(changeset.get(b"a").unwrap(), Some(b"1".to_vec()));
    }

    #[test]
    fn test_snapshot_drop_discards() {
        let mut changeset = StorageChangeSet::new(store_with(&[(b"a", b"0")]));
        {
            let mut tx = changeset.snapshot();
            tx.put(b"a", b"1");
            tx.delete(b"b");
        }
        assert_eq!(changeset.get(b"a").unwrap(), Some(b"0".to_vec()));
        assert!(changeset.is_empty());
    }

    #[test]
    fn test_clone_is_independent() {
        let mut changeset = StorageChangeSet::new(empty_store());
        changeset.put(b"a", b"1");
        let copy = changeset.clone();
        changeset.put(b"a", b"2");

        assert_eq!(copy.get(b"a").unwrap(), Some(b"1".to_vec()));
        assert_eq!(changeset.get(b"a").unwrap(), Some(b"2".to_vec()));
    }

    #[test]
    fn test_nested_snapshots() {
        let mut changeset = StorageChangeSet::new(empty_store());
        let mut outer = changeset.snapshot();
        {
            let mut inner = outer.snapshot();
            inner.put(b"x", b"1");
            inner.commit();
        }
        {
            let mut inner = outer.snapshot();
            inner.put(b"y", b"2");
            inner.discard();
        }
        outer.commit();

        assert!(changeset.has(b"x").unwrap());
        assert!(!changeset.has(b"y").unwrap());
    }

    #[test]
    fn test_typed_values() {
        let mut changeset = StorageChangeSet::new(empty_store());
        changeset.put_value(b"n", &42u64).unwrap();
        assert_eq!(changeset.get_value::<u64>(b"n").unwrap(), Some(42));
        assert_eq!(changeset.get_value::<u64>(b"none").unwrap(), None);
    }

    proptest! {
        #[test]
        fn prop_discarded_snapshot_leaves_parent_untouched(
            writes in proptest::collection::vec((any::<u8>(), any::<Option<u8>>()), 0..32)
        ) {
            let mut changeset = StorageChangeSet::new(store_with(&[([1u8], [1u8])]));
            changeset.put(&[2], &[2]);
            let before: Vec<_> = (0u8..=255).map(|k| changeset.get(&[k]).unwrap()).collect();

            {
                let mut tx = changeset.snapshot();
                for (k, v) in &writes {
                    match v {
                        Some(v) => tx.put(&[*k], &[*v]),
                        None => tx.delete(&[*k]),
                    }
                }
            }

            let after: Vec<_> = (0u8..=255).map(|k| changeset.get(&[k]).unwrap()).collect();
            prop_assert_eq!(before, after);
        }

        #[test]
        fn prop_committed_snapshot_matches_its_view(
            writes in proptest::collection::vec((any::<u8>(), any::<Option<u8>>()), 0..32)
        ) {
            let mut changeset = StorageChangeSet::new(store_with(&[([7u8], [7u8])]));
            let expected: Vec<_>;
            {
                let mut tx = changeset.snapshot();
                for (k, v) in &writes {
                    match v {
                        Some(v) => tx.put(&[*k], &[*v]),
                        None => tx.delete(&[*k]),
                    }
                }
                expected = (0u8..=255).map(|k| tx.get(&[k]).unwrap()).collect();
                tx.commit();
            }

            let base = changeset.base().clone();
            let seen: Vec<_> = (0u8..=255).map(|k| changeset.get(&[k]).unwrap()).collect();
            prop_assert_eq!(&seen, &expected);

            changeset.execute().unwrap();
            let durable: Vec<_> = (0u8..=255).map(|k| base.read().get(&[k]).unwrap()).collect();
            prop_assert_eq!(durable, expected);
        }
    }
}
