//! # Ledger Core - Storage Overlay (Subsystem 1)
//!
//! **Bounded Context:** Durable state and copy-on-write changesets
//!
//! ## Purpose
//!
//! Every block executes against a [`StorageChangeSet`] layered over the
//! durable [`KeyValueStore`]. Each transaction gets its own
//! [`StagedWrites`] snapshot of that changeset:
//!
//! ```text
//! KeyValueStore (durable)
//!        ▲ execute()  - one atomic batch per committed block
//! StorageChangeSet (open block)
//!        ▲ commit()   - only when the transaction halts
//! StagedWrites (one transaction)
//! ```
//!
//! Dropping a `StagedWrites` without committing discards it. A staged
//! snapshot mutably borrows its parent, so it can neither outlive the parent
//! nor be committed twice.
//!
//! ## Module Structure
//!
//! - [`ports`]: `KeyValueStore` driven port and batch operations
//! - [`adapters`]: in-memory and file-backed stores
//! - [`changeset`]: the overlay types and the `StorageContext` trait
//! - [`partition`]: named key partitions
//! - [`balances`]: per-token balance sheets over a storage context
//! - [`compression`]: zstd compression for persisted blocks and transactions

#![warn(clippy::all)]

pub mod adapters;
pub mod balances;
pub mod changeset;
pub mod compression;
pub mod partition;
pub mod ports;

mod error;

pub use adapters::{FileBackedKVStore, InMemoryKVStore};
pub use balances::BalanceSheet;
pub use changeset::{
    shared_store, SharedStore, StagedWrites, StorageChangeSet, StorageContext, StorageContextExt,
};
pub use compression::{
    decode_record, encode_record, CompressionConfig, Compressor, NoOpCompressor, ZstdCompressor,
};
pub use error::{Result, StorageError};
pub use partition::Partition;
pub use ports::{BatchOperation, KeyValueStore, ScanResult};

/// Subsystem identifier used in log prefixes.
pub const SUBSYSTEM_ID: u8 = 1;
