//! # Shared Types Crate
//!
//! Domain entities shared by every ledger subsystem.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: transactions, blocks, events and execution
//!   results are defined once, here.
//! - **Deterministic Encoding**: every hashed structure is encoded with
//!   `bincode` over ordered collections, so independent nodes derive the same
//!   hashes from the same content.
//! - **Immutability after Construction**: transactions only gain signatures;
//!   blocks only mutate while the owning chain keeps them open.

pub mod admission;
pub mod entities;
pub mod errors;
pub mod events;
pub mod execution;
pub mod units;

pub use admission::*;
pub use entities::*;
pub use errors::*;
pub use events::*;
pub use execution::*;
pub use units::*;
