//! # Ledger Core - Gas Extraction (Subsystem 2)
//!
//! **Bounded Context:** Static fee inspection of transaction scripts
//!
//! ## Purpose
//!
//! Admission control must know who pays for a transaction, and how much,
//! before paying the cost of running it. This crate decodes the method calls
//! a script would make, without executing anything, and reads the
//! `gas.AllowGas(payer, target, price, limit)` declaration.
//!
//! ## Flow
//!
//! ```text
//! script bytes ──▶ disassemble(table) ──▶ [MethodCall] ──▶ GasInfo
//!                        ▲
//!          MethodTableCache (native + contract ABIs + token ABIs)
//! ```
//!
//! The method table changes only when contracts or tokens are deployed,
//! upgraded or removed; owners call [`MethodTableCache::invalidate`] then.
//!
//! ## Module Structure
//!
//! - [`opcodes`]: instruction set and varint helpers
//! - [`builder`]: `ScriptBuilder` for assembling call scripts
//! - [`disassembler`]: static call recovery
//! - [`method_table`]: method arity table and its cache
//! - [`extractor`]: `AllowGas` lookup and validation

#![warn(clippy::all)]

pub mod builder;
pub mod disassembler;
pub mod extractor;
pub mod method_table;
pub mod opcodes;

mod error;

pub use builder::ScriptBuilder;
pub use disassembler::{disassemble, MethodCall};
pub use error::{DisassemblyError, GasExtractionError, Result};
pub use extractor::{extract_gas_info, gas_info_from_calls, GasInfo, ALLOW_GAS};
pub use method_table::{ContractAbi, MethodAbi, MethodTable, MethodTableCache, TokenAbi};
pub use opcodes::Opcode;

/// Subsystem identifier used in log prefixes.
pub const SUBSYSTEM_ID: u8 = 2;
