//! # Ledger Core - Block Lifecycle (Subsystem 4)
//!
//! **Bounded Context:** Building, executing and committing blocks
//!
//! ## Purpose
//!
//! [`Chain`] drives one ledger partition through the consensus calls:
//!
//! | Call | Effect |
//! |------|--------|
//! | `begin_block` | opens the block and its changeset, runs inflation and due tasks |
//! | `check_tx` | admission against durable state, returns a [`CheckTxResult`] |
//! | `deliver_tx` | executes in a per-transaction snapshot, merged only on Halt |
//! | `end_block` | attaches oracle reads, invalidates the method table, reports validator updates |
//! | `commit` | distributes fees, signs, validates and persists in one batch |
//!
//! ## Error Channels
//!
//! - Admission rejections and execution faults are values.
//! - [`ChainError`] is recoverable caller misuse or a read failure.
//! - [`FatalError`] means local state diverged from consensus;
//!   [`ConsensusApp`] hands it to a [`HaltHandler`].
//!
//! ## Module Structure
//!
//! - [`chain`]: the lifecycle, admission, commit and read API
//! - [`domain`]: red filter, reward split, validator diff
//! - [`ports`]: `ScriptRuntime`, `OracleReader` and `Nexus` driven ports
//! - [`adapters`]: buffered oracle reader
//! - [`consensus_app`]: ABCI-shaped driver with fatal halt
//! - [`config`], [`metrics`], [`telemetry`]: ambient concerns

#![warn(clippy::all)]

pub mod adapters;
pub mod chain;
pub mod config;
pub mod consensus_app;
pub mod domain;
pub mod metrics;
pub mod ports;
pub mod telemetry;

mod error;

pub use adapters::BufferedOracle;
pub use chain::{Chain, CheckTxResult, EndBlockOutcome, BLOCK_ESCROW, SYSTEM_PAYLOAD};
pub use config::{
    ChainConfig, CompressionSettings, RedFilterConfig, TelemetryConfig, PROTOCOL_VERSION_13,
};
pub use consensus_app::{
    ConsensusApp, HaltHandler, ProcessExit, RequestBeginBlock, ResponseBeginBlock,
    ResponseCheckTx, ResponseCommit, ResponseDeliverTx, ResponseEndBlock, ResponseInfo,
};
pub use domain::{diff_validators, split_reward, RedFilter, ValidatorUpdate};
pub use error::{ChainError, FatalError, Result};
pub use metrics::ChainMetrics;
pub use ports::{
    ExecutionContext, ExecutionResult, Nexus, OracleReader, RuntimeError, ScriptRuntime,
};
pub use telemetry::init_tracing;

/// Subsystem identifier used in log prefixes.
pub const SUBSYSTEM_ID: u8 = 4;
