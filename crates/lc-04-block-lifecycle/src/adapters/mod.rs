//! Adapters shipped with the crate.

pub mod oracle;

pub use oracle::BufferedOracle;
