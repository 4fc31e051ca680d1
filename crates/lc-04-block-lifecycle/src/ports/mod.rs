//! Hexagonal ports
//!
//! Inbound operations are the methods of [`crate::Chain`] and
//! [`crate::ConsensusApp`]; outbound collaborators live in [`outbound`].

pub mod outbound;

pub use outbound::*;
