//! Admission-control classification.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Why a transaction was refused by `CheckTx`.
///
/// A classification value only; never persisted as chain state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CodeType {
    Ok,
    Expired,
    InvalidChain,
    UnsignedTx,
    NoSystemAddress,
    GasFeeTooLow,
    MissingFuel,
    InvalidScript,
    Error,
}

impl CodeType {
    /// Numeric code reported to the consensus engine; 0 accepts.
    pub fn code(&self) -> u32 {
        match self {
            CodeType::Ok => 0,
            CodeType::Error => 1,
            CodeType::Expired => 2,
            CodeType::InvalidChain => 3,
            CodeType::UnsignedTx => 4,
            CodeType::NoSystemAddress => 5,
            CodeType::GasFeeTooLow => 6,
            CodeType::MissingFuel => 7,
            CodeType::InvalidScript => 8,
        }
    }

    pub fn is_ok(&self) -> bool {
        *self == CodeType::Ok
    }
}

impl fmt::Display for CodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_ok_is_zero() {
        let all = [
            CodeType::Ok,
            CodeType::Expired,
            CodeType::InvalidChain,
            CodeType::UnsignedTx,
            CodeType::NoSystemAddress,
            CodeType::GasFeeTooLow,
            CodeType::MissingFuel,
            CodeType::InvalidScript,
            CodeType::Error,
        ];
        for code in all {
            assert_eq!(code.code() == 0, code.is_ok());
        }
    }
}
