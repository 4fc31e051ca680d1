//! # Gas Extraction
//!
//! Finds the `gas.AllowGas` call in a script and reads the fee payer, fee
//! target, price and limit it declares.

use crate::disassembler::{disassemble, MethodCall};
use crate::error::GasExtractionError;
use crate::method_table::MethodTable;
use shared_types::{Address, ScriptValue, U256};

/// Full name of the fee declaration call.
pub const ALLOW_GAS: &str = "gas.AllowGas";

/// Fee parameters declared by a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GasInfo {
    pub payer: Address,
    pub target: Address,
    pub price: U256,
    pub limit: U256,
}

impl GasInfo {
    /// Maximum fee the payer can be charged.
    pub fn max_fee(&self) -> Option<U256> {
        self.price.checked_mul(self.limit)
    }

    /// Reject a null payer or non-positive price/limit.
    pub fn validate(self) -> Result<Self, GasExtractionError> {
        if self.payer.is_null() {
            return Err(GasExtractionError::NullPayer);
        }
        if self.price.is_zero() {
            return Err(GasExtractionError::ZeroPrice);
        }
        if self.limit.is_zero() {
            return Err(GasExtractionError::ZeroLimit);
        }
        Ok(self)
    }
}

fn address_arg(call: &MethodCall, index: usize) -> Result<Address, GasExtractionError> {
    call.arg(index)
        .and_then(ScriptValue::as_address)
        .ok_or(GasExtractionError::InvalidArgument {
            index,
            expected: "an address",
        })
}

fn number_arg(call: &MethodCall, index: usize) -> Result<U256, GasExtractionError> {
    call.arg(index)
        .and_then(ScriptValue::as_number)
        .ok_or(GasExtractionError::InvalidArgument {
            index,
            expected: "a number",
        })
}

/// Read [`GasInfo`] from the first `AllowGas` call in `calls`.
pub fn gas_info_from_calls(calls: &[MethodCall]) -> Result<GasInfo, GasExtractionError> {
    let call = calls
        .iter()
        .find(|call| call.name == ALLOW_GAS)
        .ok_or(GasExtractionError::MissingAllowGas)?;

    GasInfo {
        payer: address_arg(call, 0)?,
        target: address_arg(call, 1)?,
        price: number_arg(call, 2)?,
        limit: number_arg(call, 3)?,
    }
    .validate()
}

/// Disassemble `script` and read its fee declaration.
pub fn extract_gas_info(script: &[u8], table: &MethodTable) -> Result<GasInfo, GasExtractionError> {
    let calls = disassemble(script, table)?;
    gas_info_from_calls(&calls)
}
