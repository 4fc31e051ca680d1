//! CheckTx: mempool admission.
//!
//! Reads go to a fresh changeset over the durable store, never to the open
//! block's buffered writes.

use super::Chain;
use crate::config::PROTOCOL_VERSION_13;
use lc_01_storage_overlay::{
    BalanceSheet, Partition, StorageChangeSet, StorageContext, StorageError,
};
use lc_02_gas_extraction::{disassemble, gas_info_from_calls, GasInfo};
use shared_types::{to_decimal_string, Address, CodeType, Timestamp, Transaction};
use std::sync::Arc;
use tracing::debug;

/// Admission verdict: a code and a human-readable reason.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckTxResult {
    pub code: CodeType,
    pub message: String,
}

impl CheckTxResult {
    pub fn ok() -> Self {
        Self {
            code: CodeType::Ok,
            message: String::new(),
        }
    }

    pub fn reject(code: CodeType, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.code.is_ok()
    }
}

type Admission = Result<(), CheckTxResult>;

fn storage_rejection(err: StorageError) -> CheckTxResult {
    CheckTxResult::reject(CodeType::Error, format!("Storage error: {}", err))
}

/// Fee fields carried by the transaction itself.
fn explicit_gas(tx: &Transaction) -> Option<GasInfo> {
    Some(GasInfo {
        payer: tx.gas_payer?,
        target: tx.gas_target?,
        price: tx.gas_price?,
        limit: tx.gas_limit?,
    })
}

impl Chain {
    /// Decide whether `tx` may enter the mempool at `timestamp`.
    pub fn check_tx(&self, tx: &Transaction, timestamp: Timestamp) -> CheckTxResult {
        match self.admit(tx, timestamp) {
            Ok(()) => CheckTxResult::ok(),
            Err(rejection) => {
                debug!(
                    "[lc-04] CheckTx rejected {}: {} ({})",
                    shared_types::hash_to_hex(&tx.hash()),
                    rejection.code,
                    rejection.message
                );
                self.metrics.record_rejection();
                rejection
            }
        }
    }

    fn admit(&self, tx: &Transaction, timestamp: Timestamp) -> Admission {
        if tx.expiration < timestamp {
            return Err(CheckTxResult::reject(CodeType::Expired, "Transaction expired"));
        }

        if tx.target_chain != self.name {
            return Err(CheckTxResult::reject(
                CodeType::InvalidChain,
                format!(
                    "Transaction targets chain {}, this is {}",
                    tx.target_chain, self.name
                ),
            ));
        }

        if !tx.has_signatures() {
            return Err(CheckTxResult::reject(
                CodeType::UnsignedTx,
                "Transaction is not signed",
            ));
        }

        let protocol = self.nexus.protocol_version();
        let storage = StorageChangeSet::new(Arc::clone(&self.store));

        if protocol >= PROTOCOL_VERSION_13 {
            if tx.script.len() > self.config.max_script_size {
                return Err(CheckTxResult::reject(
                    CodeType::Error,
                    format!(
                        "Script too big: {} bytes, limit is {}",
                        tx.script.len(),
                        self.config.max_script_size
                    ),
                ));
            }

            let key = Partition::Transactions.key(tx.hash());
            if storage.has(&key).map_err(storage_rejection)? {
                return Err(CheckTxResult::reject(
                    CodeType::Error,
                    "Transaction already exists in chain",
                ));
            }
        }

        if self.nexus.has_genesis() {
            self.check_fees(tx, protocol, &storage)?;
        }

        if tx.script.is_empty() {
            return Err(CheckTxResult::reject(
                CodeType::InvalidScript,
                "Script attached to transaction is empty",
            ));
        }

        Ok(())
    }

    fn check_fees(&self, tx: &Transaction, protocol: u32, storage: &dyn StorageContext) -> Admission {
        let table = self.method_table();
        let calls = disassemble(&tx.script, &table).map_err(|err| {
            CheckTxResult::reject(
                CodeType::Error,
                format!("Could not disassemble script: {}", err),
            )
        })?;

        let declared = match explicit_gas(tx) {
            Some(gas) if protocol >= PROTOCOL_VERSION_13 => gas.validate(),
            _ => gas_info_from_calls(&calls),
        };
        let gas = declared.map_err(|err| {
            CheckTxResult::reject(
                CodeType::NoSystemAddress,
                format!("Invalid gas declaration: {}", err),
            )
        })?;

        if protocol >= PROTOCOL_VERSION_13 && !tx.is_signed_by(&gas.payer) {
            return Err(CheckTxResult::reject(
                CodeType::Error,
                format!("Gas payer {} did not sign the transaction", gas.payer),
            ));
        }

        let symbol = &self.config.fuel_token_symbol;
        let decimals = self.config.fuel_token_decimals;
        let fuel = BalanceSheet::new(symbol.as_str());

        if let Some(call) = calls.iter().find(|call| self.config.is_whitelisted(&call.name)) {
            let pot = Address::from_name(call.contract());
            let balance = fuel.get(storage, &pot).map_err(storage_rejection)?;
            let minimum = self.config.min_pot_balance();
            if balance < minimum {
                return Err(CheckTxResult::reject(
                    CodeType::Error,
                    format!(
                        "Empty pot for {}: {} has {} {}, needs {}",
                        call.name,
                        pot,
                        to_decimal_string(balance, decimals),
                        symbol,
                        to_decimal_string(minimum, decimals)
                    ),
                ));
            }
            return Ok(());
        }

        let minimum_fee = self.nexus.minimum_fee();
        if gas.price < minimum_fee {
            return Err(CheckTxResult::reject(
                CodeType::GasFeeTooLow,
                format!("Gas fee too low: {} < {}", gas.price, minimum_fee),
            ));
        }

        let balance = fuel.get(storage, &gas.payer).map_err(storage_rejection)?;
        if balance.is_zero() {
            return Err(CheckTxResult::reject(
                CodeType::MissingFuel,
                format!("Missing fuel, {} has 0 {}", gas.payer, symbol),
            ));
        }

        // Overflow is unaffordable.
        let affordable = gas.max_fee().map_or(false, |required| balance >= required);
        if !affordable {
            let required = gas
                .max_fee()
                .map(|fee| to_decimal_string(fee, decimals))
                .unwrap_or_else(|| "more than any balance".to_string());
            return Err(CheckTxResult::reject(
                CodeType::MissingFuel,
                format!(
                    "Missing fuel, {} has {} {}, expected at least {}",
                    gas.payer,
                    to_decimal_string(balance, decimals),
                    symbol,
                    required
                ),
            ));
        }

        Ok(())
    }
}
