//! # Method Table
//!
//! Maps every callable method name to its argument count so scripts can be
//! disassembled without executing them. The table is built from the native
//! methods plus the ABIs of deployed contracts and registered tokens, and is
//! cached behind an explicit invalidation counter.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Methods every chain knows, with their argument counts.
pub const NATIVE_METHODS: &[(&str, usize)] = &[
    ("gas.AllowGas", 4),
    ("gas.SpendGas", 1),
    ("gas.ApplyInflation", 1),
    ("gas.FixInflationTiming", 2),
    ("swap.SwapFee", 3),
    ("swap.SwapTokens", 4),
    ("swap.SwapFiat", 4),
    ("exchange.SwapFee", 3),
    ("exchange.OpenOrder", 6),
    ("stake.Stake", 2),
    ("stake.Unstake", 2),
    ("stake.Claim", 2),
    ("validator.SetValidator", 3),
    ("governance.SetValue", 2),
    ("account.RegisterName", 2),
    ("Runtime.TransferTokens", 4),
    ("Runtime.TransferBalance", 3),
    ("Runtime.MintTokens", 4),
    ("Runtime.BurnTokens", 3),
    ("Runtime.DeployContract", 3),
    ("Runtime.UpgradeContract", 3),
    ("Runtime.KillContract", 2),
    ("Runtime.CreateToken", 6),
    ("Runtime.StartTask", 7),
    ("Runtime.StopTask", 1),
    ("Runtime.Log", 1),
];

/// One method of a contract ABI.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MethodAbi {
    pub name: String,
    pub arg_count: usize,
}

impl MethodAbi {
    pub fn new(name: impl Into<String>, arg_count: usize) -> Self {
        Self {
            name: name.into(),
            arg_count,
        }
    }
}

/// ABI of a deployed custom contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractAbi {
    pub name: String,
    pub methods: Vec<MethodAbi>,
}

/// ABI of a registered token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenAbi {
    pub symbol: String,
    /// Tokens created by the protocol itself.
    pub is_system: bool,
    pub methods: Vec<MethodAbi>,
}

/// Method name to argument count.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MethodTable {
    methods: HashMap<String, usize>,
}

impl MethodTable {
    pub fn empty() -> Self {
        Self::default()
    }

    /// The native methods only.
    pub fn native() -> Self {
        let mut table = Self::empty();
        for (name, args) in NATIVE_METHODS {
            table.insert(*name, *args);
        }
        table
    }

    /// Native methods plus the given contracts and tokens.
    ///
    /// System tokens are skipped, except the one named by `liquidity_symbol`.
    pub fn build<'a>(
        contracts: impl IntoIterator<Item = &'a ContractAbi>,
        tokens: impl IntoIterator<Item = &'a TokenAbi>,
        liquidity_symbol: &str,
    ) -> Self {
        let mut table = Self::native();
        for contract in contracts {
            table.add_contract(contract);
        }
        for token in tokens {
            if token.is_system && token.symbol != liquidity_symbol {
                continue;
            }
            table.add_token(token);
        }
        table
    }

    pub fn insert(&mut self, name: impl Into<String>, arg_count: usize) {
        self.methods.insert(name.into(), arg_count);
    }

    pub fn add_contract(&mut self, contract: &ContractAbi) {
        for method in &contract.methods {
            self.insert(format!("{}.{}", contract.name, method.name), method.arg_count);
        }
    }

    pub fn add_token(&mut self, token: &TokenAbi) {
        for method in &token.methods {
            self.insert(format!("{}.{}", token.symbol, method.name), method.arg_count);
        }
    }

    pub fn arg_count(&self, name: &str) -> Option<usize> {
        self.methods.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.methods.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.methods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }
}

/// Lazily built [`MethodTable`] guarded by a version counter.
///
/// [`MethodTableCache::invalidate`] bumps the version; the next
/// [`MethodTableCache::get_or_build`] sees a stale entry and rebuilds.
#[derive(Debug, Default)]
pub struct MethodTableCache {
    version: AtomicU64,
    entry: RwLock<Option<(u64, Arc<MethodTable>)>>,
}

impl MethodTableCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn version(&self) -> u64 {
        self.version.load(Ordering::Acquire)
    }

    /// Mark the cached table stale.
    pub fn invalidate(&self) {
        let version = self.version.fetch_add(1, Ordering::AcqRel) + 1;
        tracing::debug!("[lc-02] Method table invalidated (version {})", version);
    }

    /// True when a table for the current version is cached.
    pub fn is_fresh(&self) -> bool {
        let current = self.version();
        matches!(&*self.entry.read(), Some((built, _)) if *built == current)
    }

    /// Return the cached table, rebuilding it with `build` when stale.
    pub fn get_or_build(&self, build: impl FnOnce() -> MethodTable) -> Arc<MethodTable> {
        let current = self.version();
        if let Some((built, table)) = &*self.entry.read() {
            if *built == current {
                return Arc::clone(table);
            }
        }

        let mut entry = self.entry.write();
        if let Some((built, table)) = &*entry {
            if *built == current {
                return Arc::clone(table);
            }
        }
        let table = Arc::new(build());
        tracing::debug!(
            "[lc-02] Method table rebuilt with {} methods (version {})",
            table.len(),
            current
        );
        *entry = Some((current, Arc::clone(&table)));
        table
    }
}
