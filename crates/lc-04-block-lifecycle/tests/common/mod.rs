//! Shared doubles for the block lifecycle integration tests.
//!
//! - [`TestNexus`]: registry with mutable validators, contracts and flags
//! - [`TestRuntime`]: interprets the method calls the disassembler recovers
//! - [`Harness`]: a chain over an in-memory store with funded helpers

#![allow(dead_code)]

use ed25519_dalek::SigningKey;
use lc_01_storage_overlay::{
    shared_store, BalanceSheet, InMemoryKVStore, Partition, SharedStore, StorageChangeSet,
    StorageContext, StorageContextExt,
};
use lc_02_gas_extraction::{
    disassemble, ContractAbi, MethodAbi, MethodCall, MethodTable, ScriptBuilder, TokenAbi,
};
use lc_03_task_scheduler::{contract_key, ChainTask, TaskOutcome, TaskSpec, TaskStore};
use lc_04_block_lifecycle::{
    BufferedOracle, Chain, ChainConfig, ExecutionContext, ExecutionResult, Nexus, RuntimeError, ScriptRuntime,
    BLOCK_ESCROW,
};
use parking_lot::RwLock;
use shared_types::{
    Address, Event, EventKind, ScriptValue, Timestamp, Transaction, TransactionResult, U256,
};
use std::cell::Cell;
use std::collections::HashMap;
use std::sync::Arc;

// =============================================================================
// CONSTANTS
// =============================================================================

pub const CHAIN: &str = "main";
pub const FUEL: &str = "FUEL";
pub const MIN_FEE: u64 = 100_000;
pub const GAS_LIMIT: u64 = 500;
/// Gas charged per interpreted call.
pub const CALL_GAS: u64 = 100;
pub const GENESIS_TIME: Timestamp = 1_700_000_000;

pub fn key(seed: u8) -> SigningKey {
    SigningKey::from_bytes(&[seed; 32])
}

pub fn address_of(key: &SigningKey) -> Address {
    Address::from_public_key(&key.verifying_key().to_bytes())
}

// =============================================================================
// NEXUS
// =============================================================================

struct NexusState {
    protocol: u32,
    has_genesis: bool,
    genesis_address: Address,
    minimum_fee: U256,
    validators: Vec<Address>,
    proposers: HashMap<String, Address>,
    contracts: Vec<ContractAbi>,
    tokens: Vec<TokenAbi>,
}

pub struct TestNexus {
    root_chain: String,
    state: RwLock<NexusState>,
}

impl TestNexus {
    pub fn new(validators: Vec<Address>) -> Self {
        Self {
            root_chain: CHAIN.to_string(),
            state: RwLock::new(NexusState {
                protocol: 13,
                has_genesis: true,
                genesis_address: Address::from_name("genesis"),
                minimum_fee: U256::from(MIN_FEE),
                validators,
                proposers: HashMap::new(),
                contracts: vec![
                    ContractAbi {
                        name: "store".to_string(),
                        methods: vec![
                            MethodAbi::new("Put", 2),
                            MethodAbi::new("Copy", 2),
                            MethodAbi::new("Fail", 1),
                            MethodAbi::new("Panic", 1),
                        ],
                    },
                    ContractAbi {
                        name: "oracle".to_string(),
                        methods: vec![MethodAbi::new("Read", 1)],
                    },
                    ContractAbi {
                        name: "ticker".to_string(),
                        methods: vec![
                            MethodAbi::new("Tick", 0),
                            MethodAbi::new("Finish", 0),
                            MethodAbi::new("Crash", 0),
                        ],
                    },
                    ContractAbi {
                        name: "swap".to_string(),
                        methods: vec![MethodAbi::new("SwapFee", 3)],
                    },
                ],
                tokens: Vec::new(),
            }),
        }
    }

    pub fn set_protocol(&self, protocol: u32) {
        self.state.write().protocol = protocol;
    }

    pub fn set_genesis(&self, has_genesis: bool) {
        self.state.write().has_genesis = has_genesis;
    }

    /// Make another chain the one that applies inflation.
    pub fn with_root_chain(mut self, name: &str) -> Self {
        self.root_chain = name.to_string();
        self
    }

    pub fn set_validators(&self, validators: Vec<Address>) {
        self.state.write().validators = validators;
    }

    pub fn register_proposer(&self, proposer: &str, validator: Address) {
        self.state
            .write()
            .proposers
            .insert(proposer.to_string(), validator);
    }

    pub fn add_contract(&self, contract: ContractAbi) {
        self.state.write().contracts.push(contract);
    }
}

impl Nexus for TestNexus {
    fn name(&self) -> &str {
        "nexus"
    }

    fn root_chain_name(&self) -> &str {
        &self.root_chain
    }

    fn protocol_version(&self) -> u32 {
        self.state.read().protocol
    }

    fn has_genesis(&self) -> bool {
        self.state.read().has_genesis
    }

    fn genesis_address(&self) -> Address {
        self.state.read().genesis_address
    }

    fn minimum_fee(&self) -> U256 {
        self.state.read().minimum_fee
    }

    fn validator_by_proposer(&self, proposer: &str) -> Option<Address> {
        self.state.read().proposers.get(proposer).copied()
    }

    fn primary_validators(&self) -> Vec<Address> {
        self.state.read().validators.clone()
    }

    fn is_known_validator(&self, address: &Address) -> bool {
        self.state.read().validators.contains(address)
    }

    fn contracts(&self) -> Vec<ContractAbi> {
        self.state.read().contracts.clone()
    }

    fn tokens(&self) -> Vec<TokenAbi> {
        self.state.read().tokens.clone()
    }
}

// =============================================================================
// SCRIPT RUNTIME
// =============================================================================

/// Interprets a fixed set of calls:
///
/// | Call | Effect |
/// |------|--------|
/// | `gas.AllowGas` | remembers payer and price |
/// | `gas.SpendGas` | moves `price × gas used` from payer to the block escrow |
/// | `gas.ApplyInflation` | clears the inflation flag |
/// | `store.Put(k, v)` | writes `k = v` |
/// | `store.Copy(from, to)` | copies a value, faults when `from` is missing |
/// | `store.Fail(msg)` | faults with `msg` |
/// | `store.Panic(msg)` | panics with `msg` |
/// | `oracle.Read(url)` | returns the feed content, faults when missing |
/// | `Runtime.TransferTokens(from, to, symbol, amount)` | moves a balance |
/// | `Runtime.DeployContract(name, ..)` | marks `name` deployed |
/// | `ticker.Tick/Finish/Crash` | task handlers |
pub struct TestRuntime {
    table: MethodTable,
}

impl TestRuntime {
    pub fn new() -> Self {
        let nexus = TestNexus::new(Vec::new());
        let table = MethodTable::build(&nexus.contracts(), &nexus.tokens(), "STAKE");
        Self { table }
    }
}

struct Interpreter<'c, 'a> {
    ctx: &'c mut ExecutionContext<'a>,
    events: Vec<Event>,
    gas_used: U256,
    payer: Option<(Address, U256)>,
    outcome: Option<TaskOutcome>,
    result: Option<ScriptValue>,
}

fn string_arg(call: &MethodCall, index: usize) -> Result<String, String> {
    call.arg(index)
        .and_then(ScriptValue::as_str)
        .map(str::to_string)
        .ok_or_else(|| format!("{}: argument {} must be a string", call.name, index))
}

fn address_arg(call: &MethodCall, index: usize) -> Result<Address, String> {
    call.arg(index)
        .and_then(ScriptValue::as_address)
        .ok_or_else(|| format!("{}: argument {} must be an address", call.name, index))
}

fn number_arg(call: &MethodCall, index: usize) -> Result<U256, String> {
    call.arg(index)
        .and_then(ScriptValue::as_number)
        .ok_or_else(|| format!("{}: argument {} must be a number", call.name, index))
}

impl Interpreter<'_, '_> {
    fn call(&mut self, call: &MethodCall) -> Result<(), String> {
        self.gas_used += U256::from(CALL_GAS);
        match call.name.as_str() {
            "gas.AllowGas" => {
                let payer = address_arg(call, 0)?;
                self.payer = Some((payer, number_arg(call, 2)?));
                self.events
                    .push(Event::new(EventKind::GasEscrow, payer, "gas", Vec::new()));
            }
            "gas.SpendGas" => {
                let Some((payer, price)) = self.payer else {
                    return Err("SpendGas without AllowGas".to_string());
                };
                let fee = price * self.gas_used;
                let fuel = BalanceSheet::new(FUEL);
                let escrow = Address::from_name(BLOCK_ESCROW);
                if !fuel.subtract(self.ctx.storage, &payer, fee).map_err(|e| e.to_string())? {
                    return Err(format!("Missing fuel for {}", payer));
                }
                fuel.add(self.ctx.storage, &escrow, fee)
                    .map_err(|e| e.to_string())?;
                self.events
                    .push(Event::new(EventKind::GasPayment, escrow, "gas", Vec::new()));
            }
            "gas.ApplyInflation" => {
                self.ctx
                    .storage
                    .put_value(&Partition::native_field_key("gas", "inflation_ready"), &false)
                    .map_err(|e| e.to_string())?;
            }
            "store.Put" => {
                let key = string_arg(call, 0)?;
                let value = string_arg(call, 1)?;
                self.ctx.storage.put(key.as_bytes(), value.as_bytes());
                self.events.push(Event::new(
                    EventKind::Custom(1),
                    Address::from_name("store"),
                    "store",
                    key.into_bytes(),
                ));
            }
            "store.Copy" => {
                let from = string_arg(call, 0)?;
                let to = string_arg(call, 1)?;
                let value = self
                    .ctx
                    .storage
                    .get(from.as_bytes())
                    .map_err(|e| e.to_string())?
                    .ok_or_else(|| format!("Missing key {}", from))?;
                self.ctx.storage.put(to.as_bytes(), &value);
                self.result = Some(ScriptValue::Bytes(value));
            }
            "store.Fail" => return Err(string_arg(call, 0)?),
            "store.Panic" => panic!("{}", string_arg(call, 0)?),
            "oracle.Read" => {
                let url = string_arg(call, 0)?;
                let content = self
                    .ctx
                    .oracle
                    .read(&url)
                    .ok_or_else(|| format!("No oracle feed for {}", url))?;
                self.result = Some(ScriptValue::Bytes(content));
            }
            "Runtime.TransferTokens" => {
                let from = address_arg(call, 0)?;
                let to = address_arg(call, 1)?;
                let symbol = string_arg(call, 2)?;
                let amount = number_arg(call, 3)?;
                let sheet = BalanceSheet::new(symbol.as_str());
                if !sheet.subtract(self.ctx.storage, &from, amount).map_err(|e| e.to_string())? {
                    return Err(format!("Insufficient {} balance of {}", symbol, from));
                }
                sheet.add(self.ctx.storage, &to, amount)
                    .map_err(|e| e.to_string())?;
                self.events
                    .push(Event::new(EventKind::TokenSend, from, "token", Vec::new()));
                self.events
                    .push(Event::new(EventKind::TokenReceive, to, "token", Vec::new()));
            }
            "Runtime.DeployContract" => {
                let name = string_arg(call, 0)?;
                self.ctx.storage.put(&contract_key(&name), b"deployed");
                self.events.push(Event::new(
                    EventKind::ContractDeploy,
                    Address::from_name(&name),
                    name,
                    Vec::new(),
                ));
            }
            "ticker.Tick" | "ticker.Finish" => {
                let key = b"ticker.count";
                let count = self
                    .ctx
                    .storage
                    .get_value::<u64>(key)
                    .map_err(|e| e.to_string())?
                    .unwrap_or(0)
                    + 1;
                self.ctx
                    .storage
                    .put_value(key, &count)
                    .map_err(|e| e.to_string())?;
                self.result = Some(ScriptValue::Number(U256::from(count)));
                if self.ctx.task.is_some() {
                    self.outcome = Some(if call.name == "ticker.Finish" {
                        TaskOutcome::Finished
                    } else {
                        TaskOutcome::KeepRunning
                    });
                }
            }
            "ticker.Crash" => return Err("ticker crashed".to_string()),
            _ => {}
        }
        Ok(())
    }
}

impl ScriptRuntime for TestRuntime {
    fn execute(&self, mut ctx: ExecutionContext<'_>) -> Result<ExecutionResult, RuntimeError> {
        let calls = disassemble(&ctx.script[ctx.offset..], &self.table)
            .map_err(|e| RuntimeError(e.to_string()))?;

        let mut interpreter = Interpreter {
            ctx: &mut ctx,
            events: Vec::new(),
            gas_used: U256::zero(),
            payer: None,
            outcome: None,
            result: None,
        };
        for call in &calls {
            if let Err(message) = interpreter.call(call) {
                return Ok(ExecutionResult::fault(message, interpreter.gas_used));
            }
        }

        let mut result = ExecutionResult::halt(
            interpreter.events,
            interpreter.gas_used,
            interpreter.result,
        );
        if let Some(outcome) = interpreter.outcome {
            result = result.with_task_outcome(outcome);
        }
        Ok(result)
    }
}

// =============================================================================
// HARNESS
// =============================================================================

pub struct Harness {
    pub chain: Chain,
    pub nexus: Arc<TestNexus>,
    pub store: SharedStore,
    pub validator: SigningKey,
    pub user: SigningKey,
    nonce: Cell<u64>,
}

pub fn harness() -> Harness {
    harness_with(ChainConfig::default())
}

pub fn harness_with(config: ChainConfig) -> Harness {
    let validator = key(1);
    let nexus = Arc::new(TestNexus::new(vec![address_of(&validator)]));
    build_harness(nexus, validator, config)
}

/// Harness whose chain serves `feeds` through a [`BufferedOracle`].
pub fn harness_with_oracle(feeds: &[(&str, &[u8])]) -> Harness {
    let mut h = harness();
    let oracle = feeds
        .iter()
        .fold(BufferedOracle::new(), |oracle, (url, content)| {
            oracle.with_feed(*url, content.to_vec())
        });
    h.chain = Chain::new(
        CHAIN,
        h.nexus.clone(),
        h.store.clone(),
        Arc::new(TestRuntime::new()),
        ChainConfig::default(),
    )
    .with_signing_key(h.validator.clone())
    .with_oracle(Box::new(oracle));
    h
}

pub fn build_harness(nexus: Arc<TestNexus>, validator: SigningKey, config: ChainConfig) -> Harness {
    build_harness_over(shared_store(InMemoryKVStore::new()), nexus, validator, config)
}

/// Default harness over a caller-provided store.
pub fn harness_over(store: SharedStore) -> Harness {
    let validator = key(1);
    let nexus = Arc::new(TestNexus::new(vec![address_of(&validator)]));
    build_harness_over(store, nexus, validator, ChainConfig::default())
}

pub fn build_harness_over(
    store: SharedStore,
    nexus: Arc<TestNexus>,
    validator: SigningKey,
    config: ChainConfig,
) -> Harness {
    write_durable(&store, |storage| {
        storage.put(&contract_key("ticker"), b"deployed");
        storage.put(&contract_key("store"), b"deployed");
    });

    let chain = Chain::new(
        CHAIN,
        nexus.clone(),
        store.clone(),
        Arc::new(TestRuntime::new()),
        config,
    )
    .with_signing_key(validator.clone());

    Harness {
        chain,
        nexus,
        store,
        validator,
        user: key(2),
        nonce: Cell::new(0),
    }
}

/// Apply writes straight to the durable store.
pub fn write_durable(store: &SharedStore, write: impl FnOnce(&mut StorageChangeSet)) {
    let mut changeset = StorageChangeSet::new(store.clone());
    write(&mut changeset);
    changeset.execute().unwrap();
}

pub fn durable_get(store: &SharedStore, key: &[u8]) -> Option<Vec<u8>> {
    store.read().get(key).unwrap()
}

pub fn fuel_balance(store: &SharedStore, address: &Address) -> U256 {
    BalanceSheet::new(FUEL)
        .get(&StorageChangeSet::new(store.clone()), address)
        .unwrap()
}

/// Whole FUEL tokens in base units.
pub fn fuel(amount: u64) -> U256 {
    shared_types::unit_value(10) * U256::from(amount)
}

pub fn script(build: impl FnOnce(&mut ScriptBuilder)) -> Vec<u8> {
    let mut builder = ScriptBuilder::new();
    build(&mut builder);
    builder.end_script()
}

pub fn text(value: &str) -> ScriptValue {
    ScriptValue::String(value.to_string())
}

impl Harness {
    pub fn validator_address(&self) -> Address {
        address_of(&self.validator)
    }

    pub fn user_address(&self) -> Address {
        address_of(&self.user)
    }

    pub fn fund(&self, address: &Address, amount: U256) {
        write_durable(&self.store, |storage| {
            assert!(BalanceSheet::new(FUEL).add(storage, address, amount).unwrap());
        });
    }

    pub fn timestamp(height: u64) -> Timestamp {
        GENESIS_TIME + height * 10
    }

    /// Open block `height`, proposed by the harness validator.
    pub fn begin(&mut self, height: u64) -> Vec<Transaction> {
        let proposer = self.validator_address().to_string();
        let validators = self.nexus.primary_validators();
        self.chain
            .begin_block(
                &proposer,
                height,
                U256::from(MIN_FEE),
                Self::timestamp(height),
                &validators,
            )
            .unwrap()
    }

    /// Empty blocks up to and including `height`.
    pub fn advance_to(&mut self, height: u64) {
        let next = self.chain.height().unwrap() + 1;
        for h in next..=height {
            self.begin(h);
            self.chain.end_block().unwrap();
            self.chain.commit().unwrap();
        }
    }

    /// A user transaction signed by the harness user. Each call gets a
    /// distinct payload, so equal scripts still hash differently.
    pub fn user_tx(&self, script: Vec<u8>) -> Transaction {
        let nonce = self.nonce.get() + 1;
        self.nonce.set(nonce);
        let mut tx = Transaction::new(
            CHAIN,
            CHAIN,
            script,
            GENESIS_TIME + 1_000_000,
            nonce.to_be_bytes().to_vec(),
        );
        tx.sign(&self.user);
        tx
    }

    /// `AllowGas(user) + body + SpendGas(user)`.
    pub fn paid_tx(&self, body: impl FnOnce(&mut ScriptBuilder)) -> Transaction {
        let payer = self.user_address();
        self.user_tx(script(|b| {
            b.allow_gas(payer, Address::null(), U256::from(MIN_FEE), U256::from(GAS_LIMIT));
            body(b);
            b.spend_gas(payer);
        }))
    }

    pub fn deliver(&mut self, tx: Transaction) -> TransactionResult {
        self.chain.deliver_tx(tx).unwrap()
    }

    /// Create a task directly in durable storage.
    pub fn start_task(&self, spec: TaskSpec, height: u64) -> ChainTask {
        let mut task = None;
        write_durable(&self.store, |storage| {
            task = TaskStore::new()
                .start_task(storage, spec, height, Self::timestamp(height))
                .unwrap();
        });
        task.expect("ticker is deployed")
    }

    pub fn task_ids(&self) -> Vec<u64> {
        TaskStore::new()
            .list(&StorageChangeSet::new(self.store.clone()))
            .unwrap()
    }
}
