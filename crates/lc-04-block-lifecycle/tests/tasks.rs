//! # Scheduled Task Tests
//!
//! Tasks run while BeginBlock opens the block; their transactions are
//! signed by the node and become part of the block.
//!
//! ## Test Categories
//!
//! 1. **Scheduling**: block frequency, always-run tasks
//! 2. **Outcomes**: finished and crashed tasks are removed
//! 3. **Block Content**: task transactions are executed, signed and stored

mod common;

use common::*;
use lc_01_storage_overlay::{StorageChangeSet, StorageContextExt};
use lc_03_task_scheduler::{TaskFrequencyMode, TaskSpec, TaskStore, TASK_PAYLOAD};
use shared_types::{Address, ExecutionState, U256};

// =============================================================================
// TEST HELPERS
// =============================================================================

fn owner() -> Address {
    address_of(&key(5))
}

fn ticker(method: &str, mode: TaskFrequencyMode, frequency: u64) -> TaskSpec {
    TaskSpec {
        owner: owner(),
        contract: "ticker".to_string(),
        method: method.to_string(),
        frequency,
        delay: 0,
        mode,
        gas_limit: U256::from(GAS_LIMIT),
    }
}

fn make_funded_harness() -> Harness {
    let h = harness();
    h.fund(&owner(), fuel(10));
    h
}

fn tick_count(h: &Harness) -> u64 {
    StorageChangeSet::new(h.store.clone())
        .get_value::<u64>(b"ticker.count")
        .unwrap()
        .unwrap_or(0)
}

/// Open, close and commit `height`; returns the system transactions.
fn run_block(h: &mut Harness, height: u64) -> Vec<shared_types::Transaction> {
    let system = h.begin(height);
    h.chain.end_block().unwrap();
    h.chain.commit().unwrap();
    system
}

// =============================================================================
// SCHEDULING
// =============================================================================

#[test]
fn test_block_frequency_first_run_waits_from_creation() {
    let mut h = make_funded_harness();
    h.advance_to(99);
    let task = h.start_task(ticker("Finish", TaskFrequencyMode::Blocks, 10), 100);

    for height in 100..110 {
        assert!(run_block(&mut h, height).is_empty(), "ran early at {}", height);
    }
    assert_eq!(tick_count(&h), 0);

    let system = run_block(&mut h, 110);
    assert_eq!(system.len(), 1);
    assert_eq!(tick_count(&h), 1);
    assert!(h.task_ids().is_empty());
    assert!(TaskStore::new()
        .get(&StorageChangeSet::new(h.store.clone()), task.id)
        .unwrap()
        .is_none());

    assert!(run_block(&mut h, 111).is_empty());
}

#[test]
fn test_recurring_task_tracks_last_run() {
    let mut h = make_funded_harness();
    h.start_task(ticker("Tick", TaskFrequencyMode::Blocks, 2), 0);

    let ran: Vec<u64> = (1..=6)
        .filter(|height| !run_block(&mut h, *height).is_empty())
        .collect();

    assert_eq!(ran, vec![2, 4, 6]);
    assert_eq!(tick_count(&h), 3);
    assert_eq!(h.task_ids().len(), 1);
}

#[test]
fn test_always_task_runs_every_block() {
    let mut h = make_funded_harness();
    h.start_task(ticker("Tick", TaskFrequencyMode::Always, 0), 0);

    for height in 1..=3 {
        assert_eq!(run_block(&mut h, height).len(), 1);
    }
    assert_eq!(tick_count(&h), 3);
}

// =============================================================================
// OUTCOMES
// =============================================================================

#[test]
fn test_crashed_task_is_removed() {
    let mut h = make_funded_harness();
    h.start_task(ticker("Crash", TaskFrequencyMode::Always, 0), 0);

    let system = h.begin(1);
    assert_eq!(system.len(), 1);
    let hash = system[0].hash();
    assert_eq!(
        h.chain.current_block().unwrap().state_for_hash(&hash),
        Some(ExecutionState::Fault)
    );
    h.chain.end_block().unwrap();
    h.chain.commit().unwrap();

    assert!(h.task_ids().is_empty());
    assert!(run_block(&mut h, 2).is_empty());
    assert_eq!(h.chain.metrics().get_tasks_removed(), 1);
}

#[test]
fn test_unfunded_owner_crashes_task() {
    let mut h = harness();
    h.start_task(ticker("Tick", TaskFrequencyMode::Always, 0), 0);

    assert_eq!(run_block(&mut h, 1).len(), 1);
    assert_eq!(tick_count(&h), 0);
    assert!(h.task_ids().is_empty());
}

// =============================================================================
// BLOCK CONTENT
// =============================================================================

#[test]
fn test_task_transaction_is_signed_and_committed() {
    let mut h = make_funded_harness();
    h.start_task(ticker("Tick", TaskFrequencyMode::Always, 0), 0);

    let system = h.begin(1);
    let tx = system[0].clone();
    assert_eq!(tx.payload, TASK_PAYLOAD.to_vec());
    assert!(tx.is_signed_by(&h.validator_address()));
    assert_eq!(h.chain.pending_transactions(), &[tx.clone()][..]);

    h.chain.end_block().unwrap();
    let block_hash = h.chain.commit().unwrap();

    let hash = tx.hash();
    assert_eq!(h.chain.transaction_by_hash(&hash).unwrap(), Some(tx));
    assert_eq!(h.chain.block_hash_of_transaction(&hash).unwrap(), Some(block_hash));
    assert_eq!(h.chain.transaction_state(&hash).unwrap(), Some(ExecutionState::Halt));
    assert!(fuel_balance(&h.store, &owner()) < fuel(10));
    assert_eq!(h.chain.metrics().get_tasks_executed(), 1);
}

#[test]
fn test_task_runs_before_user_transactions() {
    let mut h = make_funded_harness();
    h.fund(&h.user_address(), fuel(10));
    h.start_task(ticker("Tick", TaskFrequencyMode::Always, 0), 0);

    let system = h.begin(1);
    let user_tx = h.paid_tx(|b| {
        b.call_contract("ticker", "Tick", Vec::new());
    });
    let result = h.deliver(user_tx);

    // The user call sees the task's write and reports no task outcome.
    assert!(result.is_success());
    assert_eq!(result.result, Some(shared_types::ScriptValue::Number(U256::from(2u64))));

    let block = h.chain.current_block().unwrap();
    assert_eq!(block.transaction_hashes[0], system[0].hash());
    assert_eq!(block.transaction_hashes.len(), 2);
}
