//! Metrics collection for the block lifecycle

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters for one chain
#[derive(Debug, Default)]
pub struct ChainMetrics {
    /// Blocks committed
    pub blocks_committed: AtomicU64,

    /// Transactions delivered (user and task)
    pub transactions_delivered: AtomicU64,

    /// Delivered transactions that did not halt
    pub transactions_faulted: AtomicU64,

    /// CheckTx rejections
    pub admission_rejections: AtomicU64,

    /// Task transactions executed
    pub tasks_executed: AtomicU64,

    /// Tasks removed after finishing or crashing
    pub tasks_removed: AtomicU64,

    /// Gas used by delivered transactions (saturating at u64::MAX)
    pub gas_used: AtomicU64,
}

impl ChainMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_delivery(&self, halted: bool, gas_used: u64) {
        self.transactions_delivered.fetch_add(1, Ordering::Relaxed);
        if !halted {
            self.transactions_faulted.fetch_add(1, Ordering::Relaxed);
        }
        let _ = self
            .gas_used
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |total| {
                Some(total.saturating_add(gas_used))
            });
    }

    pub fn record_rejection(&self) {
        self.admission_rejections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_tasks(&self, executed: usize, removed: usize) {
        self.tasks_executed
            .fetch_add(executed as u64, Ordering::Relaxed);
        self.tasks_removed.fetch_add(removed as u64, Ordering::Relaxed);
    }

    pub fn record_commit(&self) {
        self.blocks_committed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get_blocks_committed(&self) -> u64 {
        self.blocks_committed.load(Ordering::Relaxed)
    }

    pub fn get_transactions_delivered(&self) -> u64 {
        self.transactions_delivered.load(Ordering::Relaxed)
    }

    pub fn get_transactions_faulted(&self) -> u64 {
        self.transactions_faulted.load(Ordering::Relaxed)
    }

    pub fn get_admission_rejections(&self) -> u64 {
        self.admission_rejections.load(Ordering::Relaxed)
    }

    pub fn get_tasks_executed(&self) -> u64 {
        self.tasks_executed.load(Ordering::Relaxed)
    }

    pub fn get_tasks_removed(&self) -> u64 {
        self.tasks_removed.load(Ordering::Relaxed)
    }

    pub fn get_gas_used(&self) -> u64 {
        self.gas_used.load(Ordering::Relaxed)
    }

    /// Share of delivered transactions that faulted
    pub fn get_fault_ratio(&self) -> f64 {
        let delivered = self.get_transactions_delivered();
        if delivered == 0 {
            return 0.0;
        }
        self.get_transactions_faulted() as f64 / delivered as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_recording() {
        let metrics = ChainMetrics::new();

        metrics.record_delivery(true, 100);
        metrics.record_delivery(false, 50);
        metrics.record_commit();

        assert_eq!(metrics.get_transactions_delivered(), 2);
        assert_eq!(metrics.get_transactions_faulted(), 1);
        assert_eq!(metrics.get_gas_used(), 150);
        assert_eq!(metrics.get_blocks_committed(), 1);
        assert_eq!(metrics.get_fault_ratio(), 0.5);
    }

    #[test]
    fn test_gas_saturates() {
        let metrics = ChainMetrics::new();
        metrics.record_delivery(true, u64::MAX);
        metrics.record_delivery(true, 10);
        assert_eq!(metrics.get_gas_used(), u64::MAX);
    }
}
