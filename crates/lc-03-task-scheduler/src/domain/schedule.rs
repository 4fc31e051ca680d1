//! Due-run decision.
//!
//! A task that has never run measures from its creation point: it waits
//! `delay` and also `frequency` before the first run. Afterwards it runs
//! whenever `current - last_run >= frequency`.

use super::task::{ChainTask, TaskFrequencyMode};

/// Why a task was not run this block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    Inactive,
    /// First run, start delay not yet reached.
    Delay,
    /// Ran (or was created) less than `frequency` ago.
    Frequency,
}

/// Decide whether `task` runs at `current`, given its last run if any.
pub fn is_due(task: &ChainTask, current: u64, last_run: Option<u64>) -> Result<(), SkipReason> {
    if !task.active {
        return Err(SkipReason::Inactive);
    }
    if task.mode == TaskFrequencyMode::Always {
        return Ok(());
    }

    let since = match last_run {
        Some(last) => last,
        None => {
            let created = task.creation_run();
            if current.saturating_sub(created) < task.delay {
                return Err(SkipReason::Delay);
            }
            created
        }
    };

    if current.saturating_sub(since) < task.frequency {
        return Err(SkipReason::Frequency);
    }
    Ok(())
}
