//! Worker state machine
//!
//! Tracks local worker phase and counters. Nothing here is shared with
//! other processes.

use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::RwLock;

use crate::access_log::WorkerId;

/// Diagnostic task identifier, increasing across all rounds of a worker
pub type TaskId = u64;

/// Worker phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerPhase {
    /// Shared state opened, not yet reported ready
    Initializing,
    /// Reported ready, waiting for the go signal
    AwaitingGo,
    /// Running rounds
    Running,
    /// Termination observed, releasing handles
    Finished,
    /// Aborted by an error
    Failed,
}

/// Counters reported when a worker exits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerStats {
    /// Worker ID
    pub worker_id: WorkerId,
    /// Rounds run to completion
    pub rounds: u64,
    /// Records appended to the access log
    pub appends: u64,
}

/// Local worker state
pub struct WorkerState {
    worker_id: WorkerId,
    phase: RwLock<WorkerPhase>,
    next_task_id: AtomicU64,
    rounds: AtomicU64,
    appends: AtomicU64,
}

impl WorkerState {
    /// Create state for a worker
    pub fn new(worker_id: WorkerId) -> Self {
        Self {
            worker_id,
            phase: RwLock::new(WorkerPhase::Initializing),
            next_task_id: AtomicU64::new(0),
            rounds: AtomicU64::new(0),
            appends: AtomicU64::new(0),
        }
    }

    /// Worker ID
    pub fn worker_id(&self) -> WorkerId {
        self.worker_id
    }

    /// Get current phase
    pub async fn phase(&self) -> WorkerPhase {
        *self.phase.read().await
    }

    /// Set phase
    pub async fn set_phase(&self, phase: WorkerPhase) {
        *self.phase.write().await = phase;
    }

    /// Allocate the next task ID
    pub fn next_task_id(&self) -> TaskId {
        self.next_task_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Record a completed round
    pub fn complete_round(&self) -> u64 {
        self.rounds.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Record a successful append
    pub fn record_append(&self) {
        self.appends.fetch_add(1, Ordering::Relaxed);
    }

    /// Rounds completed so far
    pub fn rounds(&self) -> u64 {
        self.rounds.load(Ordering::Relaxed)
    }

    /// Snapshot of the counters
    pub fn stats(&self) -> WorkerStats {
        WorkerStats {
            worker_id: self.worker_id,
            rounds: self.rounds.load(Ordering::Relaxed),
            appends: self.appends.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_ids_increase() {
        let state = WorkerState::new(3);
        assert_eq!(state.next_task_id(), 0);
        assert_eq!(state.next_task_id(), 1);
        assert_eq!(state.next_task_id(), 2);
    }

    #[tokio::test]
    async fn test_phase_transitions() {
        let state = WorkerState::new(0);
        assert_eq!(state.phase().await, WorkerPhase::Initializing);
        state.set_phase(WorkerPhase::Running).await;
        assert_eq!(state.phase().await, WorkerPhase::Running);
    }

    #[test]
    fn test_stats_snapshot() {
        let state = WorkerState::new(7);
        state.record_append();
        state.record_append();
        assert_eq!(state.complete_round(), 1);

        assert_eq!(
            state.stats(),
            WorkerStats {
                worker_id: 7,
                rounds: 1,
                appends: 2
            }
        );
    }
}
