//! Post-run access aggregation
//!
//! Tallies how often each worker appended to the access log and picks the
//! busiest one.

use std::collections::BTreeMap;
use std::fmt;

use crate::access_log::WorkerId;
use crate::error::{FanoutError, Result};

/// Per-worker append counts, indexed by worker id
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessTally {
    counts: Vec<u64>,
}

impl AccessTally {
    /// Count records for a run of `workers` workers.
    ///
    /// A record naming a worker outside `0..workers` means the log is corrupt.
    pub fn from_records(workers: u32, records: &[WorkerId]) -> Result<Self> {
        let mut counts = vec![0u64; workers as usize];
        for &worker_id in records {
            let slot = counts
                .get_mut(worker_id as usize)
                .ok_or(FanoutError::UnknownWorker { worker_id, workers })?;
            *slot += 1;
        }
        Ok(Self { counts })
    }

    /// Appends by one worker (0 for unknown ids)
    pub fn count(&self, worker_id: WorkerId) -> u64 {
        self.counts.get(worker_id as usize).copied().unwrap_or(0)
    }

    /// Counts in worker id order
    pub fn counts(&self) -> &[u64] {
        &self.counts
    }

    /// Sum of all counts
    pub fn total(&self) -> u64 {
        self.counts.iter().sum()
    }

    /// Worker with the strictly greatest count; the lowest id wins a tie.
    /// `None` when nothing was appended.
    pub fn busiest(&self) -> Option<(WorkerId, u64)> {
        busiest_of(
            self.counts
                .iter()
                .enumerate()
                .map(|(worker_id, &count)| (worker_id as WorkerId, count)),
        )
    }
}

/// Strictly greatest count over `(id, count)` pairs given in ascending id
/// order, skipping zero counts
fn busiest_of<I>(counts: I) -> Option<(WorkerId, u64)>
where
    I: IntoIterator<Item = (WorkerId, u64)>,
{
    let mut best: Option<(WorkerId, u64)> = None;
    for (worker_id, count) in counts {
        if count == 0 {
            continue;
        }
        if best.map_or(true, |(_, max)| count > max) {
            best = Some((worker_id, count));
        }
    }
    best
}

/// Busiest worker and its count; `None` for an empty record sequence
pub fn summarize(records: &[WorkerId]) -> Option<(WorkerId, u64)> {
    // Sparse tally: ids are not bounded by any worker count here
    let mut counts: BTreeMap<WorkerId, u64> = BTreeMap::new();
    for &worker_id in records {
        *counts.entry(worker_id).or_insert(0) += 1;
    }
    busiest_of(counts)
}

/// Outcome of a successful run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    /// Per-worker counts
    pub tally: AccessTally,
    /// Busiest worker, if any record was written
    pub busiest: Option<(WorkerId, u64)>,
}

impl RunReport {
    /// Build the report for `workers` workers from the raw records
    pub fn from_records(workers: u32, records: &[WorkerId]) -> Result<Self> {
        let tally = AccessTally::from_records(workers, records)?;
        let busiest = tally.busiest();
        Ok(Self { tally, busiest })
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (worker_id, count) in self.tally.counts().iter().enumerate() {
            writeln!(f, "Worker {} accessed the log {} times", worker_id, count)?;
        }
        match self.busiest {
            Some((worker_id, count)) => write!(
                f,
                "===> The worker that accessed the log most often is {} ({} accesses)",
                worker_id, count
            ),
            None => write!(f, "===> The access log is empty"),
        }
    }
}
