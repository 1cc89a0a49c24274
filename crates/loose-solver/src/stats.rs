//! Run statistics.
//!
//! Counters collected by one run of the builder, reported alongside the
//! associations and the dropped set.

use std::time::{Duration, Instant};

/// Why a row is missing from the published result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DropReason {
    /// Placement found no privacy-preserving association for the row.
    Unsatisfiable,
    /// Repair could not move the row out of an undersized group.
    Unreallocatable,
    /// The run was cancelled before the row was settled.
    Aborted,
}

/// Counters for a single run.
///
/// # Example
///
/// ```
/// use loose_solver::{DropReason, RunStats};
///
/// let mut stats = RunStats::default();
/// stats.start();
/// stats.record_placed();
/// stats.record_drop(DropReason::Unsatisfiable);
/// stats.record_drop(DropReason::Unreallocatable);
///
/// assert_eq!(stats.rows_placed, 1);
/// assert_eq!(stats.dropped_total(), 2);
/// ```
#[derive(Debug, Clone, Default)]
pub struct RunStats {
    start_time: Option<Instant>,
    duration: Option<Duration>,
    /// Rows considered by placement.
    pub rows_considered: u64,
    /// Rows committed by placement.
    pub rows_placed: u64,
    /// Candidate groups evaluated against the heterogeneity checks.
    pub candidates_evaluated: u64,
    /// Rows moved into a neighbouring group by repair.
    pub rows_moved: u64,
    /// Worklist operations processed by repair.
    pub operations_processed: u64,
    /// Rows dropped because placement failed.
    pub unsatisfiable: u64,
    /// Rows dropped because repair could not reallocate them.
    pub unreallocatable: u64,
    /// Rows dropped because the run was cancelled.
    pub aborted: u64,
}

impl RunStats {
    /// Marks the start of the run.
    pub fn start(&mut self) {
        self.start_time = Some(Instant::now());
        self.duration = None;
    }

    /// Freezes the elapsed time.
    pub fn finish(&mut self) {
        self.duration = Some(self.elapsed());
    }

    /// Returns the elapsed time, frozen once the run finished.
    pub fn elapsed(&self) -> Duration {
        self.duration
            .or_else(|| self.start_time.map(|t| t.elapsed()))
            .unwrap_or_default()
    }

    pub fn record_considered(&mut self) {
        self.rows_considered += 1;
    }

    pub fn record_placed(&mut self) {
        self.rows_placed += 1;
    }

    pub fn record_candidate(&mut self) {
        self.candidates_evaluated += 1;
    }

    pub fn record_move(&mut self) {
        self.rows_moved += 1;
    }

    pub fn record_operation(&mut self) {
        self.operations_processed += 1;
    }

    /// Records a dropped row under its reason.
    pub fn record_drop(&mut self, reason: DropReason) {
        match reason {
            DropReason::Unsatisfiable => self.unsatisfiable += 1,
            DropReason::Unreallocatable => self.unreallocatable += 1,
            DropReason::Aborted => self.aborted += 1,
        }
    }

    /// Returns the number of dropped rows across all reasons.
    pub fn dropped_total(&self) -> u64 {
        self.unsatisfiable + self.unreallocatable + self.aborted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_elapsed_frozen_after_finish() {
        let mut stats = RunStats::default();
        assert_eq!(stats.elapsed(), Duration::ZERO);
        stats.start();
        stats.finish();
        let frozen = stats.elapsed();
        std::thread::sleep(Duration::from_millis(2));
        assert_eq!(stats.elapsed(), frozen);
    }

    #[test]
    fn test_drop_counters() {
        let mut stats = RunStats::default();
        stats.record_drop(DropReason::Aborted);
        stats.record_drop(DropReason::Aborted);
        stats.record_drop(DropReason::Unreallocatable);
        assert_eq!(stats.aborted, 2);
        assert_eq!(stats.unreallocatable, 1);
        assert_eq!(stats.unsatisfiable, 0);
        assert_eq!(stats.dropped_total(), 3);
    }
}
