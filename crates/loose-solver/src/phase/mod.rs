//! Phases of a run.
//!
//! A run executes two phases in sequence over one [`RunScope`]:
//! - [`PlacementPhase`]: greedy depth-first placement of every row
//! - [`RepairPhase`]: redistributes or drops members of undersized groups

pub mod placement;
pub mod repair;

use loose_core::{Result, Table};
use rand::Rng;

use crate::scope::RunScope;

pub use placement::PlacementPhase;
pub use repair::{Neighbours, Operation, RepairPhase};

/// A phase of a run.
///
/// Phases mutate the associations store held by the scope and record what
/// they dropped there.
pub trait Phase<T: Table, R: Rng> {
    /// Executes this phase.
    fn solve(&mut self, scope: &mut RunScope<'_, T, R>) -> Result<()>;

    /// Returns the name of this phase type.
    fn phase_type_name(&self) -> &'static str;
}

/// Rows or operations per second over `duration`.
pub(crate) fn speed(steps: u64, duration: std::time::Duration) -> u64 {
    if duration.as_secs_f64() > 0.0 {
        (steps as f64 / duration.as_secs_f64()) as u64
    } else {
        0
    }
}
