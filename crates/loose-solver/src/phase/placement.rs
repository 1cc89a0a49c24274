//! Greedy placement.
//!
//! Rows are placed in table order. For each row a depth-first search walks
//! the fragments in order, trying candidate groups ascending, and commits the
//! first complete association that passes every heterogeneity check. A row
//! with no admissible association is dropped.

use std::time::Instant;

use rand::Rng;
use smallvec::smallvec;
use tracing::{debug, info};

use loose_core::{Association, FragmentId, Result, RowId, Table};

use crate::heterogeneity::PartialAssociation;
use crate::phase::{speed, Phase};
use crate::scope::RunScope;
use crate::stats::DropReason;

/// First-fit depth-first placement of every row.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlacementPhase;

impl PlacementPhase {
    pub fn new() -> Self {
        Self
    }

    fn extend<T: Table, R: Rng>(
        scope: &mut RunScope<'_, T, R>,
        row: RowId,
        partial: &mut PartialAssociation,
        fragment: FragmentId,
    ) -> bool {
        if fragment == scope.fragment_count() {
            return true;
        }

        for group in scope.candidates(fragment) {
            scope.stats_mut().record_candidate();
            let admitted = scope.heterogeneity().admits(
                row,
                partial,
                fragment,
                group,
                scope.constraints().completed_with(fragment),
            );
            if !admitted {
                continue;
            }

            partial[fragment] = Some(group);
            if Self::extend(scope, row, partial, fragment + 1) {
                return true;
            }
            partial[fragment] = None;
        }
        false
    }
}

impl<T: Table, R: Rng> Phase<T, R> for PlacementPhase {
    fn solve(&mut self, scope: &mut RunScope<'_, T, R>) -> Result<()> {
        let started = Instant::now();
        let rows = scope.table().len();

        info!(
            event = "phase_start",
            phase = "Placement",
            phase_index = 0,
            rows = rows,
        );

        for row in 0..rows {
            if scope.is_terminate_early() {
                for pending in row..rows {
                    scope.mark_dropped(pending, DropReason::Aborted);
                }
                break;
            }

            scope.stats_mut().record_considered();
            let mut partial: PartialAssociation = smallvec![None; scope.fragment_count()];
            if Self::extend(scope, row, &mut partial, 0) {
                let association: Association = partial.iter().flatten().copied().collect();
                debug!(event = "row_placed", row, association = ?association.as_slice());
                scope.commit(row, association)?;
            } else {
                debug!(event = "row_dropped", row, reason = "unsatisfiable");
                scope.mark_dropped(row, DropReason::Unsatisfiable);
            }
        }

        let duration = started.elapsed();
        let steps = scope.stats().rows_considered;
        info!(
            event = "phase_end",
            phase = "Placement",
            phase_index = 0,
            duration_ms = duration.as_millis() as u64,
            steps = steps,
            speed = speed(steps, duration),
            placed = scope.stats().rows_placed,
            unsatisfiable = scope.stats().unsatisfiable,
        );
        Ok(())
    }

    fn phase_type_name(&self) -> &'static str {
        "Placement"
    }
}

#[cfg(test)]
mod tests {
    use loose_core::VecTable;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::*;
    use crate::constraints::Constraints;
    use crate::test_utils::assert_consistent;

    fn distinct_table(rows: usize) -> VecTable<i64> {
        let data = (0..rows as i64).map(|i| vec![i, 100 + i]).collect();
        VecTable::with_numbered_attributes(2, data).unwrap()
    }

    #[test]
    fn test_places_distinct_rows_first_fit() {
        let table = distinct_table(4);
        let constraints = Constraints::new(&[], &[vec![0], vec![1]]).unwrap();
        let mut scope = RunScope::new(
            &table,
            &constraints,
            &[2, 2],
            0.0,
            ChaCha8Rng::seed_from_u64(0),
        )
        .unwrap();

        PlacementPhase::new().solve(&mut scope).unwrap();

        let placed: Vec<Vec<usize>> = (0..4)
            .map(|row| scope.associations().get(row).unwrap().to_vec())
            .collect();
        assert_eq!(placed, vec![vec![0, 0], vec![0, 1], vec![1, 0], vec![1, 1]]);
        assert!(scope.dropped().is_empty());
        assert_eq!(scope.first_nonfull(0), 2);
        assert_eq!(scope.last_usable(1), 1);
        assert_consistent(scope.associations());
    }

    #[test]
    fn test_unplaceable_row_dropped() {
        // three rows alike on the only constraint; a single group per fragment
        let table = VecTable::with_numbered_attributes(
            2,
            vec![vec![1, 10], vec![1, 11], vec![1, 12]],
        )
        .unwrap();
        let constraints = Constraints::new(&[vec![0]], &[vec![0], vec![1]]).unwrap();
        let mut scope = RunScope::new(
            &table,
            &constraints,
            &[2, 2],
            0.0,
            ChaCha8Rng::seed_from_u64(0),
        )
        .unwrap();

        PlacementPhase::new().solve(&mut scope).unwrap();

        assert_eq!(scope.associations().len(), 1);
        assert_eq!(scope.dropped().get(&1), Some(&DropReason::Unsatisfiable));
        assert_eq!(scope.dropped().get(&2), Some(&DropReason::Unsatisfiable));
        assert_eq!(scope.stats().unsatisfiable, 2);
    }

    #[test]
    fn test_abort_drops_remaining_rows() {
        use std::sync::atomic::AtomicBool;
        use std::sync::Arc;

        let table = distinct_table(4);
        let constraints = Constraints::new(&[], &[vec![0], vec![1]]).unwrap();
        let mut scope = RunScope::new(
            &table,
            &constraints,
            &[2, 2],
            0.0,
            ChaCha8Rng::seed_from_u64(0),
        )
        .unwrap();
        scope.add_abort_flag(Arc::new(AtomicBool::new(true)));

        PlacementPhase::new().solve(&mut scope).unwrap();

        assert!(scope.is_aborted());
        assert!(scope.associations().is_empty());
        assert_eq!(scope.dropped().len(), 4);
        assert!(scope.dropped().values().all(|&r| r == DropReason::Aborted));
    }
}
