//! Repair of undersized groups.
//!
//! After placement, every non-empty group holding fewer than `k` members is
//! redistributed: each member is moved into a full neighbouring group that
//! admits it, and members nobody admits are dropped. Dropping a row can push
//! other full groups below `k`, which are then queued for redistribution in
//! turn. The worklist is drained last-in first-out.

use std::collections::VecDeque;
use std::iter::Rev;
use std::ops::{Range, RangeInclusive};
use std::time::Instant;

use rand::Rng;
use smallvec::SmallVec;
use tracing::{debug, info};

use loose_core::{FragmentId, GroupId, Result, RowId, Table};

use crate::phase::{speed, Phase};
use crate::scope::RunScope;
use crate::stats::DropReason;

/// A unit of repair work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// Move the members of an undersized group elsewhere.
    Redistribute {
        fragment: FragmentId,
        group: GroupId,
    },
    /// Drop a row that could not be moved.
    Delete { row: RowId },
}

/// Group ids around a centre, nearest first, alternating below and above.
///
/// # Example
///
/// ```
/// use loose_solver::Neighbours;
///
/// let order: Vec<usize> = Neighbours::new(2, 0, 5).collect();
/// assert_eq!(order, vec![1, 3, 0, 4, 5]);
/// ```
#[derive(Debug, Clone)]
pub struct Neighbours {
    below: Rev<Range<GroupId>>,
    above: RangeInclusive<GroupId>,
    below_next: bool,
}

impl Neighbours {
    /// Neighbours of `center` within `[lowest, highest]`, excluding `center`.
    pub fn new(center: GroupId, lowest: GroupId, highest: GroupId) -> Self {
        Self {
            below: (lowest..center).rev(),
            above: (center + 1)..=highest,
            below_next: true,
        }
    }
}

impl Iterator for Neighbours {
    type Item = GroupId;

    fn next(&mut self) -> Option<GroupId> {
        let below_next = self.below_next;
        self.below_next = !below_next;
        if below_next {
            self.below.next().or_else(|| self.above.next())
        } else {
            self.above.next().or_else(|| self.below.next())
        }
    }
}

/// Worklist-driven repair of undersized groups.
#[derive(Debug, Clone, Copy, Default)]
pub struct RepairPhase;

impl RepairPhase {
    pub fn new() -> Self {
        Self
    }

    fn leftovers<T: Table, R: Rng>(scope: &RunScope<'_, T, R>) -> VecDeque<Operation> {
        scope
            .undersized_groups()
            .into_iter()
            .map(|(fragment, group)| Operation::Redistribute { fragment, group })
            .collect()
    }

    fn redistribute<T: Table, R: Rng>(
        scope: &mut RunScope<'_, T, R>,
        fragment: FragmentId,
        group: GroupId,
        worklist: &mut VecDeque<Operation>,
    ) -> Result<()> {
        let size = scope.associations().get_group_size(fragment, group);
        if size == 0 || size >= scope.k(fragment) {
            return Ok(());
        }

        for row in scope.associations().get_group(fragment, group) {
            if !scope.associations().contains(row) {
                continue;
            }
            match Self::relocate(scope, row, fragment, group)? {
                Some(target) => {
                    debug!(event = "row_moved", row, fragment, from = group, to = target);
                    scope.stats_mut().record_move();
                }
                None => worklist.push_back(Operation::Delete { row }),
            }
        }
        Ok(())
    }

    fn relocate<T: Table, R: Rng>(
        scope: &mut RunScope<'_, T, R>,
        row: RowId,
        fragment: FragmentId,
        group: GroupId,
    ) -> Result<Option<GroupId>> {
        let highest = scope.last_usable(fragment);
        for target in Neighbours::new(group, 0, highest) {
            if !scope.associations().is_group_full(fragment, target) {
                continue;
            }
            scope.stats_mut().record_candidate();
            if scope.try_move(row, fragment, target)? {
                return Ok(Some(target));
            }
        }
        Ok(None)
    }

    fn delete<T: Table, R: Rng>(
        scope: &mut RunScope<'_, T, R>,
        row: RowId,
        worklist: &mut VecDeque<Operation>,
    ) {
        let Some(association) = scope.associations().get(row).cloned() else {
            return;
        };
        let was_full: SmallVec<[bool; 4]> = association
            .iter()
            .enumerate()
            .map(|(fragment, &group)| scope.associations().is_group_full(fragment, group))
            .collect();

        debug!(event = "row_dropped", row, reason = "unreallocatable");
        scope.drop_row(row, DropReason::Unreallocatable);

        for (fragment, &group) in association.iter().enumerate() {
            if was_full[fragment]
                && scope.associations().get_group_size(fragment, group) < scope.k(fragment)
            {
                worklist.push_back(Operation::Redistribute { fragment, group });
            }
        }
    }
}

impl<T: Table, R: Rng> Phase<T, R> for RepairPhase {
    fn solve(&mut self, scope: &mut RunScope<'_, T, R>) -> Result<()> {
        let started = Instant::now();
        let mut worklist = Self::leftovers(scope);

        info!(
            event = "phase_start",
            phase = "Repair",
            phase_index = 1,
            undersized = worklist.len(),
        );

        while let Some(operation) = worklist.pop_back() {
            if scope.is_terminate_early() {
                break;
            }
            scope.stats_mut().record_operation();
            match operation {
                Operation::Redistribute { fragment, group } => {
                    Self::redistribute(scope, fragment, group, &mut worklist)?
                }
                Operation::Delete { row } => Self::delete(scope, row, &mut worklist),
            }
        }

        let duration = started.elapsed();
        let steps = scope.stats().operations_processed;
        info!(
            event = "phase_end",
            phase = "Repair",
            phase_index = 1,
            duration_ms = duration.as_millis() as u64,
            steps = steps,
            speed = speed(steps, duration),
            moved = scope.stats().rows_moved,
            unreallocatable = scope.stats().unreallocatable,
        );
        Ok(())
    }

    fn phase_type_name(&self) -> &'static str {
        "Repair"
    }
}

#[cfg(test)]
mod tests {
    use loose_core::VecTable;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use smallvec::smallvec;

    use super::*;
    use crate::constraints::Constraints;
    use crate::test_utils::assert_consistent;

    #[test]
    fn test_neighbours_order() {
        let order: Vec<GroupId> = Neighbours::new(3, 0, 4).collect();
        assert_eq!(order, vec![2, 4, 1, 0]);

        let order: Vec<GroupId> = Neighbours::new(0, 0, 2).collect();
        assert_eq!(order, vec![1, 2]);

        assert_eq!(Neighbours::new(0, 0, 0).count(), 0);
    }

    fn scope_over<'a>(
        table: &'a VecTable<i64>,
        constraints: &'a Constraints,
        k_list: &[usize],
    ) -> RunScope<'a, VecTable<i64>, ChaCha8Rng> {
        RunScope::new(table, constraints, k_list, 0.0, ChaCha8Rng::seed_from_u64(0)).unwrap()
    }

    #[test]
    fn test_undersized_member_moves_to_full_neighbour() {
        let table =
            VecTable::with_numbered_attributes(2, (0..5).map(|i| vec![i, 10 + i]).collect())
                .unwrap();
        let constraints = Constraints::new(&[], &[vec![0], vec![1]]).unwrap();
        let mut scope = scope_over(&table, &constraints, &[2, 1]);

        scope.commit(0, smallvec![0, 0]).unwrap();
        scope.commit(1, smallvec![0, 1]).unwrap();
        scope.commit(2, smallvec![1, 2]).unwrap();
        scope.commit(3, smallvec![1, 3]).unwrap();
        scope.commit(4, smallvec![2, 4]).unwrap();

        RepairPhase::new().solve(&mut scope).unwrap();

        // group 1 is the nearest full neighbour of group 2
        assert!(scope.dropped().is_empty());
        assert_eq!(scope.associations().get(4).unwrap().to_vec(), vec![1, 4]);
        assert_eq!(scope.associations().get_group(0, 1), vec![2, 3, 4]);
        assert!(scope.undersized_groups().is_empty());
        assert_eq!(scope.stats().rows_moved, 1);
        assert_consistent(scope.associations());
    }

    #[test]
    fn test_unmovable_member_deleted_and_cascades() {
        // every row alike on fragment 0: nobody can join another group there
        let table =
            VecTable::with_numbered_attributes(2, (0..3).map(|i| vec![7, 10 + i]).collect())
                .unwrap();
        let constraints = Constraints::new(&[vec![0]], &[vec![0], vec![1]]).unwrap();
        let mut scope = scope_over(&table, &constraints, &[2, 2]);

        scope.commit(0, smallvec![0, 0]).unwrap();
        scope.commit(1, smallvec![1, 0]).unwrap();

        RepairPhase::new().solve(&mut scope).unwrap();

        assert!(scope.associations().is_empty());
        assert_eq!(scope.dropped().len(), 2);
        assert!(scope
            .dropped()
            .values()
            .all(|&reason| reason == DropReason::Unreallocatable));
        assert_consistent(scope.associations());
    }

    #[test]
    fn test_abort_stops_worklist() {
        use std::sync::atomic::AtomicBool;
        use std::sync::Arc;

        let table =
            VecTable::with_numbered_attributes(2, (0..3).map(|i| vec![i, 10 + i]).collect())
                .unwrap();
        let constraints = Constraints::new(&[], &[vec![0], vec![1]]).unwrap();
        let mut scope = scope_over(&table, &constraints, &[2, 2]);
        scope.commit(0, smallvec![0, 0]).unwrap();
        scope.add_abort_flag(Arc::new(AtomicBool::new(true)));

        RepairPhase::new().solve(&mut scope).unwrap();
        assert_eq!(scope.stats().operations_processed, 0);
        assert!(scope.is_aborted());

        scope.drop_undersized();
        assert!(scope.associations().is_empty());
        assert_eq!(scope.dropped().get(&0), Some(&DropReason::Aborted));
    }
}
