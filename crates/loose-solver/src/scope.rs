//! Per-run state.
//!
//! [`RunScope`] owns everything one run of the builder mutates: the
//! associations store, the dropped set, the group pointers, the random
//! generator and the statistics. Constraints and the table are borrowed
//! read-only, so independent scopes can run concurrently over them.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rand::Rng;
use smallvec::SmallVec;

use loose_core::{Association, FragmentId, GroupId, LooseError, Result, RowId, Table};

use crate::associations::Associations;
use crate::builder::LooseResult;
use crate::constraints::Constraints;
use crate::heterogeneity::{Heterogeneity, PartialAssociation};
use crate::stats::{DropReason, RunStats};

/// State of a single two-phase run.
pub struct RunScope<'a, T: Table, R: Rng> {
    table: &'a T,
    constraints: &'a Constraints,
    k_list: Vec<usize>,
    max_groups: Vec<usize>,
    first_nonfull: Vec<GroupId>,
    last_usable: Vec<GroupId>,
    associations: Associations,
    dropped: BTreeMap<RowId, DropReason>,
    skip_probability: f64,
    rng: R,
    abort_flags: SmallVec<[Arc<AtomicBool>; 2]>,
    aborted: bool,
    stats: RunStats,
}

impl<'a, T: Table, R: Rng> RunScope<'a, T, R> {
    /// Creates the scope for one run.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the k-list does not have one positive
    /// entry per fragment, or if `skip_probability` is outside `[0, 1)`.
    pub fn new(
        table: &'a T,
        constraints: &'a Constraints,
        k_list: &[usize],
        skip_probability: f64,
        rng: R,
    ) -> Result<Self> {
        let fragments = constraints.fragment_count();
        if k_list.len() != fragments {
            return Err(LooseError::KListLength {
                expected: fragments,
                actual: k_list.len(),
            });
        }
        if let Some(fragment) = k_list.iter().position(|&k| k == 0) {
            return Err(LooseError::Config(format!(
                "k for fragment {fragment} must be positive"
            )));
        }
        if !(0.0..1.0).contains(&skip_probability) {
            return Err(LooseError::Config(format!(
                "skip probability must be in [0, 1), got {skip_probability}"
            )));
        }

        let rows = table.len();
        Ok(Self {
            table,
            constraints,
            k_list: k_list.to_vec(),
            max_groups: k_list.iter().map(|&k| (rows / k).max(1)).collect(),
            first_nonfull: vec![0; fragments],
            last_usable: vec![0; fragments],
            associations: Associations::new(k_list.to_vec()),
            dropped: BTreeMap::new(),
            skip_probability,
            rng,
            abort_flags: SmallVec::new(),
            aborted: false,
            stats: RunStats::default(),
        })
    }

    /// Adds a flag that cancels the run once set.
    pub fn add_abort_flag(&mut self, flag: Arc<AtomicBool>) {
        self.abort_flags.push(flag);
    }

    pub fn start(&mut self) {
        self.stats.start();
    }

    pub fn table(&self) -> &'a T {
        self.table
    }

    pub fn constraints(&self) -> &'a Constraints {
        self.constraints
    }

    pub fn associations(&self) -> &Associations {
        &self.associations
    }

    pub fn dropped(&self) -> &BTreeMap<RowId, DropReason> {
        &self.dropped
    }

    pub fn stats(&self) -> &RunStats {
        &self.stats
    }

    pub fn stats_mut(&mut self) -> &mut RunStats {
        &mut self.stats
    }

    pub fn fragment_count(&self) -> usize {
        self.k_list.len()
    }

    /// Target capacity of a fragment's groups.
    pub fn k(&self, fragment: FragmentId) -> usize {
        self.k_list[fragment]
    }

    /// Lowest group id that may still be non-full.
    pub fn first_nonfull(&self, fragment: FragmentId) -> GroupId {
        self.first_nonfull[fragment]
    }

    /// Highest group id instantiated so far.
    pub fn last_usable(&self, fragment: FragmentId) -> GroupId {
        self.last_usable[fragment]
    }

    /// Number of groups a fragment may instantiate.
    pub fn max_groups(&self, fragment: FragmentId) -> usize {
        self.max_groups[fragment]
    }

    pub(crate) fn heterogeneity(&self) -> Heterogeneity<'_, T> {
        Heterogeneity::new(self.table, self.constraints, &self.associations)
    }

    /// Returns true once any abort flag has been observed set.
    pub fn is_terminate_early(&mut self) -> bool {
        if !self.aborted {
            self.aborted = self
                .abort_flags
                .iter()
                .any(|flag| flag.load(Ordering::SeqCst));
        }
        self.aborted
    }

    pub fn is_aborted(&self) -> bool {
        self.aborted
    }

    /// Candidate groups for placement in a fragment, ascending.
    ///
    /// Full groups are left out, and each remaining group is skipped with the
    /// configured probability. At most one never-used group is offered.
    pub fn candidates(&mut self, fragment: FragmentId) -> Vec<GroupId> {
        let lower = self.first_nonfull[fragment];
        let upper = (self.last_usable[fragment] + 1).min(self.max_groups[fragment] - 1);
        if lower > upper {
            return Vec::new();
        }

        let mut candidates = Vec::with_capacity(upper - lower + 1);
        for group in lower..=upper {
            if self.associations.is_group_full(fragment, group) {
                continue;
            }
            if self.skip_probability > 0.0 && self.rng.random_bool(self.skip_probability) {
                continue;
            }
            candidates.push(group);
        }
        candidates
    }

    /// Commits a placed row and advances the group pointers.
    pub fn commit(&mut self, row: RowId, association: Association) -> Result<()> {
        self.associations.set(row, association.clone())?;
        for (fragment, &group) in association.iter().enumerate() {
            self.last_usable[fragment] = self.last_usable[fragment].max(group);
            while self.first_nonfull[fragment] < self.max_groups[fragment]
                && self
                    .associations
                    .is_group_full(fragment, self.first_nonfull[fragment])
            {
                self.first_nonfull[fragment] += 1;
            }
        }
        self.stats.record_placed();
        Ok(())
    }

    /// Moves `row` to `target` in one fragment if the heterogeneity checks
    /// accept it there. Returns whether the row moved.
    pub fn try_move(&mut self, row: RowId, fragment: FragmentId, target: GroupId) -> Result<bool> {
        let Some(mut association) = self.associations.delete(row) else {
            return Ok(false);
        };

        let mut partial: PartialAssociation = association.iter().map(|&g| Some(g)).collect();
        partial[fragment] = None;
        let admitted = self.heterogeneity().admits(
            row,
            &partial,
            fragment,
            target,
            self.constraints.constraints_for(fragment),
        );

        if admitted {
            association[fragment] = target;
        }
        self.associations.set(row, association)?;
        Ok(admitted)
    }

    /// Records a row that never received an association.
    pub fn mark_dropped(&mut self, row: RowId, reason: DropReason) {
        if self.dropped.insert(row, reason).is_none() {
            self.stats.record_drop(reason);
        }
    }

    /// Removes a row's association and records it as dropped.
    pub fn drop_row(&mut self, row: RowId, reason: DropReason) -> Option<Association> {
        let association = self.associations.delete(row);
        self.mark_dropped(row, reason);
        association
    }

    /// Groups holding members but fewer than their target capacity, in
    /// fragment then group order.
    pub fn undersized_groups(&self) -> Vec<(FragmentId, GroupId)> {
        (0..self.fragment_count())
            .flat_map(|fragment| {
                (0..=self.last_usable[fragment])
                    .filter(move |&group| {
                        let size = self.associations.get_group_size(fragment, group);
                        size > 0 && size < self.k_list[fragment]
                    })
                    .map(move |group| (fragment, group))
            })
            .collect()
    }

    /// Drops every member of an undersized group, cascading until no such
    /// group remains. Used to settle a cancelled run.
    pub fn drop_undersized(&mut self) {
        loop {
            let rows: BTreeSet<RowId> = self
                .undersized_groups()
                .into_iter()
                .flat_map(|(fragment, group)| self.associations.get_group(fragment, group))
                .collect();
            if rows.is_empty() {
                break;
            }
            for row in rows {
                self.drop_row(row, DropReason::Aborted);
            }
        }
    }

    /// Finishes the run and hands off its artifacts.
    pub fn into_result(mut self) -> LooseResult {
        self.stats.finish();
        LooseResult {
            associations: self.associations,
            dropped: self.dropped,
            stats: self.stats,
            aborted: self.aborted,
        }
    }
}
