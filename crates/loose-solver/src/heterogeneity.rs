//! Admissibility of a row in a candidate group.
//!
//! Three checks run in order and short-circuit:
//!
//! 1. group heterogeneity: no current member of the candidate group is alike
//!    the row in that fragment;
//! 2. association heterogeneity: no committed row already pairs the candidate
//!    group with a group the row holds in another fragment;
//! 3. deep heterogeneity: for every multi-fragment constraint whose fragments
//!    are all decided, no two rows that share a group become indistinguishable
//!    in every other involved fragment once the row joins its groups.
//!
//! The row under test is not in the store yet. Check 3 treats it as a member
//! of every group of its partial association.

use smallvec::SmallVec;
use tracing::trace;

use loose_core::{Association, ConstraintId, FragmentId, GroupId, RowId, Table};

use crate::associations::Associations;
use crate::constraints::Constraints;

/// Association under construction; `None` marks an undecided fragment.
pub type PartialAssociation = SmallVec<[Option<GroupId>; 4]>;

/// The row under test with the groups it would hold.
#[derive(Clone, Copy)]
struct Pending<'p> {
    row: RowId,
    groups: &'p [Option<GroupId>],
}

impl Pending<'_> {
    fn joins(&self, fragment: FragmentId, group: GroupId) -> bool {
        self.groups[fragment] == Some(group)
    }
}

/// One side of a pair compared by the deep check.
#[derive(Clone, Copy)]
enum Side<'s> {
    Pending,
    Committed(&'s Association),
}

impl Side<'_> {
    fn group(&self, pending: &Pending<'_>, fragment: FragmentId) -> Option<GroupId> {
        match self {
            Side::Pending => pending.groups[fragment],
            Side::Committed(association) => Some(association[fragment]),
        }
    }
}

pub(crate) struct Heterogeneity<'r, T: Table> {
    table: &'r T,
    constraints: &'r Constraints,
    associations: &'r Associations,
}

impl<'r, T: Table> Heterogeneity<'r, T> {
    pub(crate) fn new(
        table: &'r T,
        constraints: &'r Constraints,
        associations: &'r Associations,
    ) -> Self {
        Self {
            table,
            constraints,
            associations,
        }
    }

    /// Returns true iff `row` may join `group` in `fragment`, given the groups
    /// already decided in `partial`. `deep` lists the constraints the deep
    /// check evaluates.
    pub(crate) fn admits(
        &self,
        row: RowId,
        partial: &[Option<GroupId>],
        fragment: FragmentId,
        group: GroupId,
        deep: &[ConstraintId],
    ) -> bool {
        if !self.group_heterogeneous(row, fragment, group) {
            trace!(event = "candidate_rejected", row, fragment, group, check = "group");
            return false;
        }

        let mut extended: PartialAssociation = partial.iter().copied().collect();
        extended[fragment] = Some(group);

        if !self.association_heterogeneous(&extended, fragment, group) {
            trace!(event = "candidate_rejected", row, fragment, group, check = "association");
            return false;
        }

        let pending = Pending {
            row,
            groups: &extended,
        };
        if let Some(&constraint) = deep
            .iter()
            .find(|&&constraint| !self.deep_heterogeneous(&pending, constraint))
        {
            trace!(
                event = "candidate_rejected",
                row,
                fragment,
                group,
                check = "deep",
                constraint
            );
            return false;
        }
        true
    }

    fn group_heterogeneous(&self, row: RowId, fragment: FragmentId, group: GroupId) -> bool {
        let values = self.table.row(row);
        self.associations
            .members(fragment, group)
            .into_iter()
            .flatten()
            .filter(|&&member| member != row)
            .all(|&member| {
                !self
                    .constraints
                    .are_rows_alike(values, self.table.row(member), fragment)
            })
    }

    fn association_heterogeneous(
        &self,
        extended: &[Option<GroupId>],
        fragment: FragmentId,
        group: GroupId,
    ) -> bool {
        extended
            .iter()
            .enumerate()
            .filter(|&(other, _)| other != fragment)
            .filter_map(|(other, decided)| decided.map(|g| (other, g)))
            .all(|(other, other_group)| {
                !self
                    .associations
                    .exists(fragment, group, other, other_group)
            })
    }

    fn deep_heterogeneous(&self, pending: &Pending<'_>, constraint: ConstraintId) -> bool {
        let involved = self.constraints.involved_fragments_for(constraint);
        if involved.len() < 2 {
            return true;
        }
        let Some(groups) = involved
            .iter()
            .map(|&f| pending.groups[f].map(|g| (f, g)))
            .collect::<Option<SmallVec<[(FragmentId, GroupId); 4]>>>()
        else {
            return true;
        };

        // the pending row against every row it would share a group with
        for &(shared, group) in &groups {
            for (_, association) in self.associations.get_associated(shared, group) {
                if self.forced_alike(
                    pending,
                    Side::Pending,
                    Side::Committed(association),
                    shared,
                    constraint,
                ) {
                    return false;
                }
            }
        }

        // committed pairs whose groups the pending row joins
        for &(joined, group) in &groups {
            for (first, first_association) in self.associations.get_associated(joined, group) {
                for &shared in involved.iter().filter(|&&f| f != joined) {
                    let partners = self
                        .associations
                        .get_associated(shared, first_association[shared]);
                    for (second, second_association) in partners {
                        if second == first {
                            continue;
                        }
                        if self.forced_alike(
                            pending,
                            Side::Committed(first_association),
                            Side::Committed(second_association),
                            shared,
                            constraint,
                        ) {
                            return false;
                        }
                    }
                }
            }
        }
        true
    }

    /// Two sides sharing a group in `shared` are forced alike when every other
    /// involved fragment pairs their groups through some alike members.
    fn forced_alike(
        &self,
        pending: &Pending<'_>,
        x: Side<'_>,
        y: Side<'_>,
        shared: FragmentId,
        constraint: ConstraintId,
    ) -> bool {
        self.constraints
            .involved_fragments_for(constraint)
            .iter()
            .filter(|&&f| f != shared)
            .all(|&f| match (x.group(pending, f), y.group(pending, f)) {
                (Some(gx), Some(gy)) => self.groups_alike(pending, f, gx, gy, constraint),
                _ => false,
            })
    }

    fn groups_alike(
        &self,
        pending: &Pending<'_>,
        fragment: FragmentId,
        group1: GroupId,
        group2: GroupId,
        constraint: ConstraintId,
    ) -> bool {
        self.members_with(pending, fragment, group1).any(|x| {
            let values = self.table.row(x);
            self.members_with(pending, fragment, group2).any(|y| {
                self.constraints
                    .are_rows_alike_for(values, self.table.row(y), fragment, constraint)
            })
        })
    }

    fn members_with<'m>(
        &'m self,
        pending: &'m Pending<'_>,
        fragment: FragmentId,
        group: GroupId,
    ) -> impl Iterator<Item = RowId> + 'm {
        let virtual_member = pending.joins(fragment, group).then_some(pending.row);
        self.associations
            .members(fragment, group)
            .into_iter()
            .flatten()
            .copied()
            .chain(virtual_member)
    }
}
