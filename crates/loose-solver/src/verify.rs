//! Post-hoc verification of a published result.
//!
//! These checks recompute every structural and privacy property of a result
//! from scratch, independently of the incremental checks used while building
//! it. They are quadratic in the group sizes and meant for tests and audits.

use std::collections::BTreeSet;

use thiserror::Error;

use loose_core::{ConstraintId, FragmentId, GroupId, RowId, Table};

use crate::associations::Associations;
use crate::builder::LooseResult;
use crate::constraints::Constraints;

/// A broken invariant.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Violation {
    #[error("row {row} has {actual} groups, expected {expected}")]
    AssociationLength {
        row: RowId,
        expected: usize,
        actual: usize,
    },

    #[error("row {row} is missing from group {group} of fragment {fragment}")]
    MissingMember {
        row: RowId,
        fragment: FragmentId,
        group: GroupId,
    },

    #[error("group {group} of fragment {fragment} lists row {row}, which is not assigned there")]
    StaleMember {
        row: RowId,
        fragment: FragmentId,
        group: GroupId,
    },

    #[error("group {group} of fragment {fragment} has {size} members but full flag is {flagged}")]
    FullFlag {
        fragment: FragmentId,
        group: GroupId,
        size: usize,
        flagged: bool,
    },

    #[error("row {row} is both retained and dropped")]
    RetainedAndDropped { row: RowId },

    #[error("row {row} is neither retained nor dropped")]
    Unaccounted { row: RowId },

    #[error("group {group} of fragment {fragment} has {size} members, fewer than {k}")]
    Undersized {
        fragment: FragmentId,
        group: GroupId,
        size: usize,
        k: usize,
    },

    #[error("rows {first} and {second} share group {group} of fragment {fragment} but are alike")]
    AlikeInGroup {
        first: RowId,
        second: RowId,
        fragment: FragmentId,
        group: GroupId,
    },

    #[error("rows {first} and {second} share groups in fragments {fragment1} and {fragment2}")]
    SharedPair {
        first: RowId,
        second: RowId,
        fragment1: FragmentId,
        fragment2: FragmentId,
    },

    #[error("rows {first} and {second} are indistinguishable under constraint {constraint}")]
    Inferable {
        first: RowId,
        second: RowId,
        constraint: ConstraintId,
    },
}

/// Checks that the forward map, the reverse indices and the full flags agree.
pub fn check_consistency(associations: &Associations) -> Vec<Violation> {
    let mut violations = Vec::new();
    let fragments = associations.fragment_count();

    for (row, association) in associations.iter() {
        if association.len() != fragments {
            violations.push(Violation::AssociationLength {
                row,
                expected: fragments,
                actual: association.len(),
            });
            continue;
        }
        for (fragment, &group) in association.iter().enumerate() {
            let indexed = associations
                .members(fragment, group)
                .is_some_and(|members| members.contains(&row));
            if !indexed {
                violations.push(Violation::MissingMember {
                    row,
                    fragment,
                    group,
                });
            }
        }
    }

    for fragment in 0..fragments {
        let k = associations.k_list()[fragment];
        for (group, members) in associations.get_groups(fragment).iter().enumerate() {
            for &row in members {
                if associations.get(row).and_then(|a| a.get(fragment)) != Some(&group) {
                    violations.push(Violation::StaleMember {
                        row,
                        fragment,
                        group,
                    });
                }
            }
            let flagged = associations.is_group_full(fragment, group);
            if flagged != (members.len() == k) {
                violations.push(Violation::FullFlag {
                    fragment,
                    group,
                    size: members.len(),
                    flagged,
                });
            }
        }
    }
    violations
}

/// Checks every property of a result: consistency, row accounting, group
/// sizes, and the three heterogeneity properties.
pub fn check_result<T: Table>(
    table: &T,
    constraints: &Constraints,
    result: &LooseResult,
) -> Vec<Violation> {
    let associations = &result.associations;
    let mut violations = check_consistency(associations);

    for row in 0..table.len() {
        match (associations.contains(row), result.dropped.contains_key(&row)) {
            (true, true) => violations.push(Violation::RetainedAndDropped { row }),
            (false, false) => violations.push(Violation::Unaccounted { row }),
            _ => {}
        }
    }

    for fragment in 0..associations.fragment_count() {
        let k = associations.k_list()[fragment];
        for (group, members) in associations.get_groups(fragment).iter().enumerate() {
            if !members.is_empty() && members.len() < k {
                violations.push(Violation::Undersized {
                    fragment,
                    group,
                    size: members.len(),
                    k,
                });
            }
            violations.extend(alike_in_group(table, constraints, fragment, group, members));
        }
    }

    violations.extend(shared_pairs(associations));
    violations.extend(inferable_pairs(table, constraints, associations));
    violations
}

fn alike_in_group<T: Table>(
    table: &T,
    constraints: &Constraints,
    fragment: FragmentId,
    group: GroupId,
    members: &BTreeSet<RowId>,
) -> Vec<Violation> {
    let members: Vec<RowId> = members.iter().copied().collect();
    let mut violations = Vec::new();
    for (i, &first) in members.iter().enumerate() {
        for &second in &members[i + 1..] {
            if constraints.are_rows_alike(table.row(first), table.row(second), fragment) {
                violations.push(Violation::AlikeInGroup {
                    first,
                    second,
                    fragment,
                    group,
                });
            }
        }
    }
    violations
}

fn shared_pairs(associations: &Associations) -> Vec<Violation> {
    let rows: Vec<_> = associations.iter().collect();
    let mut violations = Vec::new();
    for (i, &(first, a)) in rows.iter().enumerate() {
        for &(second, b) in &rows[i + 1..] {
            let shared: Vec<FragmentId> = (0..a.len()).filter(|&f| a[f] == b[f]).collect();
            if let [fragment1, fragment2, ..] = shared[..] {
                violations.push(Violation::SharedPair {
                    first,
                    second,
                    fragment1,
                    fragment2,
                });
            }
        }
    }
    violations
}

fn groups_alike<T: Table>(
    table: &T,
    constraints: &Constraints,
    associations: &Associations,
    fragment: FragmentId,
    groups: (GroupId, GroupId),
    constraint: ConstraintId,
) -> bool {
    let members = move |group: GroupId| associations.members(fragment, group).into_iter().flatten();
    members(groups.0).any(|&x| {
        members(groups.1).any(|&y| {
            constraints.are_rows_alike_for(table.row(x), table.row(y), fragment, constraint)
        })
    })
}

fn inferable_pairs<T: Table>(
    table: &T,
    constraints: &Constraints,
    associations: &Associations,
) -> Vec<Violation> {
    let mut found = BTreeSet::new();
    for constraint in 0..constraints.len() {
        let involved = constraints.involved_fragments_for(constraint);
        if involved.len() < 2 {
            continue;
        }
        for &shared in involved {
            for members in associations.get_groups(shared) {
                let members: Vec<RowId> = members.iter().copied().collect();
                for (i, &first) in members.iter().enumerate() {
                    for &second in &members[i + 1..] {
                        let (Some(a), Some(b)) = (associations.get(first), associations.get(second))
                        else {
                            continue;
                        };
                        let forced = involved.iter().filter(|&&f| f != shared).all(|&f| {
                            groups_alike(
                                table,
                                constraints,
                                associations,
                                f,
                                (a[f], b[f]),
                                constraint,
                            )
                        });
                        if forced {
                            found.insert((first, second, constraint));
                        }
                    }
                }
            }
        }
    }
    found
        .into_iter()
        .map(|(first, second, constraint)| Violation::Inferable {
            first,
            second,
            constraint,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use loose_core::VecTable;
    use smallvec::smallvec;

    use super::*;
    use crate::stats::RunStats;

    fn result(associations: Associations) -> LooseResult {
        LooseResult {
            associations,
            dropped: Default::default(),
            stats: RunStats::default(),
            aborted: false,
        }
    }

    #[test]
    fn test_clean_result_has_no_violations() {
        let table =
            VecTable::with_numbered_attributes(2, (0..4).map(|i| vec![i, 10 + i]).collect())
                .unwrap();
        let constraints = Constraints::new(&[vec![0, 1]], &[vec![0], vec![1]]).unwrap();
        let mut a = Associations::new(vec![2, 2]);
        a.set(0, smallvec![0, 0]).unwrap();
        a.set(1, smallvec![0, 1]).unwrap();
        a.set(2, smallvec![1, 0]).unwrap();
        a.set(3, smallvec![1, 1]).unwrap();

        assert!(check_result(&table, &constraints, &result(a)).is_empty());
    }

    #[test]
    fn test_reports_broken_privacy() {
        let table =
            VecTable::with_numbered_attributes(2, vec![vec![1, 1], vec![1, 2], vec![3, 3]])
                .unwrap();
        let constraints = Constraints::new(&[vec![0]], &[vec![0], vec![1]]).unwrap();
        let mut a = Associations::new(vec![1, 1]);
        a.set(0, smallvec![0, 0]).unwrap();
        a.set(1, smallvec![0, 1]).unwrap();
        a.set(2, smallvec![0, 1]).unwrap();

        let violations = check_result(&table, &constraints, &result(a));
        assert!(violations.contains(&Violation::AlikeInGroup {
            first: 0,
            second: 1,
            fragment: 0,
            group: 0
        }));
        assert!(violations.contains(&Violation::SharedPair {
            first: 1,
            second: 2,
            fragment1: 0,
            fragment2: 1
        }));
    }

    #[test]
    fn test_reports_unaccounted_and_undersized() {
        let table =
            VecTable::with_numbered_attributes(2, vec![vec![1, 1], vec![2, 2]]).unwrap();
        let constraints = Constraints::new(&[], &[vec![0], vec![1]]).unwrap();
        let mut a = Associations::new(vec![2, 2]);
        a.set(0, smallvec![0, 0]).unwrap();

        let violations = check_result(&table, &constraints, &result(a));
        assert!(violations.contains(&Violation::Unaccounted { row: 1 }));
        assert!(violations.contains(&Violation::Undersized {
            fragment: 0,
            group: 0,
            size: 1,
            k: 2
        }));
    }
}
