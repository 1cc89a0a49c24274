//! Indexed group-membership store.
//!
//! [`Associations`] is the single owner of row-to-group assignments. It keeps
//! a forward map (row → association), a reverse index per fragment
//! (group → members) and the set of full groups per fragment, and updates the
//! three together on every mutation.

use std::collections::{BTreeMap, BTreeSet};

use loose_core::{Association, FragmentId, GroupId, LooseError, Result, RowId};

/// Row → per-fragment group assignment with reverse indices.
///
/// A group is full exactly when its member count equals the target capacity
/// of its fragment.
///
/// # Example
///
/// ```
/// use loose_solver::Associations;
/// use smallvec::smallvec;
///
/// let mut associations = Associations::new(vec![2, 2]);
/// associations.set(0, smallvec![0, 0]).unwrap();
/// associations.set(1, smallvec![0, 1]).unwrap();
///
/// assert!(associations.is_group_full(0, 0));
/// assert!(!associations.is_group_full(1, 0));
/// assert_eq!(associations.get_group(0, 0), vec![0, 1]);
/// assert!(associations.exists(0, 0, 1, 1));
///
/// associations.delete(1);
/// assert!(!associations.is_group_full(0, 0));
/// ```
#[derive(Debug, Clone, Default)]
pub struct Associations {
    k_list: Vec<usize>,
    data: BTreeMap<RowId, Association>,
    // [fragment][group] -> members
    indices: Vec<Vec<BTreeSet<RowId>>>,
    full: Vec<BTreeSet<GroupId>>,
}

impl Associations {
    /// Creates an empty store with one target capacity per fragment.
    pub fn new(k_list: Vec<usize>) -> Self {
        let fragments = k_list.len();
        Self {
            k_list,
            data: BTreeMap::new(),
            indices: vec![Vec::new(); fragments],
            full: vec![BTreeSet::new(); fragments],
        }
    }

    /// Returns the number of fragments.
    pub fn fragment_count(&self) -> usize {
        self.k_list.len()
    }

    /// Returns the target capacities.
    pub fn k_list(&self) -> &[usize] {
        &self.k_list
    }

    /// Returns the number of rows with an association.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns true if no row has an association.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Returns true if `row` has an association.
    pub fn contains(&self, row: RowId) -> bool {
        self.data.contains_key(&row)
    }

    /// Returns the association of `row`.
    pub fn get(&self, row: RowId) -> Option<&Association> {
        self.data.get(&row)
    }

    /// Iterates associations in ascending row order.
    pub fn iter(&self) -> impl Iterator<Item = (RowId, &Association)> + '_ {
        self.data.iter().map(|(&row, association)| (row, association))
    }

    /// Installs `association` for `row`, replacing any previous one.
    ///
    /// # Errors
    ///
    /// Returns [`LooseError::AssociationLength`] if the association does not
    /// have one group per fragment. The store is left untouched in that case.
    pub fn set(&mut self, row: RowId, association: Association) -> Result<()> {
        if association.len() != self.fragment_count() {
            return Err(LooseError::AssociationLength {
                row,
                expected: self.fragment_count(),
                actual: association.len(),
            });
        }

        self.delete(row);
        for (fragment, &group) in association.iter().enumerate() {
            let groups = &mut self.indices[fragment];
            if groups.len() <= group {
                groups.resize_with(group + 1, BTreeSet::new);
            }
            groups[group].insert(row);
            self.refresh_full(fragment, group);
        }
        self.data.insert(row, association);
        Ok(())
    }

    /// Removes the association of `row`, returning it. No-op if absent.
    pub fn delete(&mut self, row: RowId) -> Option<Association> {
        let association = self.data.remove(&row)?;
        for (fragment, &group) in association.iter().enumerate() {
            self.indices[fragment][group].remove(&row);
            self.refresh_full(fragment, group);
        }
        Some(association)
    }

    fn refresh_full(&mut self, fragment: FragmentId, group: GroupId) {
        if self.get_group_size(fragment, group) == self.k_list[fragment] {
            self.full[fragment].insert(group);
        } else {
            self.full[fragment].remove(&group);
        }
    }

    /// Returns true iff the group holds exactly its target capacity.
    pub fn is_group_full(&self, fragment: FragmentId, group: GroupId) -> bool {
        self.full[fragment].contains(&group)
    }

    /// Returns the full groups of a fragment, ascending.
    pub fn full_groups(&self, fragment: FragmentId) -> &BTreeSet<GroupId> {
        &self.full[fragment]
    }

    /// Returns a snapshot of the members of a group, ascending.
    pub fn get_group(&self, fragment: FragmentId, group: GroupId) -> Vec<RowId> {
        self.members(fragment, group)
            .map(|m| m.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Returns the member count of a group.
    pub fn get_group_size(&self, fragment: FragmentId, group: GroupId) -> usize {
        self.members(fragment, group).map_or(0, BTreeSet::len)
    }

    /// Borrows the members of a group, if it was ever instantiated.
    pub fn members(&self, fragment: FragmentId, group: GroupId) -> Option<&BTreeSet<RowId>> {
        self.indices[fragment].get(group)
    }

    /// Read-only view of a fragment's reverse index, indexed by group id.
    pub fn get_groups(&self, fragment: FragmentId) -> &[BTreeSet<RowId>] {
        &self.indices[fragment]
    }

    /// Returns the number of group slots instantiated in a fragment.
    pub fn group_count(&self, fragment: FragmentId) -> usize {
        self.indices[fragment].len()
    }

    /// Iterates the associations of every row currently in a group.
    pub fn get_associated(
        &self,
        fragment: FragmentId,
        group: GroupId,
    ) -> impl Iterator<Item = (RowId, &Association)> + '_ {
        self.members(fragment, group)
            .into_iter()
            .flatten()
            .filter_map(|row| self.data.get(row).map(|association| (*row, association)))
    }

    /// Iterates one projected value of every association in a group.
    pub fn get_associated_with<'a, T, F>(
        &'a self,
        fragment: FragmentId,
        group: GroupId,
        select: F,
    ) -> impl Iterator<Item = T> + 'a
    where
        T: 'a,
        F: Fn(&Association) -> T + 'a,
    {
        self.get_associated(fragment, group)
            .map(move |(_, association)| select(association))
    }

    /// Returns true iff some row is in `group1` of `fragment1` and in
    /// `group2` of `fragment2` at the same time.
    ///
    /// Scans the members of `(fragment2, group2)`.
    pub fn exists(
        &self,
        fragment1: FragmentId,
        group1: GroupId,
        fragment2: FragmentId,
        group2: GroupId,
    ) -> bool {
        self.get_associated_with(fragment2, group2, |association| association[fragment1])
            .any(|group| group == group1)
    }

    /// Mean size of the non-empty groups of a fragment, or 0 if there are none.
    pub fn average_group_size_in_fragment(&self, fragment: FragmentId) -> f64 {
        let sizes: Vec<usize> = self.indices[fragment]
            .iter()
            .map(BTreeSet::len)
            .filter(|&size| size > 0)
            .collect();
        average(&sizes)
    }

    /// Mean of the per-fragment average group sizes.
    pub fn average_group_size(&self) -> f64 {
        let per_fragment: Vec<f64> = (0..self.fragment_count())
            .map(|f| self.average_group_size_in_fragment(f))
            .collect();
        if per_fragment.is_empty() {
            0.0
        } else {
            per_fragment.iter().sum::<f64>() / per_fragment.len() as f64
        }
    }
}

fn average(sizes: &[usize]) -> f64 {
    if sizes.is_empty() {
        0.0
    } else {
        sizes.iter().sum::<usize>() as f64 / sizes.len() as f64
    }
}

#[cfg(test)]
#[path = "associations_tests.rs"]
mod tests;
