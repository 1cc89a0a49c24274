//! Constraint evaluation over a fixed fragmentation.
//!
//! [`Constraints`] answers which fragments a constraint spans and whether two
//! rows are indistinguishable within a fragment. Every derived lookup is
//! computed once at construction; the value is immutable afterwards and can be
//! shared across concurrent runs.

use std::collections::{BTreeSet, HashMap};

use loose_core::{ConstraintId, FragmentId, LooseError, Result};

/// Read-only evaluator of constraints against a fragmentation.
///
/// # Example
///
/// ```
/// use loose_solver::Constraints;
///
/// // attributes 0,1 in fragment 0 and attribute 2 in fragment 1
/// let fragments = vec![vec![0, 1], vec![2]];
/// // the second constraint mentions attribute 5, which no fragment holds
/// let constraints = Constraints::new(&[vec![0, 2], vec![1, 5]], &fragments).unwrap();
///
/// assert_eq!(constraints.len(), 1);
/// assert_eq!(constraints.involved_fragments_for(0), &[0, 1]);
///
/// let alice = [1, 10, 100];
/// let alicia = [1, 20, 200];
/// assert!(constraints.are_rows_alike(&alice, &alicia, 0));
/// assert!(!constraints.are_rows_alike(&alice, &alicia, 1));
/// ```
#[derive(Debug, Clone)]
pub struct Constraints {
    fragments: Vec<BTreeSet<usize>>,
    constraints: Vec<BTreeSet<usize>>,
    fragment_for: HashMap<usize, FragmentId>,
    involved: Vec<Vec<FragmentId>>,
    by_fragment: Vec<Vec<ConstraintId>>,
    completed_with: Vec<Vec<ConstraintId>>,
    // [constraint][fragment] -> attributes in both
    shared: Vec<Vec<Vec<usize>>>,
}

impl Constraints {
    /// Builds the evaluator.
    ///
    /// Constraints that are not fully contained in the union of the fragment
    /// attributes are discarded.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if there are no fragments or if an
    /// attribute belongs to more than one fragment.
    pub fn new(constraints: &[Vec<usize>], fragments: &[Vec<usize>]) -> Result<Self> {
        if fragments.is_empty() {
            return Err(LooseError::Config(
                "at least one fragment is required".to_string(),
            ));
        }

        let fragments: Vec<BTreeSet<usize>> = fragments
            .iter()
            .map(|f| f.iter().copied().collect())
            .collect();

        let mut fragment_for = HashMap::new();
        for (fragment_id, fragment) in fragments.iter().enumerate() {
            for &attribute in fragment {
                if let Some(previous) = fragment_for.insert(attribute, fragment_id) {
                    return Err(LooseError::Config(format!(
                        "attribute {attribute} belongs to fragments {previous} and {fragment_id}"
                    )));
                }
            }
        }

        let constraints: Vec<BTreeSet<usize>> = constraints
            .iter()
            .map(|c| c.iter().copied().collect::<BTreeSet<usize>>())
            .filter(|c| !c.is_empty() && c.iter().all(|a| fragment_for.contains_key(a)))
            .collect();

        let involved: Vec<Vec<FragmentId>> = constraints
            .iter()
            .map(|c| {
                c.iter()
                    .filter_map(|a| fragment_for.get(a).copied())
                    .collect::<BTreeSet<_>>()
                    .into_iter()
                    .collect()
            })
            .collect();

        let by_fragment = (0..fragments.len())
            .map(|f| {
                (0..constraints.len())
                    .filter(|&c| involved[c].contains(&f))
                    .collect()
            })
            .collect();

        let completed_with = (0..fragments.len())
            .map(|f| {
                (0..constraints.len())
                    .filter(|&c| involved[c].last() == Some(&f))
                    .collect()
            })
            .collect();

        let shared = constraints
            .iter()
            .map(|c| {
                fragments
                    .iter()
                    .map(|f| c.intersection(f).copied().collect())
                    .collect()
            })
            .collect();

        Ok(Self {
            fragments,
            constraints,
            fragment_for,
            involved,
            by_fragment,
            completed_with,
            shared,
        })
    }

    /// Returns the number of fragments.
    pub fn fragment_count(&self) -> usize {
        self.fragments.len()
    }

    /// Returns the number of retained constraints.
    pub fn len(&self) -> usize {
        self.constraints.len()
    }

    /// Returns true if no constraint was retained.
    pub fn is_empty(&self) -> bool {
        self.constraints.is_empty()
    }

    /// Returns the attributes of a retained constraint.
    pub fn attributes(&self, constraint: ConstraintId) -> &BTreeSet<usize> {
        &self.constraints[constraint]
    }

    /// Returns the attributes of a fragment.
    pub fn fragment_attributes(&self, fragment: FragmentId) -> &BTreeSet<usize> {
        &self.fragments[fragment]
    }

    /// Returns the fragment holding `attribute`.
    pub fn fragment_of(&self, attribute: usize) -> Option<FragmentId> {
        self.fragment_for.get(&attribute).copied()
    }

    /// Fragments whose attributes the constraint touches, ascending.
    pub fn involved_fragments_for(&self, constraint: ConstraintId) -> &[FragmentId] {
        &self.involved[constraint]
    }

    /// Constraints spanning `fragment`, ascending.
    pub fn constraints_for(&self, fragment: FragmentId) -> &[ConstraintId] {
        &self.by_fragment[fragment]
    }

    /// Constraints whose highest spanned fragment is `fragment`.
    pub fn completed_with(&self, fragment: FragmentId) -> &[ConstraintId] {
        &self.completed_with[fragment]
    }

    /// Returns true iff the rows agree on every attribute of `constraint`
    /// that lies in `fragment`.
    ///
    /// Vacuously true when the constraint has no attribute in the fragment.
    pub fn are_rows_alike_for<V: PartialEq>(
        &self,
        row1: &[V],
        row2: &[V],
        fragment: FragmentId,
        constraint: ConstraintId,
    ) -> bool {
        self.shared[constraint][fragment]
            .iter()
            .all(|&attribute| row1[attribute] == row2[attribute])
    }

    /// Returns true iff some constraint spanning `fragment` reports the rows alike.
    pub fn are_rows_alike<V: PartialEq>(&self, row1: &[V], row2: &[V], fragment: FragmentId) -> bool {
        self.constraints_for(fragment)
            .iter()
            .any(|&constraint| self.are_rows_alike_for(row1, row2, fragment, constraint))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // fragment 0: {0, 1}, fragment 1: {2, 3}, fragment 2: {4}
    fn fragments() -> Vec<Vec<usize>> {
        vec![vec![0, 1], vec![2, 3], vec![4]]
    }

    #[test]
    fn test_irrelevant_constraints_dropped() {
        let c = Constraints::new(&[vec![0, 2], vec![1, 9], vec![]], &fragments()).unwrap();
        assert_eq!(c.len(), 1);
        assert_eq!(c.attributes(0).iter().copied().collect::<Vec<_>>(), vec![0, 2]);
    }

    #[test]
    fn test_involved_fragments() {
        let c = Constraints::new(&[vec![4, 0], vec![2, 3]], &fragments()).unwrap();
        assert_eq!(c.involved_fragments_for(0), &[0, 2]);
        assert_eq!(c.involved_fragments_for(1), &[1]);
    }

    #[test]
    fn test_constraints_for_and_completed_with() {
        let c = Constraints::new(&[vec![0, 2], vec![1, 4], vec![3]], &fragments()).unwrap();
        assert_eq!(c.constraints_for(0), &[0, 1]);
        assert_eq!(c.constraints_for(1), &[0, 2]);
        assert_eq!(c.constraints_for(2), &[1]);

        assert_eq!(c.completed_with(0), &[] as &[ConstraintId]);
        assert_eq!(c.completed_with(1), &[0, 2]);
        assert_eq!(c.completed_with(2), &[1]);
    }

    #[test]
    fn test_rows_alike_for() {
        let c = Constraints::new(&[vec![0, 1, 2]], &fragments()).unwrap();
        let r1 = [1, 2, 3, 4, 5];
        let r2 = [1, 2, 9, 9, 9];
        let r3 = [1, 7, 3, 4, 5];

        assert!(c.are_rows_alike_for(&r1, &r2, 0, 0));
        assert!(!c.are_rows_alike_for(&r1, &r3, 0, 0));
        assert!(!c.are_rows_alike_for(&r1, &r2, 1, 0));
    }

    #[test]
    fn test_rows_alike_for_is_vacuous_outside_constraint() {
        let c = Constraints::new(&[vec![0, 2]], &fragments()).unwrap();
        let r1 = [1, 1, 1, 1, 1];
        let r2 = [2, 2, 2, 2, 2];
        assert!(c.are_rows_alike_for(&r1, &r2, 2, 0));
    }

    #[test]
    fn test_rows_alike_any_constraint() {
        let c = Constraints::new(&[vec![0, 2], vec![1, 3]], &fragments()).unwrap();
        let r1 = [1, 2, 0, 0, 0];
        let r2 = [5, 2, 0, 0, 0];
        assert!(c.are_rows_alike(&r1, &r2, 0));

        let r3 = [5, 6, 0, 0, 0];
        assert!(!c.are_rows_alike(&r1, &r3, 0));
        // no constraint spans fragment 2
        assert!(!c.are_rows_alike(&r1, &r1, 2));
    }

    #[test]
    fn test_overlapping_fragments_rejected() {
        let result = Constraints::new(&[], &[vec![0, 1], vec![1]]);
        assert!(matches!(result, Err(LooseError::Config(_))));
    }

    #[test]
    fn test_no_fragments_rejected() {
        assert!(Constraints::new(&[vec![0]], &[]).is_err());
    }

    #[test]
    fn test_fragment_of() {
        let c = Constraints::new(&[], &fragments()).unwrap();
        assert_eq!(c.fragment_of(3), Some(1));
        assert_eq!(c.fragment_of(8), None);
        assert_eq!(c.fragment_count(), 3);
        assert!(c.is_empty());
    }
}
