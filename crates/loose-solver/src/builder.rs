//! The loose-association builder.
//!
//! [`Loose`] binds a table, a set of constraints and a fragmentation, and
//! runs the two-phase algorithm for a given k-list. Every run gets a fresh
//! [`RunScope`], so one builder can be run any number of times.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::info;

use loose_core::{LooseError, Result, RowId, Table};

use crate::associations::Associations;
use crate::constraints::Constraints;
use crate::phase::{Phase, PlacementPhase, RepairPhase};
use crate::scope::RunScope;
use crate::stats::{DropReason, RunStats};

/// Outcome of one run.
#[derive(Debug, Clone)]
pub struct LooseResult {
    /// Associations of the retained rows.
    pub associations: Associations,
    /// Rows excluded from the result, with the reason.
    pub dropped: BTreeMap<RowId, DropReason>,
    pub stats: RunStats,
    /// True if the run was cancelled.
    pub aborted: bool,
}

impl LooseResult {
    /// Returns the dropped rows, ascending.
    pub fn dropped_rows(&self) -> BTreeSet<RowId> {
        self.dropped.keys().copied().collect()
    }

    /// Returns true if every row was retained and the run was not cancelled.
    pub fn is_complete(&self) -> bool {
        self.dropped.is_empty() && !self.aborted
    }
}

/// Builds loose associations over a table.
///
/// # Example
///
/// ```
/// use loose_core::VecTable;
/// use loose_solver::Loose;
///
/// let table = VecTable::with_numbered_attributes(
///     2,
///     vec![vec![1, 10], vec![2, 20], vec![3, 30], vec![4, 40]],
/// ).unwrap();
///
/// let loose = Loose::new(&table, &[], vec![vec![0], vec![1]]).unwrap();
/// let result = loose.associate(&[2, 2]).unwrap();
///
/// assert!(result.is_complete());
/// assert_eq!(result.associations.get(3).unwrap().as_slice(), &[1, 1]);
/// ```
#[derive(Debug)]
pub struct Loose<'a, T: Table> {
    table: &'a T,
    fragments: Vec<Vec<usize>>,
    constraints: Constraints,
    abort: Option<Arc<AtomicBool>>,
    seed: Option<u64>,
}

impl<'a, T: Table> Loose<'a, T> {
    /// Binds a table, constraints and fragments given as attribute indices.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if a fragment names an attribute the
    /// table does not have, if fragments overlap, or if there are none.
    pub fn new(table: &'a T, constraints: &[Vec<usize>], fragments: Vec<Vec<usize>>) -> Result<Self> {
        let width = table.attributes().len();
        if let Some(&attribute) = fragments.iter().flatten().find(|&&a| a >= width) {
            return Err(LooseError::Config(format!(
                "fragment attribute {attribute} is out of range for a table with {width} attributes"
            )));
        }
        let constraints = Constraints::new(constraints, &fragments)?;
        Ok(Self {
            table,
            fragments,
            constraints,
            abort: None,
            seed: None,
        })
    }

    /// Binds a table, constraints and fragments given as attribute names.
    ///
    /// Constraint names the table does not have are ignored, like any other
    /// constraint outside the fragments.
    ///
    /// # Errors
    ///
    /// Returns [`LooseError::UnknownAttribute`] if a fragment names an
    /// attribute the table does not have.
    pub fn from_names<S: AsRef<str>>(
        table: &'a T,
        constraints: &[Vec<S>],
        fragments: &[Vec<S>],
    ) -> Result<Self> {
        let fragments = fragments
            .iter()
            .map(|fragment| table.to_indices(fragment))
            .collect::<Result<Vec<_>>>()?;
        let constraints: Vec<Vec<usize>> = constraints
            .iter()
            .filter_map(|constraint| table.to_indices(constraint).ok())
            .collect();
        Self::new(table, &constraints, fragments)
    }

    /// Cancels runs once `flag` is set.
    pub fn with_abort_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.abort = Some(flag);
        self
    }

    /// Seeds the generator used by randomized runs.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn table(&self) -> &'a T {
        self.table
    }

    pub fn fragments(&self) -> &[Vec<usize>] {
        &self.fragments
    }

    pub fn constraints(&self) -> &Constraints {
        &self.constraints
    }

    pub fn seed(&self) -> Option<u64> {
        self.seed
    }

    /// Runs the deterministic algorithm.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the k-list does not have one positive
    /// entry per fragment.
    pub fn associate(&self, k_list: &[usize]) -> Result<LooseResult> {
        self.run(k_list, 0.0, ChaCha8Rng::seed_from_u64(0), None)
    }

    /// Runs once, skipping each candidate group with `skip_probability`.
    pub fn associate_with_skip(&self, k_list: &[usize], skip_probability: f64) -> Result<LooseResult> {
        self.run(k_list, skip_probability, self.rng(), None)
    }

    /// Runs once with a caller-supplied generator.
    pub fn associate_with_rng<R: Rng>(
        &self,
        k_list: &[usize],
        skip_probability: f64,
        rng: R,
    ) -> Result<LooseResult> {
        self.run(k_list, skip_probability, rng, None)
    }

    pub(crate) fn rng(&self) -> ChaCha8Rng {
        match self.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_os_rng(),
        }
    }

    pub(crate) fn run<R: Rng>(
        &self,
        k_list: &[usize],
        skip_probability: f64,
        rng: R,
        cancel: Option<Arc<AtomicBool>>,
    ) -> Result<LooseResult> {
        let mut scope = RunScope::new(self.table, &self.constraints, k_list, skip_probability, rng)?;
        if let Some(flag) = &self.abort {
            scope.add_abort_flag(Arc::clone(flag));
        }
        if let Some(flag) = cancel {
            scope.add_abort_flag(flag);
        }

        info!(
            event = "run_start",
            rows = self.table.len(),
            fragments = self.fragments.len(),
            constraints = self.constraints.len(),
            k_list = ?k_list,
            skip_probability = skip_probability,
        );
        scope.start();

        PlacementPhase::new().solve(&mut scope)?;
        if !scope.is_aborted() {
            RepairPhase::new().solve(&mut scope)?;
        }
        if scope.is_aborted() {
            scope.drop_undersized();
        }

        let result = scope.into_result();
        info!(
            event = "run_end",
            retained = result.associations.len(),
            dropped = result.dropped.len(),
            aborted = result.aborted,
            duration_ms = result.stats.elapsed().as_millis() as u64,
            average_group_size = result.associations.average_group_size(),
        );
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use loose_core::VecTable;

    use super::*;
    use crate::test_utils::assert_valid;

    fn table() -> VecTable<&'static str> {
        VecTable::new(
            vec!["name".into(), "city".into(), "disease".into()],
            vec![
                vec!["ann", "rome", "flu"],
                vec!["bob", "oslo", "cold"],
                vec!["cid", "lima", "flu"],
                vec!["dan", "kiev", "asthma"],
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_from_names() {
        let table = table();
        let loose = Loose::from_names(
            &table,
            &[vec!["name", "disease"], vec!["zip"]],
            &[vec!["name", "city"], vec!["disease"]],
        )
        .unwrap();
        assert_eq!(loose.fragments(), &[vec![0, 1], vec![2]]);
        assert_eq!(loose.constraints().len(), 1);
    }

    #[test]
    fn test_unknown_fragment_attribute() {
        let table = table();
        let err = Loose::from_names(&table, &[] as &[Vec<&str>], &[vec!["zip"]]).unwrap_err();
        assert_eq!(err, LooseError::UnknownAttribute("zip".into()));

        let err = Loose::new(&table, &[], vec![vec![0], vec![7]]).unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_k_list_length_checked() {
        let table = table();
        let loose = Loose::new(&table, &[], vec![vec![0, 1], vec![2]]).unwrap();
        let err = loose.associate(&[2]).unwrap_err();
        assert_eq!(
            err,
            LooseError::KListLength {
                expected: 2,
                actual: 1
            }
        );
        assert!(loose.associate(&[2, 0]).is_err());
        assert!(loose.associate_with_skip(&[2, 2], 1.0).is_err());
    }

    #[test]
    fn test_empty_table() {
        let table: VecTable<i64> = VecTable::with_numbered_attributes(2, vec![]).unwrap();
        let loose = Loose::new(&table, &[], vec![vec![0], vec![1]]).unwrap();
        let result = loose.associate(&[3, 3]).unwrap();
        assert!(result.associations.is_empty());
        assert!(result.is_complete());
    }

    #[test]
    fn test_set_abort_flag_aborts_run() {
        let table = table();
        let flag = Arc::new(AtomicBool::new(true));
        let loose = Loose::new(&table, &[], vec![vec![0, 1], vec![2]])
            .unwrap()
            .with_abort_flag(flag);
        let result = loose.associate(&[2, 2]).unwrap();
        assert!(result.aborted);
        assert!(!result.is_complete());
        assert!(result.associations.is_empty());
        assert_eq!(result.dropped.len(), 4);
    }

    #[test]
    fn test_result_passes_verification() {
        let table = table();
        let loose = Loose::new(&table, &[vec![0, 2], vec![2]], vec![vec![0, 1], vec![2]]).unwrap();
        let result = loose.associate(&[2, 2]).unwrap();
        assert_valid(&table, loose.constraints(), &result);
        assert_eq!(result.associations.len() + result.dropped.len(), 4);
    }
}
