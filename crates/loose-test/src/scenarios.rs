//! Hand-built inputs with known outcomes.
//!
//! Each scenario bundles a table with the fragmentation, constraints and
//! k-list it is meant to be run with. Attribute `i` of every scenario table
//! is named `"i"`.

use loose_core::{Result, VecTable};

/// A table with the parameters of one run.
#[derive(Debug, Clone, PartialEq)]
pub struct Scenario {
    pub table: VecTable<i64>,
    pub fragments: Vec<Vec<usize>>,
    pub constraints: Vec<Vec<usize>>,
    pub k_list: Vec<usize>,
}

/// Four pairwise-distinct rows over two single-attribute fragments, no
/// constraints, `k = [2, 2]`. Every row can be placed.
pub fn distinct_rows() -> Result<Scenario> {
    Ok(Scenario {
        table: VecTable::with_numbered_attributes(
            2,
            vec![vec![1, 10], vec![2, 20], vec![3, 30], vec![4, 40]],
        )?,
        fragments: vec![vec![0], vec![1]],
        constraints: vec![],
        k_list: vec![2, 2],
    })
}

/// One constraint spanning both fragments. Rows 0 and 1 are identical on the
/// constrained attributes and must never share a group.
pub fn linked_pair() -> Result<Scenario> {
    Ok(Scenario {
        table: VecTable::with_numbered_attributes(
            3,
            vec![
                vec![1, 7, 1],
                vec![1, 8, 1],
                vec![2, 7, 2],
                vec![3, 8, 3],
                vec![4, 9, 4],
                vec![5, 9, 5],
            ],
        )?,
        fragments: vec![vec![0, 1], vec![2]],
        constraints: vec![vec![0, 2]],
        k_list: vec![2, 2],
    })
}

/// Ten rows whose constrained attribute takes only three values, with
/// `k = 5` in the first fragment: no group can ever reach capacity.
pub fn unreachable_capacity() -> Result<Scenario> {
    Ok(Scenario {
        table: VecTable::with_numbered_attributes(
            2,
            (0..10).map(|i| vec![i % 3, 100 + i]).collect(),
        )?,
        fragments: vec![vec![0], vec![1]],
        constraints: vec![vec![0]],
        k_list: vec![5, 1],
    })
}

/// Four rows, two of them alike on the constrained attribute. First-fit
/// placement pairs the wrong rows and repair unravels everything; skipping
/// the first group for row 1 leads to a complete result.
pub fn retry_rescuable() -> Result<Scenario> {
    Ok(Scenario {
        table: VecTable::with_numbered_attributes(
            2,
            vec![vec![1, 10], vec![2, 20], vec![3, 30], vec![3, 40]],
        )?,
        fragments: vec![vec![0], vec![1]],
        constraints: vec![vec![0]],
        k_list: vec![2, 2],
    })
}
