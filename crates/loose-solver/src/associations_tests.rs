//! Tests for the associations store.

use smallvec::smallvec;

use super::*;
use crate::test_utils::assert_consistent;

fn store() -> Associations {
    Associations::new(vec![2, 3])
}

#[test]
fn test_set_and_get() {
    let mut a = store();
    a.set(4, smallvec![1, 2]).unwrap();

    assert_eq!(a.len(), 1);
    assert!(a.contains(4));
    assert_eq!(a.get(4).map(|x| x.as_slice()), Some(&[1, 2][..]));
    assert_eq!(a.get_group(0, 1), vec![4]);
    assert_eq!(a.get_group(1, 2), vec![4]);
    assert_eq!(a.get_group_size(0, 0), 0);
    assert_eq!(a.group_count(1), 3);
    assert_consistent(&a);
}

#[test]
fn test_wrong_length_rejected_without_side_effects() {
    let mut a = store();
    a.set(0, smallvec![0, 0]).unwrap();

    let err = a.set(0, smallvec![1]).unwrap_err();
    assert_eq!(
        err,
        LooseError::AssociationLength {
            row: 0,
            expected: 2,
            actual: 1
        }
    );
    assert_eq!(a.get(0).map(|x| x.as_slice()), Some(&[0, 0][..]));
    assert_consistent(&a);
}

#[test]
fn test_set_replaces_atomically() {
    let mut a = store();
    a.set(0, smallvec![0, 0]).unwrap();
    a.set(1, smallvec![0, 1]).unwrap();
    assert!(a.is_group_full(0, 0));

    a.set(1, smallvec![1, 1]).unwrap();
    assert_eq!(a.get_group(0, 0), vec![0]);
    assert_eq!(a.get_group(0, 1), vec![1]);
    assert!(!a.is_group_full(0, 0));
    assert_consistent(&a);
}

#[test]
fn test_delete_absent_is_noop() {
    let mut a = store();
    a.set(0, smallvec![0, 0]).unwrap();
    assert!(a.delete(9).is_none());
    assert_eq!(a.len(), 1);
    assert_consistent(&a);
}

#[test]
fn test_set_then_delete_restores_indices() {
    let mut a = store();
    a.set(0, smallvec![0, 0]).unwrap();
    a.set(1, smallvec![1, 0]).unwrap();
    let before_groups: Vec<Vec<RowId>> = (0..2).map(|g| a.get_group(0, g)).collect();
    let before_full: Vec<BTreeSet<GroupId>> = (0..2).map(|f| a.full_groups(f).clone()).collect();

    a.set(2, smallvec![0, 0]).unwrap();
    assert!(a.is_group_full(0, 0));
    let removed = a.delete(2);
    assert_eq!(removed.map(|x| x.to_vec()), Some(vec![0, 0]));

    let after_groups: Vec<Vec<RowId>> = (0..2).map(|g| a.get_group(0, g)).collect();
    let after_full: Vec<BTreeSet<GroupId>> = (0..2).map(|f| a.full_groups(f).clone()).collect();
    assert_eq!(before_groups, after_groups);
    assert_eq!(before_full, after_full);
    assert_eq!(a.get_group(1, 0), vec![0, 1]);
    assert_consistent(&a);
}

#[test]
fn test_full_means_exactly_capacity() {
    let mut a = store();
    a.set(0, smallvec![0, 0]).unwrap();
    a.set(1, smallvec![0, 1]).unwrap();
    assert!(a.is_group_full(0, 0));

    // oversize is not full
    a.set(2, smallvec![0, 2]).unwrap();
    assert_eq!(a.get_group_size(0, 0), 3);
    assert!(!a.is_group_full(0, 0));

    // back to capacity is full again
    a.delete(2);
    assert!(a.is_group_full(0, 0));

    a.delete(1);
    assert!(!a.is_group_full(0, 0));
    assert_consistent(&a);
}

#[test]
fn test_exists() {
    let mut a = store();
    a.set(0, smallvec![0, 1]).unwrap();
    a.set(1, smallvec![1, 0]).unwrap();

    assert!(a.exists(0, 0, 1, 1));
    assert!(a.exists(1, 1, 0, 0));
    assert!(!a.exists(0, 0, 1, 0));
    assert!(!a.exists(1, 0, 0, 0));
    // never instantiated
    assert!(!a.exists(0, 5, 1, 7));
}

#[test]
fn test_get_associated() {
    let mut a = store();
    a.set(0, smallvec![0, 1]).unwrap();
    a.set(1, smallvec![0, 2]).unwrap();
    a.set(2, smallvec![1, 2]).unwrap();

    let rows: Vec<RowId> = a.get_associated(0, 0).map(|(row, _)| row).collect();
    assert_eq!(rows, vec![0, 1]);

    let second: Vec<GroupId> = a.get_associated_with(1, 2, |x| x[0]).collect();
    assert_eq!(second, vec![0, 1]);
}

#[test]
fn test_get_groups_view() {
    let mut a = store();
    a.set(0, smallvec![2, 0]).unwrap();
    let groups = a.get_groups(0);
    assert_eq!(groups.len(), 3);
    assert!(groups[0].is_empty());
    assert!(groups[2].contains(&0));
}

#[test]
fn test_average_group_size() {
    let mut a = store();
    assert_eq!(a.average_group_size(), 0.0);

    a.set(0, smallvec![0, 0]).unwrap();
    a.set(1, smallvec![0, 1]).unwrap();
    a.set(2, smallvec![2, 1]).unwrap();

    // fragment 0: sizes 2 and 1 (group 1 empty)
    assert!((a.average_group_size_in_fragment(0) - 1.5).abs() < f64::EPSILON);
    // fragment 1: sizes 1 and 2
    assert!((a.average_group_size_in_fragment(1) - 1.5).abs() < f64::EPSILON);
    assert!((a.average_group_size() - 1.5).abs() < f64::EPSILON);
}

#[test]
fn test_iter_ascending() {
    let mut a = store();
    a.set(5, smallvec![0, 0]).unwrap();
    a.set(2, smallvec![1, 1]).unwrap();
    let rows: Vec<RowId> = a.iter().map(|(row, _)| row).collect();
    assert_eq!(rows, vec![2, 5]);
}
