//! The table contract.
//!
//! The engine never owns or mutates source data. It reads rows by position
//! through [`Table`], and resolves attribute names to column indices when
//! configuration is given by name.

use std::fmt::Debug;

use crate::error::{LooseError, Result};
use crate::ids::RowId;

/// Read-only access to the rows of a relational table.
///
/// Rows are identified by their position and must keep a stable order for
/// the lifetime of a run.
pub trait Table {
    /// Cell value type. Only equality is needed by the engine.
    type Value: PartialEq + Debug;

    /// Returns the number of rows.
    fn len(&self) -> usize;

    /// Returns true if the table has no rows.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the row at `id`.
    ///
    /// # Panics
    ///
    /// Panics if `id >= self.len()`.
    fn row(&self, id: RowId) -> &[Self::Value];

    /// Returns the attribute names in column order.
    fn attributes(&self) -> &[String];

    /// Iterates rows in table order.
    fn rows(&self) -> impl Iterator<Item = (RowId, &[Self::Value])> + '_ {
        (0..self.len()).map(move |id| (id, self.row(id)))
    }

    /// Returns the column index of `name`, if the table has such an attribute.
    fn attribute_index(&self, name: &str) -> Option<usize> {
        self.attributes().iter().position(|a| a == name)
    }

    /// Resolves attribute names to column indices.
    fn to_indices<S: AsRef<str>>(&self, names: &[S]) -> Result<Vec<usize>> {
        names
            .iter()
            .map(|name| {
                let name = name.as_ref();
                self.attribute_index(name)
                    .ok_or_else(|| LooseError::UnknownAttribute(name.to_string()))
            })
            .collect()
    }
}

/// In-memory table backed by a vector of rows.
///
/// # Example
///
/// ```
/// use loose_core::{Table, VecTable};
///
/// let table = VecTable::new(
///     vec!["name".to_string(), "disease".to_string()],
///     vec![vec!["alice", "flu"], vec!["bob", "cold"]],
/// ).unwrap();
///
/// assert_eq!(table.len(), 2);
/// assert_eq!(table.row(1), &["bob", "cold"]);
/// assert_eq!(table.to_indices(&["disease"]).unwrap(), vec![1]);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct VecTable<V> {
    attributes: Vec<String>,
    rows: Vec<Vec<V>>,
}

impl<V> VecTable<V> {
    /// Creates a table, checking that every row has one value per attribute.
    pub fn new(attributes: Vec<String>, rows: Vec<Vec<V>>) -> Result<Self> {
        if let Some((id, row)) = rows
            .iter()
            .enumerate()
            .find(|(_, row)| row.len() != attributes.len())
        {
            return Err(LooseError::Config(format!(
                "row {} has {} values but the table has {} attributes",
                id,
                row.len(),
                attributes.len()
            )));
        }
        Ok(Self { attributes, rows })
    }

    /// Creates a table whose attributes are named after their column index.
    pub fn with_numbered_attributes(width: usize, rows: Vec<Vec<V>>) -> Result<Self> {
        Self::new((0..width).map(|i| i.to_string()).collect(), rows)
    }

    /// Returns the number of attributes.
    pub fn width(&self) -> usize {
        self.attributes.len()
    }
}

impl<V: PartialEq + Debug> Table for VecTable<V> {
    type Value = V;

    fn len(&self) -> usize {
        self.rows.len()
    }

    fn row(&self, id: RowId) -> &[V] {
        &self.rows[id]
    }

    fn attributes(&self) -> &[String] {
        &self.attributes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> VecTable<i64> {
        VecTable::new(
            vec!["a".into(), "b".into(), "c".into()],
            vec![vec![1, 2, 3], vec![4, 5, 6]],
        )
        .unwrap()
    }

    #[test]
    fn test_row_access() {
        let table = sample();
        assert_eq!(table.len(), 2);
        assert!(!table.is_empty());
        assert_eq!(table.row(0), &[1, 2, 3]);
        assert_eq!(table.width(), 3);
    }

    #[test]
    fn test_rows_iterate_in_order() {
        let table = sample();
        let ids: Vec<RowId> = table.rows().map(|(id, _)| id).collect();
        assert_eq!(ids, vec![0, 1]);
    }

    #[test]
    fn test_to_indices() {
        let table = sample();
        assert_eq!(table.to_indices(&["c", "a"]).unwrap(), vec![2, 0]);
        assert_eq!(
            table.to_indices(&["z"]),
            Err(LooseError::UnknownAttribute("z".into()))
        );
    }

    #[test]
    fn test_ragged_rows_rejected() {
        let result = VecTable::new(vec!["a".into()], vec![vec![1], vec![1, 2]]);
        assert!(matches!(result, Err(LooseError::Config(_))));
    }

    #[test]
    fn test_numbered_attributes() {
        let table = VecTable::with_numbered_attributes(2, vec![vec![0u8, 1]]).unwrap();
        assert_eq!(table.attributes(), &["0".to_string(), "1".to_string()]);
    }
}
