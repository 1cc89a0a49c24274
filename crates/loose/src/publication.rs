//! Publication view of a result.
//!
//! A [`Publication`] holds, in memory, the relations a loose association is
//! released as: one relation per fragment carrying the fragment's attributes
//! and a group column, the `associations` bridge linking groups across
//! fragments, and the schema mapping each attribute to its fragment.
//!
//! Rows are emitted group by group, shuffled within each group, so that the
//! position of a row in one fragment relation says nothing about its
//! position in another.

use std::collections::{BTreeMap, BTreeSet};

use rand::seq::SliceRandom;
use rand::Rng;
use serde::Serialize;

use loose_core::{FragmentId, GroupId, LooseError, Result, RowId, Table};
use loose_solver::Associations;

/// A published fragment row: the fragment's attribute values and its group.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PublishedRow<V> {
    pub values: Vec<V>,
    pub group: GroupId,
}

/// The relation published for one fragment.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FragmentRelation<V> {
    /// `fragment_<i>`.
    pub name: String,
    /// The fragment's attribute names followed by `group_<i>`.
    pub columns: Vec<String>,
    pub rows: Vec<PublishedRow<V>>,
}

impl<V> FragmentRelation<V> {
    /// Returns the values of the rows in `group`, in published order.
    pub fn group(&self, group: GroupId) -> impl Iterator<Item = &[V]> + '_ {
        self.rows
            .iter()
            .filter(move |row| row.group == group)
            .map(|row| row.values.as_slice())
    }
}

/// All relations released for a loose association.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Publication<V> {
    /// Owning fragment of every published attribute.
    pub schema: BTreeMap<String, FragmentId>,
    /// Distinct group tuples of the retained rows, ascending.
    pub associations: Vec<Vec<GroupId>>,
    pub fragments: Vec<FragmentRelation<V>>,
}

impl<V: Clone> Publication<V> {
    /// Builds the publication of `associations` over `table`.
    ///
    /// Dropped rows do not appear anywhere. `rng` drives the shuffling of
    /// rows within each group.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if `fragments` does not match the
    /// fragment count of `associations`, or names a column the table does
    /// not have.
    pub fn new<T, R>(
        table: &T,
        fragments: &[Vec<usize>],
        associations: &Associations,
        rng: &mut R,
    ) -> Result<Self>
    where
        T: Table<Value = V>,
        R: Rng + ?Sized,
    {
        if fragments.len() != associations.fragment_count() {
            return Err(LooseError::Config(format!(
                "{} fragments given for associations over {} fragments",
                fragments.len(),
                associations.fragment_count()
            )));
        }
        let names = table.attributes();
        if let Some(&attribute) = fragments.iter().flatten().find(|&&a| a >= names.len()) {
            return Err(LooseError::Config(format!(
                "fragment attribute {attribute} is out of range for a table with {} attributes",
                names.len()
            )));
        }

        let schema = fragments
            .iter()
            .enumerate()
            .flat_map(|(id, fragment)| fragment.iter().map(move |&a| (names[a].clone(), id)))
            .collect();

        let bridge: BTreeSet<Vec<GroupId>> = associations
            .iter()
            .map(|(_, association)| association.to_vec())
            .collect();

        let relations = fragments
            .iter()
            .enumerate()
            .map(|(id, attributes)| relation(table, id, attributes, associations, rng))
            .collect();

        Ok(Self {
            schema,
            associations: bridge.into_iter().collect(),
            fragments: relations,
        })
    }
}

impl<V> Publication<V> {
    /// Returns the number of published rows per fragment.
    pub fn row_count(&self) -> usize {
        self.fragments.first().map_or(0, |relation| relation.rows.len())
    }
}

fn relation<T, R>(
    table: &T,
    fragment: FragmentId,
    attributes: &[usize],
    associations: &Associations,
    rng: &mut R,
) -> FragmentRelation<T::Value>
where
    T: Table,
    T::Value: Clone,
    R: Rng + ?Sized,
{
    let names = table.attributes();
    let mut columns: Vec<String> = attributes.iter().map(|&a| names[a].clone()).collect();
    columns.push(format!("group_{fragment}"));

    let mut rows = Vec::with_capacity(associations.len());
    for (group, members) in associations.get_groups(fragment).iter().enumerate() {
        let mut members: Vec<RowId> = members.iter().copied().collect();
        members.shuffle(rng);
        rows.extend(members.into_iter().map(|row| {
            let values = table.row(row);
            PublishedRow {
                values: attributes.iter().map(|&a| values[a].clone()).collect(),
                group,
            }
        }));
    }

    FragmentRelation {
        name: format!("fragment_{fragment}"),
        columns,
        rows,
    }
}
