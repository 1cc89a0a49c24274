//! Identifier types.
//!
//! Rows, fragments, groups and constraints are all plain integer keys.
//! Cross references between them live in containers owned by the
//! associations store, never as pointers between values.

use smallvec::SmallVec;

/// Position of a row in the source table.
pub type RowId = usize;

/// Index of a fragment in the fragmentation.
pub type FragmentId = usize;

/// Identifier of a group within one fragment.
pub type GroupId = usize;

/// Index of a retained constraint.
pub type ConstraintId = usize;

/// Per-row tuple of group ids, one per fragment.
pub type Association = SmallVec<[GroupId; 4]>;
