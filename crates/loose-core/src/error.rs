//! Error types for loose association construction

use thiserror::Error;

use crate::ids::RowId;

/// Main error type for loose association operations.
///
/// Only configuration problems abort a run. Rows that cannot be placed or
/// repaired are reported through the dropped set, not through this type.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LooseError {
    /// Error in run configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// An association does not carry one group per fragment
    #[error("Association for row {row} has {actual} groups, expected {expected}")]
    AssociationLength {
        row: RowId,
        expected: usize,
        actual: usize,
    },

    /// The k-list does not carry one privacy degree per fragment
    #[error("k-list has {actual} entries, expected one per fragment ({expected})")]
    KListLength { expected: usize, actual: usize },

    /// An attribute name could not be resolved against the table
    #[error("Unknown attribute: {0}")]
    UnknownAttribute(String),

    /// Every retry attempt dropped at least one row
    #[error("No zero-drop association after {attempts} attempts ({dropped} rows dropped in the best one)")]
    RunFailure { attempts: usize, dropped: usize },
}

impl LooseError {
    /// Returns true for the errors that abort a run immediately.
    pub fn is_configuration(&self) -> bool {
        !matches!(self, LooseError::RunFailure { .. })
    }
}

/// Result type alias for loose association operations
pub type Result<T> = std::result::Result<T, LooseError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_association_length_message() {
        let err = LooseError::AssociationLength {
            row: 7,
            expected: 3,
            actual: 2,
        };
        assert_eq!(
            err.to_string(),
            "Association for row 7 has 2 groups, expected 3"
        );
    }

    #[test]
    fn test_is_configuration() {
        assert!(LooseError::Config("bad".into()).is_configuration());
        assert!(LooseError::KListLength {
            expected: 2,
            actual: 1
        }
        .is_configuration());
        assert!(!LooseError::RunFailure {
            attempts: 3,
            dropped: 1
        }
        .is_configuration());
    }
}
