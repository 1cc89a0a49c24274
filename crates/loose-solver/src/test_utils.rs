//! Test utilities for loose-solver
//!
//! Assertions over the invariant checks in [`crate::verify`], with the
//! violations listed in the panic message.

use loose_core::Table;

use crate::associations::Associations;
use crate::builder::LooseResult;
use crate::constraints::Constraints;
use crate::verify::{check_consistency, check_result, Violation};

fn fail(violations: &[Violation]) -> ! {
    let listed: Vec<String> = violations.iter().map(ToString::to_string).collect();
    panic!("{} violation(s):\n  {}", violations.len(), listed.join("\n  "));
}

/// Panics unless the store's forward map, reverse indices and full flags agree.
pub fn assert_consistent(associations: &Associations) {
    let violations = check_consistency(associations);
    if !violations.is_empty() {
        fail(&violations);
    }
}

/// Panics unless the result satisfies every structural and privacy property.
pub fn assert_valid<T: Table>(table: &T, constraints: &Constraints, result: &LooseResult) {
    let violations = check_result(table, constraints, result);
    if !violations.is_empty() {
        fail(&violations);
    }
}
