//! Loose Solver - Loose association construction engine
//!
//! This crate provides the engine that publishes a fragmented table as
//! groups of rows plus a group-level association:
//! - Constraint evaluation over a fragmentation
//! - The indexed associations store
//! - Placement and repair phases
//! - Randomized retries, sequential or parallel
//! - Post-hoc verification of results

pub mod associations;
pub mod builder;
pub mod constraints;
mod heterogeneity;
pub mod phase;
pub mod retry;
pub mod scope;
pub mod stats;
pub mod verify;

#[cfg(test)]
mod test_utils;

pub use associations::Associations;
pub use builder::{Loose, LooseResult};
pub use constraints::Constraints;
pub use heterogeneity::PartialAssociation;
pub use phase::{Neighbours, Operation, Phase, PlacementPhase, RepairPhase};
pub use retry::RetryReport;
pub use scope::RunScope;
pub use stats::{DropReason, RunStats};
pub use verify::{check_consistency, check_result, Violation};
