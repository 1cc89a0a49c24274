//! Loose Core - Core types and traits for loose association construction
//!
//! This crate provides the fundamental abstractions shared by the engine:
//! - Identifier types for rows, fragments, groups and constraints
//! - The [`Association`] tuple published for every retained row
//! - The [`Table`] contract the engine reads rows through
//! - The error taxonomy

pub mod error;
pub mod ids;
pub mod table;

pub use error::{LooseError, Result};
pub use ids::{Association, ConstraintId, FragmentId, GroupId, RowId};
pub use table::{Table, VecTable};
