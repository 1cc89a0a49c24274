//! Shared test fixtures for loose association crates.
//!
//! This crate provides tables and run parameters for testing.
//! It depends on `loose-core` only, so the engine crates can use it as a
//! dev-dependency.
//!
//! - [`tables`] - Seeded generated tables (uniform, self-similar)
//! - [`scenarios`] - Small hand-built inputs with known outcomes
//!
//! # Usage
//!
//! Add as a dev-dependency in your crate's `Cargo.toml`:
//!
//! ```toml
//! [dev-dependencies]
//! loose-test = { workspace = true }
//! ```
//!
//! Then import the fixtures you need:
//!
//! ```
//! use loose_core::Table;
//! use loose_test::{scenarios, tables};
//!
//! let scenario = scenarios::distinct_rows().unwrap();
//! assert_eq!(scenario.table.len(), 4);
//!
//! let table = tables::random_table(50, 4, 10, 7).unwrap();
//! assert_eq!(table.len(), 50);
//! ```

pub mod scenarios;
pub mod tables;

pub use scenarios::Scenario;
pub use tables::{random_table, self_similar_table};
