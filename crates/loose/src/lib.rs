//! Loose - privacy-preserving publication of fragmented tables
//!
//! A table split into fragments is published as groups of rows per fragment
//! plus a group-level association, so that sensitive attribute combinations
//! spanning fragments cannot be re-linked beyond the chosen privacy degree.
//!
//! # Example
//!
//! ```
//! use loose::prelude::*;
//!
//! let table = VecTable::new(
//!     vec!["name".into(), "disease".into()],
//!     vec![
//!         vec!["ann", "flu"],
//!         vec!["bob", "cold"],
//!         vec!["cid", "asthma"],
//!         vec!["dan", "mumps"],
//!     ],
//! )
//! .unwrap();
//!
//! let config = RunConfig::new()
//!     .with_fragment(["name"])
//!     .with_fragment(["disease"])
//!     .with_constraint(["name", "disease"])
//!     .with_k_list([2, 2]);
//!
//! let report = loose::run(&table, &config).unwrap();
//! assert!(report.succeeded);
//! assert_eq!(report.result.associations.len(), 4);
//! ```

pub mod console;
pub mod publication;
mod run;

pub use loose_config::{ConfigError, ResolvedConfig, RetryMode, RunConfig};
pub use loose_core::{
    Association, ConstraintId, FragmentId, GroupId, LooseError, RowId, Table, VecTable,
};
pub use loose_solver::{
    check_result, Associations, Constraints, DropReason, Loose, LooseResult, RetryReport,
    RunStats, Violation,
};
pub use publication::{FragmentRelation, Publication, PublishedRow};
pub use run::{run, Error};

pub mod prelude {
    pub use super::{
        Associations, DropReason, Loose, LooseResult, RetryMode, RetryReport, RunConfig, Table,
        VecTable,
    };
    pub use super::{Publication, Error};
}
