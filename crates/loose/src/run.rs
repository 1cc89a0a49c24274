//! Config-driven entry point.

use thiserror::Error;
use tracing::info;

use loose_config::{ConfigError, RetryMode, RunConfig};
use loose_core::{LooseError, Table};
use loose_solver::{Loose, RetryReport};

/// Errors from [`run`].
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Engine(#[from] LooseError),
}

/// Validates `config` against `table` and runs the retry loop it describes.
///
/// A report whose `succeeded` flag is false is still `Ok`: it carries the
/// attempt that dropped the fewest rows.
pub fn run<T>(table: &T, config: &RunConfig) -> Result<RetryReport, Error>
where
    T: Table + Sync,
{
    let resolved = config.resolve(table)?;

    info!(
        event = "solve_start",
        rows = table.len(),
        fragments = resolved.fragments.len(),
        constraints = resolved.constraints.len(),
        retries = resolved.retries,
        retry_mode = ?resolved.retry_mode,
    );

    let mut loose = Loose::new(table, &resolved.constraints, resolved.fragments)?;
    if let Some(seed) = resolved.random_seed {
        loose = loose.with_seed(seed);
    }

    let report = match resolved.retry_mode {
        RetryMode::Sequential => loose.associate_with_retries(
            &resolved.k_list,
            resolved.retries,
            resolved.skip_probability,
        )?,
        RetryMode::Parallel => loose.associate_with_retries_parallel(
            &resolved.k_list,
            resolved.retries,
            resolved.skip_probability,
        )?,
    };

    info!(
        event = "solve_end",
        attempts = report.attempts,
        succeeded = report.succeeded,
        retained = report.result.associations.len(),
        dropped = report.result.dropped.len(),
    );
    Ok(report)
}
