//! Randomized retries.
//!
//! A deterministic run may drop rows that another candidate order would have
//! kept. Retrying with random candidate skipping explores other orders; the
//! first attempt that drops nothing wins.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use tracing::{debug, info};

use loose_core::{LooseError, Result, Table};

use crate::builder::{Loose, LooseResult};

/// Outcome of a retry loop.
#[derive(Debug, Clone)]
pub struct RetryReport {
    /// The successful attempt, or the attempt that dropped the fewest rows.
    pub result: LooseResult,
    /// Number of attempts executed.
    pub attempts: usize,
    /// True if some attempt dropped no row.
    pub succeeded: bool,
}

impl RetryReport {
    /// Converts a failed report into [`LooseError::RunFailure`].
    pub fn into_result(self) -> Result<LooseResult> {
        if self.succeeded {
            Ok(self.result)
        } else {
            Err(LooseError::RunFailure {
                attempts: self.attempts,
                dropped: self.result.dropped.len(),
            })
        }
    }
}

fn check_retries(retries: usize) -> Result<()> {
    if retries == 0 {
        return Err(LooseError::Config(
            "at least one attempt is required".to_string(),
        ));
    }
    Ok(())
}

/// Prefers the earlier attempt unless the later one drops strictly fewer rows.
fn better(best: LooseResult, candidate: LooseResult) -> LooseResult {
    if candidate.dropped.len() < best.dropped.len() {
        candidate
    } else {
        best
    }
}

impl<T: Table> Loose<'_, T> {
    /// Runs up to `retries` attempts in sequence with one shared generator.
    ///
    /// With `skip_probability == 0` every attempt would be identical, so only
    /// one runs.
    pub fn associate_with_retries(
        &self,
        k_list: &[usize],
        retries: usize,
        skip_probability: f64,
    ) -> Result<RetryReport> {
        check_retries(retries)?;
        let allowed = if skip_probability == 0.0 { 1 } else { retries };
        let mut rng = self.rng();

        let mut best = self.run(k_list, skip_probability, &mut rng, None)?;
        let mut attempts = 1;
        debug!(event = "attempt_end", attempt = 1, dropped = best.dropped.len());

        while !best.is_complete() && !best.aborted && attempts < allowed {
            attempts += 1;
            let result = self.run(k_list, skip_probability, &mut rng, None)?;
            debug!(event = "attempt_end", attempt = attempts, dropped = result.dropped.len());
            let aborted = result.aborted;
            best = if result.is_complete() {
                result
            } else {
                better(best, result)
            };
            if aborted {
                break;
            }
        }

        let succeeded = best.is_complete();
        info!(
            event = "retries_end",
            mode = "sequential",
            attempts = attempts,
            succeeded = succeeded,
            dropped = best.dropped.len(),
        );
        Ok(RetryReport {
            result: best,
            attempts,
            succeeded,
        })
    }
}

impl<T> Loose<'_, T>
where
    T: Table + Sync,
{
    /// Runs up to `retries` attempts in parallel.
    ///
    /// Attempt `i` is seeded with the base seed plus `i`. Once any attempt
    /// succeeds the others are cancelled; the lowest-numbered success wins.
    pub fn associate_with_retries_parallel(
        &self,
        k_list: &[usize],
        retries: usize,
        skip_probability: f64,
    ) -> Result<RetryReport> {
        check_retries(retries)?;
        if skip_probability == 0.0 {
            return self.associate_with_retries(k_list, 1, skip_probability);
        }

        let base_seed = self.seed().unwrap_or_else(|| rand::rng().random());
        let found = Arc::new(AtomicBool::new(false));

        let outcomes: Vec<(usize, LooseResult)> = (0..retries)
            .into_par_iter()
            .map(|attempt| -> Result<Option<(usize, LooseResult)>> {
                if found.load(Ordering::SeqCst) {
                    return Ok(None);
                }
                let rng = ChaCha8Rng::seed_from_u64(base_seed.wrapping_add(attempt as u64));
                let result = self.run(k_list, skip_probability, rng, Some(Arc::clone(&found)))?;
                if result.is_complete() {
                    found.store(true, Ordering::SeqCst);
                }
                Ok(Some((attempt, result)))
            })
            .collect::<Result<Vec<_>>>()?
            .into_iter()
            .flatten()
            .collect();

        let attempts = outcomes.len();
        let mut complete = None;
        let mut best: Option<(usize, LooseResult)> = None;
        for (attempt, result) in outcomes {
            if result.is_complete() {
                if complete.as_ref().map_or(true, |(first, _)| attempt < *first) {
                    complete = Some((attempt, result));
                }
                continue;
            }
            let replace = match &best {
                None => true,
                Some((earlier, kept)) => {
                    (kept.aborted && !result.aborted)
                        || (kept.aborted == result.aborted
                            && (result.dropped.len(), attempt) < (kept.dropped.len(), *earlier))
                }
            };
            if replace {
                best = Some((attempt, result));
            }
        }

        let succeeded = complete.is_some();
        let (_, result) = complete
            .or(best)
            .ok_or(LooseError::RunFailure {
                attempts,
                dropped: self.table().len(),
            })?;
        info!(
            event = "retries_end",
            mode = "parallel",
            attempts = attempts,
            succeeded = succeeded,
            dropped = result.dropped.len(),
        );
        Ok(RetryReport {
            result,
            attempts,
            succeeded,
        })
    }
}
