// ========================================================================================
//
//                                  The pool coordinator
//
// ========================================================================================
//
// Dispatches one shard per worker onto a dedicated, fixed-size Rayon pool and joins on
// all of them before anything is merged. Results are indexed by dispatch position, so
// the order in which workers happen to finish never reaches the output.

use crate::plan::PartitionPlan;
use crate::progress::MergeProgressObserver;
use crate::shard::ShardSource;
use crate::types::{PartialResult, SampleRecord};
use crate::worker::{ShardOutcome, WorkerError, accumulate_shard};
use log::{info, warn};
use rayon::prelude::*;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PoolError {
    #[error("worker for shard {shard_index} failed on {cause}")]
    WorkerFailure {
        shard_index: usize,
        #[source]
        cause: WorkerError,
    },
    #[error("shard {shard_index} stopped before completion without a recorded failure")]
    Interrupted { shard_index: usize },
    #[error("failed to build a worker pool with {workers} threads: {source}")]
    ThreadPool {
        workers: usize,
        #[source]
        source: rayon::ThreadPoolBuildError,
    },
}

/// Runs every shard of `plan` over `samples` and returns the partials in dispatch order.
///
/// The first worker to fail raises a shared cancellation flag; the others stop at their
/// next sample boundary. Only the first failure is reported.
pub fn run_pool<S, P>(
    samples: &[SampleRecord],
    plan: &PartitionPlan,
    source: &S,
    progress: &P,
) -> Result<Vec<PartialResult>, PoolError>
where
    S: ShardSource + ?Sized,
    P: MergeProgressObserver + ?Sized,
{
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(plan.workers)
        .thread_name(|index| format!("genemerge-worker-{index}"))
        .build()
        .map_err(|source| PoolError::ThreadPool {
            workers: plan.workers,
            source,
        })?;

    info!(
        "Dispatching {} samples across {} shards on {} workers",
        samples.len(),
        plan.shards.len(),
        plan.workers
    );
    progress.on_start(samples.len(), plan.workers);

    let cancel = AtomicBool::new(false);
    let first_failure: Mutex<Option<PoolError>> = Mutex::new(None);

    let outcomes: Vec<Option<ShardOutcome>> = pool.install(|| {
        plan.shards
            .par_iter()
            .enumerate()
            .map(|(shard_index, range)| {
                match accumulate_shard(
                    shard_index,
                    &samples[range.clone()],
                    source,
                    progress,
                    &cancel,
                ) {
                    Ok(outcome) => Some(outcome),
                    Err(cause) => {
                        cancel.store(true, Ordering::Relaxed);
                        warn!("Shard {shard_index} failed: {cause}");
                        let mut slot = first_failure
                            .lock()
                            .unwrap_or_else(PoisonError::into_inner);
                        if slot.is_none() {
                            *slot = Some(PoolError::WorkerFailure { shard_index, cause });
                        }
                        None
                    }
                }
            })
            .collect()
    });
    progress.on_finish();

    if let Some(failure) = first_failure
        .into_inner()
        .unwrap_or_else(PoisonError::into_inner)
    {
        return Err(failure);
    }

    outcomes
        .into_iter()
        .enumerate()
        .map(|(shard_index, outcome)| match outcome {
            Some(ShardOutcome::Completed(partial)) => Ok(partial),
            _ => Err(PoolError::Interrupted { shard_index }),
        })
        .collect()
}
