// ========================================================================================
//
//                                 The worker accumulator
//
// ========================================================================================
//
// Each worker folds one contiguous shard of the sample list into a private
// `PartialResult`. Nothing here is shared with other workers except the read-only
// shard source, the progress observer and the cancellation flag.

use crate::progress::MergeProgressObserver;
use crate::shard::{ShardError, ShardSource, open_shard};
use crate::types::{Classification, PartialResult, SampleRecord};
use log::debug;
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;

/// A shard failure, tagged with the sample whose file caused it.
#[derive(Debug, Error)]
#[error("sample {submitter_id}: {cause}")]
pub struct WorkerError {
    pub submitter_id: String,
    #[source]
    pub cause: ShardError,
}

/// How a worker's run ended when it did not fail.
#[derive(Debug)]
pub enum ShardOutcome {
    Completed(PartialResult),
    /// Another worker failed and this one stopped at a sample boundary.
    Cancelled,
}

/// Accumulates every sample of `shard` in order.
///
/// `cancel` is checked before each sample; once it is set the worker returns
/// [`ShardOutcome::Cancelled`] without reading further files.
pub fn accumulate_shard<S, P>(
    shard_index: usize,
    shard: &[SampleRecord],
    source: &S,
    progress: &P,
    cancel: &AtomicBool,
) -> Result<ShardOutcome, WorkerError>
where
    S: ShardSource + ?Sized,
    P: MergeProgressObserver + ?Sized,
{
    let mut partial = PartialResult::new(shard_index);

    for record in shard {
        if cancel.load(Ordering::Relaxed) {
            debug!("Shard {shard_index} cancelled before {}", record.submitter_id);
            return Ok(ShardOutcome::Cancelled);
        }
        accumulate_sample(&mut partial, record, source).map_err(|cause| WorkerError {
            submitter_id: record.submitter_id.clone(),
            cause,
        })?;
        progress.on_sample_finish(shard_index, record);
    }

    debug!(
        "Shard {shard_index} done: {} samples, {} genes",
        partial.sample_count(),
        partial.gene_values.len()
    );
    Ok(ShardOutcome::Completed(partial))
}

/// Adds one sample's id and all of its values to `partial`.
fn accumulate_sample<S: ShardSource + ?Sized>(
    partial: &mut PartialResult,
    record: &SampleRecord,
    source: &S,
) -> Result<(), ShardError> {
    let mut reader = open_shard(source, record)?;
    debug!("Current: {}", reader.path().display());

    match record.classification {
        Classification::Normal => partial.normal_ids.push(record.submitter_id.clone()),
        Classification::Tumor => partial.tumor_ids.push(record.submitter_id.clone()),
    }

    while let Some((gene_id, value)) = reader.next_record()? {
        partial
            .gene_values
            .push(gene_id, record.classification, value);
    }
    Ok(())
}
