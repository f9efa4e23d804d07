// ========================================================================================
//
//                                  The merge pipeline
//
// ========================================================================================
//
// Manifest -> partition plan -> worker pool -> ordered merge -> matrix file. Every
// stage hands its result to the next by value; the run returns its statistics instead
// of keeping them as ambient state.

use crate::manifest::{self, ManifestError};
use crate::matrix::{self, MatrixError};
use crate::plan::PartitionPlan;
use crate::pool::{self, PoolError};
use crate::progress::MergeProgressObserver;
use crate::reduce;
use crate::shard::ShardSource;
use crate::types::{MergedResult, RunStats, SampleRecord};
use log::{info, warn};
use std::path::PathBuf;
use std::time::Instant;
use thiserror::Error;

/// The file name the matrix is written to unless the caller picks another.
pub const DEFAULT_OUTPUT_FILE_NAME: &str = "RNA_Matrix.txt";

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Manifest(#[from] ManifestError),
    #[error(transparent)]
    Pool(#[from] PoolError),
    #[error(transparent)]
    Matrix(#[from] MatrixError),
}

/// Everything a run needs to know, gathered from the command line. Where shard files
/// live is the business of the [`ShardSource`] handed to [`run`].
#[derive(Debug, Clone)]
pub struct MergeConfig {
    pub manifest_path: PathBuf,
    pub output_path: PathBuf,
    /// Upper bound on concurrent workers.
    pub parallelism: usize,
}

impl MergeConfig {
    pub fn new(manifest_path: impl Into<PathBuf>) -> Self {
        Self {
            manifest_path: manifest_path.into(),
            output_path: PathBuf::from(DEFAULT_OUTPUT_FILE_NAME),
            parallelism: num_cpus::get(),
        }
    }
}

/// Partitions `samples`, runs the pool and merges the partials in dispatch order.
///
/// Returns the merged result together with the number of workers used. Nothing is
/// written; this is the pure in-memory part of a run.
pub fn merge_samples<S, P>(
    samples: &[SampleRecord],
    parallelism: usize,
    source: &S,
    progress: &P,
) -> Result<(MergedResult, usize), PoolError>
where
    S: ShardSource + ?Sized,
    P: MergeProgressObserver + ?Sized,
{
    let plan = PartitionPlan::new(samples.len(), parallelism);
    let partials = pool::run_pool(samples, &plan, source, progress)?;
    info!("Merging {} partial results", partials.len());
    Ok((reduce::merge_partials(partials), plan.workers))
}

/// Runs the whole pipeline described by `config` and writes the matrix file.
pub fn run<S, P>(config: &MergeConfig, source: &S, progress: &P) -> Result<RunStats, PipelineError>
where
    S: ShardSource + ?Sized,
    P: MergeProgressObserver + ?Sized,
{
    let start = Instant::now();

    let samples = manifest::load_manifest(&config.manifest_path)?;
    info!(
        "Loaded {} samples from {}",
        samples.len(),
        config.manifest_path.display()
    );

    let (merged, worker_count) = merge_samples(&samples, config.parallelism, source, progress)?;
    let sample_count = merged.normal_ids.len() + merged.tumor_ids.len();

    let short_rows = count_short_rows(&merged, sample_count);
    if short_rows > 0 {
        warn!("{short_rows} genes are missing from some samples; their rows are shorter than the header");
    }

    info!(
        "Writing {} genes x {} samples to {}",
        merged.gene_values.len(),
        sample_count,
        config.output_path.display()
    );
    matrix::write_matrix_file(&merged, &config.output_path)?;

    Ok(RunStats {
        elapsed: start.elapsed(),
        normal_count: merged.normal_ids.len(),
        tumor_count: merged.tumor_ids.len(),
        gene_count: merged.gene_values.len(),
        worker_count,
        output_path: config.output_path.clone(),
    })
}

/// Genes that did not receive a value from every sample.
fn count_short_rows(merged: &MergedResult, sample_count: usize) -> usize {
    merged
        .gene_values
        .iter()
        .filter(|(_, values)| values.value_count() < sample_count)
        .count()
}
