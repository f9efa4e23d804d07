use std::ops::Range;

/// How a sample list is split across the worker pool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionPlan {
    pub workers: usize,
    pub shards: Vec<Range<usize>>,
}

impl PartitionPlan {
    /// Plans `sample_count` samples over at most `parallelism` workers.
    pub fn new(sample_count: usize, parallelism: usize) -> Self {
        let workers = worker_count(sample_count, parallelism);
        Self {
            workers,
            shards: shard_ranges(sample_count, workers),
        }
    }

    pub fn shard_sizes(&self) -> Vec<usize> {
        self.shards.iter().map(|range| range.len()).collect()
    }
}

/// Uses every available core once there is at least one sample per core; otherwise a
/// single worker handles everything. Never more workers than samples.
pub fn worker_count(sample_count: usize, parallelism: usize) -> usize {
    if parallelism >= 1 && sample_count >= parallelism {
        parallelism
    } else {
        1
    }
}

/// Contiguous shard ranges: every shard but the last holds `sample_count / workers`
/// samples and the last one absorbs the remainder. An empty sample list has no shards.
pub fn shard_ranges(sample_count: usize, workers: usize) -> Vec<Range<usize>> {
    if sample_count == 0 {
        return Vec::new();
    }
    let workers = workers.clamp(1, sample_count);
    let shard_size = sample_count / workers;

    let mut shards = Vec::with_capacity(workers);
    let mut start = 0;
    for shard_index in 0..workers {
        let end = if shard_index == workers - 1 {
            sample_count
        } else {
            start + shard_size
        };
        shards.push(start..end);
        start = end;
    }
    shards
}
