use crate::types::SampleRecord;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::io::IsTerminal;

/// Observer for reporting incremental progress while shards are processed.
///
/// Workers call into the observer concurrently, so implementations must be `Sync`.
pub trait MergeProgressObserver: Sync {
    fn on_start(&self, total_samples: usize, workers: usize) {
        let _ = (total_samples, workers);
    }
    fn on_sample_finish(&self, shard_index: usize, record: &SampleRecord) {
        let _ = (shard_index, record);
    }
    fn on_finish(&self) {}
}

#[derive(Default)]
pub struct NoopProgress;

impl MergeProgressObserver for NoopProgress {}

/// A terminal progress bar counting finished samples across all workers.
pub struct ProgressBarObserver {
    bar: ProgressBar,
}

impl ProgressBarObserver {
    pub fn new() -> Self {
        let draw_target = if std::io::stderr().is_terminal() {
            ProgressDrawTarget::stderr_with_hz(20)
        } else {
            ProgressDrawTarget::hidden()
        };
        let bar = ProgressBar::with_draw_target(None, draw_target);
        if let Ok(style) = ProgressStyle::with_template(
            "> [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} samples ({eta}) {msg}",
        ) {
            bar.set_style(style.progress_chars("█▉▊▋▌▍▎▏  "));
        }
        Self { bar }
    }
}

impl Default for ProgressBarObserver {
    fn default() -> Self {
        Self::new()
    }
}

impl MergeProgressObserver for ProgressBarObserver {
    fn on_start(&self, total_samples: usize, workers: usize) {
        self.bar.set_length(total_samples as u64);
        self.bar.set_message(format!("{workers} workers"));
    }

    fn on_sample_finish(&self, shard_index: usize, record: &SampleRecord) {
        let _ = shard_index;
        self.bar.set_message(record.submitter_id.clone());
        self.bar.inc(1);
    }

    fn on_finish(&self) {
        self.bar.finish_and_clear();
    }
}
