// ========================================================================================
//
//                         The strategic orchestrator: genemerge
//
// ========================================================================================
//
// Parses the command line, installs logging, hands a `MergeConfig` to the pipeline and
// reports the run's statistics. All merge logic lives in the library.

#![deny(dead_code)]
#![deny(unused_imports)]

use clap::Parser;
use genemerge::pipeline::{self, DEFAULT_OUTPUT_FILE_NAME, MergeConfig};
use genemerge::progress::{MergeProgressObserver, NoopProgress, ProgressBarObserver};
use genemerge::shard::GzipFileSource;
use genemerge::types::RunStats;
use std::error::Error;
use std::path::PathBuf;
use std::process;

// ========================================================================================
//                              Command-line interface definition
// ========================================================================================

#[derive(Parser, Debug)]
#[clap(
    name = "genemerge",
    version,
    about = "Merge per-sample gzip quantification files into one gene-by-sample expression matrix."
)]
struct Args {
    /// Path to the JSON manifest listing the quantification files to merge.
    #[clap(value_name = "MANIFEST")]
    manifest: PathBuf,

    /// Where to write the merged matrix.
    #[clap(short, long, default_value = DEFAULT_OUTPUT_FILE_NAME)]
    output: PathBuf,

    /// Directory that the manifest's `file_id/file_name` paths are relative to.
    #[clap(long, default_value = ".")]
    data_dir: PathBuf,

    /// Number of worker threads. Defaults to the number of logical cores.
    #[clap(long)]
    threads: Option<usize>,

    /// Do not draw a progress bar.
    #[clap(long)]
    no_progress: bool,
}

// ========================================================================================
//                              The main orchestration logic
// ========================================================================================

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(e) = run(Args::parse()) {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run(args: Args) -> Result<(), Box<dyn Error + Send + Sync>> {
    let mut config = MergeConfig::new(args.manifest);
    config.output_path = args.output;
    if let Some(threads) = args.threads {
        config.parallelism = threads;
    }

    let source = GzipFileSource::new(args.data_dir);
    let progress: Box<dyn MergeProgressObserver> = if args.no_progress {
        Box::new(NoopProgress)
    } else {
        Box::new(ProgressBarObserver::new())
    };

    let stats = pipeline::run(&config, &source, progress.as_ref())?;
    print_stats(&stats);
    Ok(())
}

fn print_stats(stats: &RunStats) {
    println!("\n---------------- Stats ----------------");
    println!("Normal Count: {}", stats.normal_count);
    println!("Tumor Count:  {}", stats.tumor_count);
    println!("Gene Count:   {}", stats.gene_count);
    println!("Workers:      {}", stats.worker_count);
    println!("---------------------------------------\n");
    println!("> Result has been generated to {}", stats.output_path.display());
    println!("> Process done, it took {:.2}s", stats.elapsed.as_secs_f64());
}
