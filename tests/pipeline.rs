use flate2::Compression;
use flate2::write::GzEncoder;
use genemerge::pipeline::{self, MergeConfig, PipelineError};
use genemerge::pool::PoolError;
use genemerge::progress::NoopProgress;
use genemerge::shard::{GzipFileSource, ShardError};
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;
use tempfile::TempDir;

struct Sample<'a> {
    directory: &'a str,
    submitter_id: &'a str,
    contents: Option<&'a str>,
}

/// Lays out one gzip file per sample under `root/<directory>/quant.txt.gz` and a
/// manifest describing them, in the given order.
fn write_fixture(root: &Path, samples: &[Sample<'_>]) {
    let mut entries = Vec::new();
    for sample in samples {
        if let Some(contents) = sample.contents {
            let dir = root.join(sample.directory);
            fs::create_dir_all(&dir).expect("create sample dir");
            let mut encoder = GzEncoder::new(
                File::create(dir.join("quant.txt.gz")).expect("create shard"),
                Compression::default(),
            );
            encoder
                .write_all(contents.as_bytes())
                .expect("write shard");
            encoder.finish().expect("finish gzip");
        }
        entries.push(format!(
            r#"{{"file_id": "{}", "file_name": "quant.txt.gz", "associated_entities": [{{"entity_submitter_id": "{}"}}]}}"#,
            sample.directory, sample.submitter_id
        ));
    }
    fs::write(
        root.join("manifest.json"),
        format!("[{}]", entries.join(",")),
    )
    .expect("write manifest");
}

fn config(root: &Path, output_name: &str, parallelism: usize) -> MergeConfig {
    let mut config = MergeConfig::new(root.join("manifest.json"));
    config.output_path = root.join(output_name);
    config.parallelism = parallelism;
    config
}

fn run(root: &Path, output_name: &str, parallelism: usize) -> Result<String, PipelineError> {
    let config = config(root, output_name, parallelism);
    let source = GzipFileSource::new(root);
    pipeline::run(&config, &source, &NoopProgress)?;
    Ok(fs::read_to_string(&config.output_path).expect("read matrix"))
}

fn many_samples() -> (TempDir, Vec<String>) {
    let dir = tempfile::tempdir().expect("tempdir");
    let ids: Vec<String> = (0..9)
        .map(|index| {
            let code = if index % 3 == 0 { "11A" } else { "01A" };
            format!("TCGA-AB-{index:04}-{code}-11R-A355-07")
        })
        .collect();
    let contents: Vec<String> = (0..9)
        .map(|index| {
            let mut text = format!("ENSG0001\t{index}.5\nENSG0002\t{}\n", index * 10);
            if index % 4 == 0 {
                text.push_str(&format!("ENSG0003\t{index}e-3\n"));
            }
            text
        })
        .collect();
    let directories: Vec<String> = (0..9).map(|index| format!("uuid-{index}")).collect();
    let samples: Vec<Sample<'_>> = (0..9)
        .map(|index| Sample {
            directory: &directories[index],
            submitter_id: &ids[index],
            contents: Some(&contents[index]),
        })
        .collect();
    write_fixture(dir.path(), &samples);
    (dir, ids)
}

#[test]
fn normal_and_tumor_round_trip_with_ragged_row() {
    let dir = tempfile::tempdir().expect("tempdir");
    let normal = "TCGA-SX-A7SL-11A-11R-A355-07";
    let tumor = "TCGA-SX-A7SL-01A-11R-A355-07";
    write_fixture(
        dir.path(),
        &[
            Sample {
                directory: "n",
                submitter_id: normal,
                contents: Some("geneA\t1.0\ngeneB\t2.0\n"),
            },
            Sample {
                directory: "t",
                submitter_id: tumor,
                contents: Some("geneA\t3.0\n"),
            },
        ],
    );

    let matrix = run(dir.path(), "RNA_Matrix.txt", 4).expect("pipeline succeeds");
    assert_eq!(
        matrix,
        format!("id\t{normal}\t{tumor}\ngeneA\t1.0\t3.0\ngeneB\t2.0\n")
    );
}

#[test]
fn crlf_shards_produce_clean_rows() {
    let dir = tempfile::tempdir().expect("tempdir");
    let normal = "TCGA-SX-A7SL-11A";
    let tumor = "TCGA-SX-A7SL-01A";
    write_fixture(
        dir.path(),
        &[
            Sample {
                directory: "n",
                submitter_id: normal,
                contents: Some("geneA\t1.0\r\n"),
            },
            Sample {
                directory: "t",
                submitter_id: tumor,
                contents: Some("geneA\t3.0\r\n"),
            },
        ],
    );

    let matrix = run(dir.path(), "RNA_Matrix.txt", 2).expect("pipeline succeeds");
    assert_eq!(matrix, format!("id\t{normal}\t{tumor}\ngeneA\t1.0\t3.0\n"));
    assert!(!matrix.contains('\r'));
}

#[test]
fn shards_resolve_against_the_source_root() {
    let manifest_dir = tempfile::tempdir().expect("manifest tempdir");
    let data_dir = tempfile::tempdir().expect("data tempdir");
    let normal = "TCGA-SX-A7SL-11A";
    write_fixture(
        data_dir.path(),
        &[Sample {
            directory: "n",
            submitter_id: normal,
            contents: Some("geneA\t1.0\n"),
        }],
    );
    fs::rename(
        data_dir.path().join("manifest.json"),
        manifest_dir.path().join("manifest.json"),
    )
    .expect("move manifest");

    let config = config(manifest_dir.path(), "out.txt", 1);
    let source = GzipFileSource::new(data_dir.path());
    let stats = pipeline::run(&config, &source, &NoopProgress).expect("pipeline succeeds");
    assert_eq!(stats.normal_count, 1);
    assert_eq!(
        fs::read_to_string(&config.output_path).expect("read matrix"),
        format!("id\t{normal}\t\ngeneA\t1.0\n")
    );

    // The same manifest against a source rooted elsewhere finds nothing.
    let elsewhere = GzipFileSource::new(manifest_dir.path());
    match pipeline::run(&config, &elsewhere, &NoopProgress) {
        Err(PipelineError::Pool(PoolError::WorkerFailure { cause, .. })) => match cause.cause {
            ShardError::UnreadableShard { path, .. } => {
                assert!(path.starts_with(manifest_dir.path()), "{}", path.display());
            }
            other => panic!("expected UnreadableShard, got {other:?}"),
        },
        other => panic!("expected a worker failure, got {other:?}"),
    }
}

#[test]
fn tumor_read_first_still_lands_after_normals() {
    let dir = tempfile::tempdir().expect("tempdir");
    let tumor = "TCGA-SX-A7SL-01A-11R-A355-07";
    let normal = "TCGA-SX-A7SL-11A-11R-A355-07";
    write_fixture(
        dir.path(),
        &[
            Sample {
                directory: "t",
                submitter_id: tumor,
                contents: Some("geneA\tT\n"),
            },
            Sample {
                directory: "n",
                submitter_id: normal,
                contents: Some("geneA\tN\n"),
            },
        ],
    );

    let matrix = run(dir.path(), "out.txt", 1).expect("pipeline succeeds");
    assert_eq!(matrix, format!("id\t{normal}\t{tumor}\ngeneA\tN\tT\n"));
}

#[test]
fn worker_count_does_not_change_the_matrix() {
    let (dir, ids) = many_samples();

    let single = run(dir.path(), "single.txt", 1).expect("one worker");
    for parallelism in [2, 3, 4, 9, 16] {
        let parallel = run(dir.path(), &format!("p{parallelism}.txt"), parallelism)
            .expect("parallel run");
        assert_eq!(single, parallel, "parallelism {parallelism} diverged");
    }

    let header: Vec<&str> = single.lines().next().expect("header").split('\t').collect();
    let normals: Vec<&str> = ids
        .iter()
        .enumerate()
        .filter(|(index, _)| index % 3 == 0)
        .map(|(_, id)| id.as_str())
        .collect();
    assert_eq!(&header[1..4], normals.as_slice());
    assert_eq!(header.len(), 1 + ids.len());

    // ENSG0003 only appears in samples 0, 4 and 8.
    let sparse_row = single
        .lines()
        .find(|line| line.starts_with("ENSG0003"))
        .expect("sparse gene row");
    assert_eq!(sparse_row, "ENSG0003\t0e-3\t4e-3\t8e-3");
}

#[test]
fn reruns_are_byte_identical() {
    let (dir, _) = many_samples();
    let first = run(dir.path(), "a.txt", 4).expect("first run");
    let second = run(dir.path(), "b.txt", 4).expect("second run");
    assert_eq!(first.as_bytes(), second.as_bytes());
}

#[test]
fn unreadable_shard_fails_without_output() {
    let dir = tempfile::tempdir().expect("tempdir");
    write_fixture(
        dir.path(),
        &[
            Sample {
                directory: "a",
                submitter_id: "TCGA-AB-0001-11A",
                contents: Some("g\t1\n"),
            },
            Sample {
                directory: "b",
                submitter_id: "TCGA-AB-0002-01A",
                contents: None,
            },
        ],
    );

    let config = config(dir.path(), "RNA_Matrix.txt", 2);
    let source = GzipFileSource::new(dir.path());
    match pipeline::run(&config, &source, &NoopProgress) {
        Err(PipelineError::Pool(PoolError::WorkerFailure { shard_index, cause })) => {
            assert_eq!(shard_index, 1);
            assert_eq!(cause.submitter_id, "TCGA-AB-0002-01A");
            assert!(matches!(cause.cause, ShardError::UnreadableShard { .. }));
        }
        other => panic!("expected a worker failure, got {other:?}"),
    }
    assert!(!config.output_path.exists());
}

#[test]
fn malformed_line_is_reported_with_its_location() {
    let dir = tempfile::tempdir().expect("tempdir");
    write_fixture(
        dir.path(),
        &[Sample {
            directory: "a",
            submitter_id: "TCGA-AB-0001-01A",
            contents: Some("g1\t1\ng2 2\n"),
        }],
    );

    let err = run(dir.path(), "out.txt", 1).expect_err("malformed line");
    let message = err.to_string();
    assert!(message.contains("shard 0"), "{message}");
    assert!(message.contains("line 2"), "{message}");
    assert!(!dir.path().join("out.txt").exists());
}

#[test]
fn malformed_manifest_record_stops_before_any_work() {
    let dir = tempfile::tempdir().expect("tempdir");
    write_fixture(
        dir.path(),
        &[Sample {
            directory: "a",
            submitter_id: "TCGA-SHORT",
            contents: Some("g\t1\n"),
        }],
    );

    let err = run(dir.path(), "out.txt", 1).expect_err("short submitter id");
    assert!(matches!(err, PipelineError::Manifest(_)));
    assert!(!dir.path().join("out.txt").exists());
}
