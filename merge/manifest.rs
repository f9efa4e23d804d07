// ========================================================================================
//
//                        Manifest loading & sample record parsing
//
// ========================================================================================

use crate::types::{Classification, FileLocator, SampleRecord};
use serde::Deserialize;
use std::fs::File;
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Zero-based offset of the sample-type code's first digit within a submitter id,
/// e.g. the `0` of `01A` in `TCGA-SX-A7SL-01A-11R-A355-07`.
pub const SAMPLE_TYPE_OFFSET: usize = 13;

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("failed to open manifest {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("manifest {path} is not a valid JSON entry list: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("malformed manifest record at index {index}: {reason}")]
    MalformedRecord { index: usize, reason: String },
}

/// One raw manifest entry, as written by the data portal. Fields this crate does not
/// use are ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct ManifestEntry {
    pub file_id: Option<String>,
    pub file_name: Option<String>,
    #[serde(default)]
    pub associated_entities: Vec<AssociatedEntity>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AssociatedEntity {
    pub entity_submitter_id: Option<String>,
}

/// Reads the manifest at `path` and parses every entry into a [`SampleRecord`],
/// preserving manifest order.
pub fn load_manifest(path: &Path) -> Result<Vec<SampleRecord>, ManifestError> {
    let file = File::open(path).map_err(|source| ManifestError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let entries: Vec<ManifestEntry> = serde_json::from_reader(BufReader::new(file))
        .map_err(|source| ManifestError::Json {
            path: path.to_path_buf(),
            source,
        })?;
    parse_entries(entries)
}

/// Parses already-deserialized entries, failing on the first malformed one.
pub fn parse_entries(entries: Vec<ManifestEntry>) -> Result<Vec<SampleRecord>, ManifestError> {
    entries
        .into_iter()
        .enumerate()
        .map(|(index, entry)| parse_record(index, entry))
        .collect()
}

/// Turns one manifest entry into a typed record. `index` is only used to point the
/// user at the offending entry.
pub fn parse_record(index: usize, entry: ManifestEntry) -> Result<SampleRecord, ManifestError> {
    let malformed = |reason: String| ManifestError::MalformedRecord { index, reason };

    let directory = entry
        .file_id
        .ok_or_else(|| malformed("missing 'file_id'".to_string()))?;
    let file_name = entry
        .file_name
        .ok_or_else(|| malformed("missing 'file_name'".to_string()))?;
    let submitter_id = entry
        .associated_entities
        .into_iter()
        .next()
        .ok_or_else(|| malformed("'associated_entities' is empty".to_string()))?
        .entity_submitter_id
        .ok_or_else(|| {
            malformed("first associated entity has no 'entity_submitter_id'".to_string())
        })?;

    let classification = classify(&submitter_id).map_err(malformed)?;

    Ok(SampleRecord {
        file_locator: FileLocator {
            directory,
            file_name,
        },
        submitter_id,
        classification,
    })
}

/// Derives the sample class from the sample-type code inside a submitter id.
///
/// Tumor codes start with `0` (`01`-`09`); every other digit marks a normal or control
/// sample. Anything that is not a digit at that offset means the id does not follow the
/// barcode scheme, and guessing a class would silently corrupt the matrix columns.
pub fn classify(submitter_id: &str) -> Result<Classification, String> {
    match submitter_id.as_bytes().get(SAMPLE_TYPE_OFFSET) {
        Some(b'0') => Ok(Classification::Tumor),
        Some(code) if code.is_ascii_digit() => Ok(Classification::Normal),
        Some(&code) => Err(format!(
            "submitter id '{submitter_id}' has '{}' at offset {SAMPLE_TYPE_OFFSET}, expected a sample-type digit",
            code.escape_ascii()
        )),
        None => Err(format!(
            "submitter id '{submitter_id}' is shorter than {} characters",
            SAMPLE_TYPE_OFFSET + 1
        )),
    }
}
