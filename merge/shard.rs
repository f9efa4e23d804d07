// ========================================================================================
//
//                              Shard file access & parsing
//
// ========================================================================================

use crate::types::{FileLocator, SampleRecord};
use flate2::read::MultiGzDecoder;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Read buffer for one decompressed quantification file. Files are ~60k short lines,
/// so a large buffer keeps the decoder fed with few syscalls.
const SHARD_READ_BUFFER_BYTES: usize = 1 << 20;

#[derive(Debug, Error)]
pub enum ShardError {
    #[error("cannot read shard file {path}: {source}")]
    UnreadableShard {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("malformed line {line_number} in {path}: expected 2 tab-separated fields, found {fields} in \"{content}\"")]
    MalformedLine {
        path: PathBuf,
        line_number: usize,
        fields: usize,
        content: String,
    },
}

/// A trait that abstracts where a sample's quantification bytes come from, regardless
/// of the underlying storage medium or compression.
///
/// Workers share one source across threads, so implementations must be `Sync`.
pub trait ShardSource: Sync {
    /// A human-readable location used in diagnostics.
    fn describe(&self, locator: &FileLocator) -> PathBuf;

    /// Opens the locator as a stream of decompressed text.
    fn open(&self, locator: &FileLocator) -> io::Result<Box<dyn BufRead + '_>>;
}

/// Reads gzip-compressed files from a local directory tree.
#[derive(Debug, Clone)]
pub struct GzipFileSource {
    root: PathBuf,
}

impl GzipFileSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl ShardSource for GzipFileSource {
    fn describe(&self, locator: &FileLocator) -> PathBuf {
        locator.resolve(&self.root)
    }

    fn open(&self, locator: &FileLocator) -> io::Result<Box<dyn BufRead + '_>> {
        let file = File::open(locator.resolve(&self.root))?;
        let decoder = MultiGzDecoder::new(BufReader::new(file));
        Ok(Box::new(BufReader::with_capacity(
            SHARD_READ_BUFFER_BYTES,
            decoder,
        )))
    }
}

/// A single-pass reader over one sample's `gene_id\tvalue` lines.
///
/// Records are lent out one at a time so the caller decides whether the gene id needs
/// an owned copy. The line terminator (`\n` or `\r\n`) is stripped; every other byte of
/// a field is kept verbatim.
pub struct ShardReader<R> {
    reader: R,
    path: PathBuf,
    line: String,
    line_number: usize,
}

impl<R: BufRead> ShardReader<R> {
    pub fn new(reader: R, path: PathBuf) -> Self {
        Self {
            reader,
            path,
            line: String::new(),
            line_number: 0,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the next `(gene_id, value)` pair, or `None` once the stream is exhausted.
    ///
    /// A missing newline on the last line and a single trailing newline are both fine.
    /// An empty line anywhere before the end is not a two-field record and is rejected.
    pub fn next_record(&mut self) -> Result<Option<(&str, &str)>, ShardError> {
        self.line.clear();
        let read = self
            .reader
            .read_line(&mut self.line)
            .map_err(|source| ShardError::UnreadableShard {
                path: self.path.clone(),
                source,
            })?;
        if read == 0 {
            return Ok(None);
        }
        self.line_number += 1;

        let content = self
            .line
            .strip_suffix("\r\n")
            .or_else(|| self.line.strip_suffix('\n'))
            .unwrap_or(&self.line);
        let mut fields = content.split('\t');
        match (fields.next(), fields.next(), fields.next()) {
            (Some(gene_id), Some(value), None) => Ok(Some((gene_id, value))),
            _ => Err(ShardError::MalformedLine {
                path: self.path.clone(),
                line_number: self.line_number,
                fields: content.split('\t').count(),
                content: content.to_string(),
            }),
        }
    }
}

/// Opens the shard file for `record` through `source`.
pub fn open_shard<'s, S: ShardSource + ?Sized>(
    source: &'s S,
    record: &SampleRecord,
) -> Result<ShardReader<Box<dyn BufRead + 's>>, ShardError> {
    let path = source.describe(&record.file_locator);
    match source.open(&record.file_locator) {
        Ok(reader) => Ok(ShardReader::new(reader, path)),
        Err(source) => Err(ShardError::UnreadableShard { path, source }),
    }
}
