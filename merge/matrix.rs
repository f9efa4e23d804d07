// ========================================================================================
//
//                                  Matrix serialization
//
// ========================================================================================

use crate::types::MergedResult;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Output is written in large blocks; a full matrix is tens of megabytes.
const MATRIX_WRITE_BUFFER_BYTES: usize = 1 << 20;

#[derive(Debug, Error)]
pub enum MatrixError {
    #[error("failed to write matrix to {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to move finished matrix from {from} to {to}: {source}")]
    Persist {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Serializes `merged` as a tab-separated gene-by-sample matrix.
///
/// Header: `id`, the normal ids (each preceded by a tab, only when there are any), then a
/// tab and the tab-joined tumor ids. The tab before the tumor block is written even when
/// there are no tumor samples, so such a header ends in `\t\n`.
/// Rows: gene id, a tab, the gene's values joined by tabs. Rows are not padded when a
/// gene was missing from some samples.
pub fn write_matrix<W: Write>(merged: &MergedResult, writer: &mut W) -> io::Result<()> {
    writer.write_all(b"id")?;
    for normal_id in &merged.normal_ids {
        writer.write_all(b"\t")?;
        writer.write_all(normal_id.as_bytes())?;
    }
    writer.write_all(b"\t")?;
    write_joined(writer, merged.tumor_ids.iter().map(String::as_str))?;
    writer.write_all(b"\n")?;

    for (gene_id, values) in merged.gene_values.iter() {
        writer.write_all(gene_id.as_bytes())?;
        writer.write_all(b"\t")?;
        write_joined(writer, values.iter())?;
        writer.write_all(b"\n")?;
    }
    Ok(())
}

fn write_joined<'a, W: Write>(
    writer: &mut W,
    fields: impl Iterator<Item = &'a str>,
) -> io::Result<()> {
    for (position, field) in fields.enumerate() {
        if position > 0 {
            writer.write_all(b"\t")?;
        }
        writer.write_all(field.as_bytes())?;
    }
    Ok(())
}

/// Writes the matrix to `output_path` through a sibling temporary file that is renamed
/// into place only after a successful flush. A failed write leaves nothing at
/// `output_path`.
pub fn write_matrix_file(merged: &MergedResult, output_path: &Path) -> Result<(), MatrixError> {
    let temp_path = temporary_path(output_path);
    let write_error = |source| MatrixError::Write {
        path: temp_path.clone(),
        source,
    };

    let result = File::create(&temp_path)
        .map_err(write_error)
        .and_then(|file| {
            let mut writer = BufWriter::with_capacity(MATRIX_WRITE_BUFFER_BYTES, file);
            write_matrix(merged, &mut writer).map_err(write_error)?;
            writer.flush().map_err(write_error)
        });
    if let Err(err) = result {
        let _ = fs::remove_file(&temp_path);
        return Err(err);
    }

    fs::rename(&temp_path, output_path).map_err(|source| {
        let _ = fs::remove_file(&temp_path);
        MatrixError::Persist {
            from: temp_path.clone(),
            to: output_path.to_path_buf(),
            source,
        }
    })
}

fn temporary_path(output_path: &Path) -> PathBuf {
    let mut name = output_path
        .file_name()
        .map(|name| name.to_os_string())
        .unwrap_or_else(|| "matrix".into());
    name.push(".partial");
    output_path.with_file_name(name)
}
