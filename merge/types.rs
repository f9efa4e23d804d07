// ========================================================================================
//                             High-Level Data Contracts
// ========================================================================================

// This file is ONLY for types that are SHARED BETWEEN FILES, not types that only are used in one file.

use ahash::AHashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// The sample-type label derived from a submitter identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Classification {
    Tumor,
    Normal,
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Classification::Tumor => f.write_str("tumor"),
            Classification::Normal => f.write_str("normal"),
        }
    }
}

/// Where a sample's quantification file lives, relative to the data root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileLocator {
    pub directory: String,
    pub file_name: String,
}

impl FileLocator {
    /// Joins the locator onto `root` to produce a concrete filesystem path.
    pub fn resolve(&self, root: &Path) -> PathBuf {
        root.join(&self.directory).join(&self.file_name)
    }
}

impl fmt::Display for FileLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.directory, self.file_name)
    }
}

/// One manifest entry after validation. Constructed only by the manifest parser,
/// so the classification always agrees with the submitter identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleRecord {
    pub file_locator: FileLocator,
    pub submitter_id: String,
    pub classification: Classification,
}

/// The values one gene collected, split by the class of the sample that reported them.
///
/// Keeping the two classes apart lets the matrix emit every normal column before every
/// tumor column regardless of the order in which samples were read.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GeneValues {
    pub normal: Vec<String>,
    pub tumor: Vec<String>,
}

impl GeneValues {
    #[inline]
    pub fn push(&mut self, classification: Classification, value: &str) {
        match classification {
            Classification::Normal => self.normal.push(value.to_owned()),
            Classification::Tumor => self.tumor.push(value.to_owned()),
        }
    }

    /// Appends `other` after the values already held, class by class.
    pub fn extend(&mut self, other: GeneValues) {
        self.normal.extend(other.normal);
        self.tumor.extend(other.tumor);
    }

    /// Number of samples that reported this gene.
    pub fn value_count(&self) -> usize {
        self.normal.len() + self.tumor.len()
    }

    /// Values in output column order: normals first, then tumors.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.normal
            .iter()
            .chain(self.tumor.iter())
            .map(String::as_str)
    }
}

/// A gene -> values map that remembers the order in which genes were first seen.
///
/// Row order of the final matrix is the first-seen order of genes, so a plain hash map
/// is not enough. The index maps a gene id to its slot in `rows`.
#[derive(Debug, Clone, Default)]
pub struct GeneValueMap {
    index: AHashMap<String, usize>,
    rows: Vec<(String, GeneValues)>,
}

impl GeneValueMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one sample's value for `gene_id`, creating the row on first sight.
    /// The gene id is only allocated when the row is created.
    pub fn push(&mut self, gene_id: &str, classification: Classification, value: &str) {
        let slot = match self.index.get(gene_id) {
            Some(&slot) => slot,
            None => self.insert_row(gene_id.to_owned()),
        };
        self.rows[slot].1.push(classification, value);
    }

    /// Appends a whole row of values for `gene_id`, creating the row on first sight.
    pub fn append(&mut self, gene_id: String, values: GeneValues) {
        match self.index.get(&gene_id) {
            Some(&slot) => self.rows[slot].1.extend(values),
            None => {
                let slot = self.insert_row(gene_id);
                self.rows[slot].1 = values;
            }
        }
    }

    fn insert_row(&mut self, gene_id: String) -> usize {
        let slot = self.rows.len();
        self.index.insert(gene_id.clone(), slot);
        self.rows.push((gene_id, GeneValues::default()));
        slot
    }

    #[cfg(test)]
    pub fn get(&self, gene_id: &str) -> Option<&GeneValues> {
        self.index.get(gene_id).map(|&slot| &self.rows[slot].1)
    }

    /// Number of distinct genes.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Iterates genes in first-seen order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &GeneValues)> {
        self.rows
            .iter()
            .map(|(gene_id, values)| (gene_id.as_str(), values))
    }
}

impl IntoIterator for GeneValueMap {
    type Item = (String, GeneValues);
    type IntoIter = std::vec::IntoIter<(String, GeneValues)>;

    /// Consumes the map, yielding rows in first-seen order.
    fn into_iter(self) -> Self::IntoIter {
        self.rows.into_iter()
    }
}

/// One worker's accumulation over its shard.
#[derive(Debug, Default)]
pub struct PartialResult {
    pub shard_index: usize,
    pub gene_values: GeneValueMap,
    pub normal_ids: Vec<String>,
    pub tumor_ids: Vec<String>,
}

impl PartialResult {
    pub fn new(shard_index: usize) -> Self {
        Self {
            shard_index,
            ..Self::default()
        }
    }

    pub fn sample_count(&self) -> usize {
        self.normal_ids.len() + self.tumor_ids.len()
    }
}

/// The global accumulation after all partials have been folded in dispatch order.
#[derive(Debug, Default)]
pub struct MergedResult {
    pub gene_values: GeneValueMap,
    pub normal_ids: Vec<String>,
    pub tumor_ids: Vec<String>,
}

/// What a finished run reports back to its caller.
#[derive(Debug, Clone)]
pub struct RunStats {
    pub elapsed: Duration,
    pub normal_count: usize,
    pub tumor_count: usize,
    pub gene_count: usize,
    pub worker_count: usize,
    pub output_path: PathBuf,
}
