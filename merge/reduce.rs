use crate::types::{MergedResult, PartialResult};

/// Folds partials into one result, strictly in the order given.
///
/// Genes keep their first-seen order across partials (partial 0 first), each gene's
/// values are appended partial by partial, and the sample id lists are concatenated in
/// the same order. Callers pass partials in shard dispatch order.
pub fn merge_partials<I>(partials: I) -> MergedResult
where
    I: IntoIterator<Item = PartialResult>,
{
    partials
        .into_iter()
        .fold(MergedResult::default(), |mut merged, partial| {
            for (gene_id, values) in partial.gene_values {
                merged.gene_values.append(gene_id, values);
            }
            merged.normal_ids.extend(partial.normal_ids);
            merged.tumor_ids.extend(partial.tumor_ids);
            merged
        })
}
