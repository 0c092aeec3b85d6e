//! Encoding of multi-valued categorical fields as boolean matrices.

use std::collections::BTreeSet;

use ndarray::{Array1, Array2};

use crate::error::DataprepResult;
use crate::labels::LabelResolver;
use crate::record::TargetData;
use crate::subset::{mask_to_indices, subset_columns};

/// Encodes the category memberships of all documents.
///
/// The category ids are the union of all values, sorted; column `j` of
/// the matrix belongs to `category_ids[j]`. Documents without any
/// value get an all-false row.
pub fn encode<S>(values: &[Option<S>]) -> (Array2<bool>, Vec<String>)
where
    for<'a> &'a S: IntoIterator<Item = &'a String>,
{
    let category_ids: Vec<String> = values
        .iter()
        .flatten()
        .flat_map(|set| set.into_iter())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .cloned()
        .collect();

    let mut arr = Array2::from_elem((values.len(), category_ids.len()), false);
    for (row, value) in values.iter().enumerate() {
        let Some(set) = value else {
            continue;
        };

        for id in set.into_iter() {
            if let Ok(col) = category_ids.binary_search(id) {
                arr[[row, col]] = true;
            }
        }
    }

    (arr, category_ids)
}

/// Encodes the values of one target field and resolves the labels of
/// its categories.
pub fn target_data_from_values(
    values: &[Option<BTreeSet<String>>],
    resolver: &dyn LabelResolver,
    held_out: Option<Array1<bool>>,
) -> DataprepResult<TargetData> {
    let (membership, category_ids) = encode(values);
    let category_labels = resolver.resolve(&category_ids);

    TargetData::new(membership, category_ids, category_labels, held_out)
}

/// Drops every category with a support of at most `min_count`
/// documents. Documents are kept, even if they end up without any
/// category.
pub fn min_support_filter(
    target: &TargetData,
    min_count: usize,
) -> DataprepResult<TargetData> {
    let keep = target.support().mapv(|support| support > min_count);
    let indices = mask_to_indices(&keep);

    log::debug!(
        "keeping {} of {} categories with support > {min_count}",
        indices.len(),
        target.num_categories()
    );

    subset_columns(target, &indices)
}
