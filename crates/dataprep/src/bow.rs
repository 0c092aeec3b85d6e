//! Bag-of-words features of processed texts.

use std::collections::{BTreeMap, BTreeSet};

use hashbrown::HashMap;
use ndarray::{Array2, Axis};
use rayon::prelude::*;

use crate::error::DataprepResult;
use crate::record::{BowDataset, ProcessedDataset};

/// Returns the sorted union of all tokens.
pub fn vocabulary(docs: &[Vec<String>]) -> Vec<String> {
    docs.iter()
        .flatten()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .cloned()
        .collect()
}

/// Counts the occurrences of every word of `vocab` in every document.
/// Counts above 255 are clamped.
pub fn word_counts(docs: &[Vec<String>], vocab: &[String]) -> Array2<u8> {
    let word_to_id: HashMap<&str, usize> = vocab
        .iter()
        .enumerate()
        .map(|(idx, word)| (word.as_str(), idx))
        .collect();

    let mut arr = Array2::<u8>::zeros((docs.len(), vocab.len()));
    arr.axis_iter_mut(Axis(0))
        .into_par_iter()
        .zip(docs.par_iter())
        .for_each(|(mut row, doc)| {
            for token in doc.iter() {
                if let Some(&col) = word_to_id.get(token.as_str()) {
                    row[col] = row[col].saturating_add(1);
                }
            }
        });

    arr
}

impl BowDataset {
    /// Computes the bag-of-words features of all processed texts. The
    /// vocabulary consists of all tokens, sorted.
    pub fn from_processed(data: ProcessedDataset) -> DataprepResult<Self> {
        let vocab = vocabulary(data.processed_texts());
        let features = word_counts(data.processed_texts(), &vocab);
        let id_to_word: BTreeMap<usize, String> =
            vocab.into_iter().enumerate().collect();

        log::debug!(
            "bag-of-words: {} documents, {} words",
            features.nrows(),
            features.ncols()
        );

        BowDataset::new(data, features, id_to_word)
    }
}
