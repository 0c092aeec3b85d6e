//! Assembly of the classification dataset from an export.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use ndarray::Array1;
use serde::{Deserialize, Serialize};

use crate::defaults::{self, Fields};
use crate::encode::{min_support_filter, target_data_from_values};
use crate::error::{DataprepError, DataprepResult};
use crate::filters::{BasicFilter, Filter, PubliclyVisible};
use crate::labels::{LabelResolver, SkosVocabulary, UriLookup};
use crate::loader::{read_rows, LoaderOptions, Row};
use crate::normalize::ValueRules;
use crate::record::{Dataset, TargetData};
use crate::subset::{mask_to_indices, subset_by_document};

const TITLE: &str = "title";
const DESCRIPTION: &str = "description";
const ID: &str = "id";
const COLLECTIONS: &str = "collections";
const LANGUAGE: &str = "language";
const TEST_DATA: &str = "test_data";

/// Which documents are kept with respect to their target values.
#[derive(
    Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum KeepDocuments {
    /// Keep documents with a value for at least one target.
    #[default]
    AnyTarget,
    /// Keep documents with a value for every target.
    AllTargets,
}

pub struct PipelineOptions {
    /// The (dotted) paths of the target fields.
    pub target_fields: Vec<String>,

    /// Per-field value rules. The rules of the language field are
    /// applied to the language column as well.
    pub rules: BTreeMap<String, ValueRules>,

    /// SKOS vocabularies per target field. Labels of targets without a
    /// vocabulary are looked up URI by URI.
    pub skos_urls: BTreeMap<String, String>,

    /// Additional record filters.
    pub filters: Vec<Box<dyn Filter>>,

    /// Merge in the default rules, vocabularies and filters.
    pub use_defaults: bool,

    /// Documents with a language outside of this set are dropped.
    pub allowed_languages: Option<BTreeSet<String>>,

    pub keep: KeepDocuments,

    /// Categories with a support of at most this many documents are
    /// dropped.
    pub min_category_support: Option<usize>,

    pub prefix: Option<String>,
    pub max_len: Option<usize>,
    pub quiet: bool,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            target_fields: vec![],
            rules: BTreeMap::new(),
            skos_urls: BTreeMap::new(),
            filters: vec![],
            use_defaults: true,
            allowed_languages: None,
            keep: KeepDocuments::default(),
            min_category_support: None,
            prefix: Some(defaults::PREFIX.into()),
            max_len: None,
            quiet: true,
        }
    }
}

impl PipelineOptions {
    /// Returns the effective value rules; explicit rules take
    /// precedence over the defaults.
    pub fn effective_rules(&self) -> BTreeMap<String, ValueRules> {
        let mut rules = if self.use_defaults {
            defaults::value_rules()
        } else {
            BTreeMap::new()
        };

        for (field, other) in self.rules.iter() {
            rules.entry(field.clone()).or_default().merge(other);
        }

        rules
    }

    pub fn effective_skos_urls(&self) -> BTreeMap<String, String> {
        let mut urls = if self.use_defaults {
            defaults::skos_urls()
        } else {
            BTreeMap::new()
        };

        urls.extend(
            self.skos_urls.iter().map(|(k, v)| (k.clone(), v.clone())),
        );
        urls
    }

    fn columns(&self) -> BTreeMap<String, String> {
        let mut columns = BTreeMap::from([
            (TITLE.to_string(), Fields::Title.path().to_string()),
            (DESCRIPTION.into(), Fields::Description.path().into()),
            (ID.into(), Fields::Id.path().into()),
            (COLLECTIONS.into(), Fields::CollectionsTitle.path().into()),
            (LANGUAGE.into(), Fields::Language.path().into()),
            (TEST_DATA.into(), Fields::TestData.path().into()),
        ]);

        for field in self.target_fields.iter() {
            columns.insert(field.clone(), field.clone());
        }

        columns
    }
}

fn is_empty_text(row: &Row, column: &str) -> bool {
    row.text(column).map(|s| s.is_empty()).unwrap_or(true)
}

fn column_set(rows: &[Row], column: &str) -> Vec<Option<BTreeSet<String>>> {
    rows.iter()
        .map(|row| {
            let values = row.strings(column);
            (!values.is_empty()).then(|| values.into_iter().collect())
        })
        .collect()
}

/// Builds the dataset of the export at `path`.
///
/// Documents without title or description are dropped, as well as
/// documents with a language outside of the allowed languages.
/// Afterwards every target field is encoded and labelled; documents
/// without target values (see [KeepDocuments]) are dropped.
///
/// SKOS vocabularies are fetched from the source of `lookup`; labels of
/// targets without a vocabulary are looked up URI by URI and memoized
/// in `lookup`, which can be shared across calls.
pub fn generate_data<P: AsRef<Path>>(
    path: P,
    mut options: PipelineOptions,
    lookup: &UriLookup<'_>,
) -> DataprepResult<Dataset> {
    let source = lookup.source();
    let skos_urls = options.effective_skos_urls();

    let mut filters: Vec<Box<dyn Filter>> = vec![];
    if options.use_defaults {
        filters.push(Box::new(BasicFilter));
        filters.push(Box::new(PubliclyVisible));
    }
    filters.append(&mut options.filters);

    let loader = LoaderOptions {
        prefix: options.prefix.clone(),
        filters,
        rules: options.effective_rules(),
        max_len: options.max_len,
        quiet: options.quiet,
    };

    let rows = read_rows(path, &options.columns(), &loader)?;

    let mut rows: Vec<Row> = rows
        .into_iter()
        .filter(|row| {
            !is_empty_text(row, TITLE) && !is_empty_text(row, DESCRIPTION)
        })
        .collect();

    if let Some(ref allowed) = options.allowed_languages {
        rows.retain(|row| {
            row.strings(LANGUAGE)
                .iter()
                .all(|language| allowed.contains(language))
        });
    }

    log::info!("{} documents with title and description", rows.len());

    let held_out: Array1<bool> =
        rows.iter()
            .map(|row| row.get(TEST_DATA).is_some_and(|t| t.is_true()))
            .collect();

    let mut targets = BTreeMap::new();
    for field in options.target_fields.iter() {
        let vocabulary = match skos_urls.get(field) {
            Some(url) => Some(SkosVocabulary::fetch(source, url)?),
            None => None,
        };
        let resolver: &dyn LabelResolver = match vocabulary {
            Some(ref vocabulary) => vocabulary,
            None => lookup,
        };

        let mut target = target_data_from_values(
            &column_set(&rows, field),
            resolver,
            Some(held_out.clone()),
        )?;

        if let Some(min_count) = options.min_category_support {
            target = min_support_filter(&target, min_count)?;
        }

        log::info!(
            "target `{field}`: {} categories",
            target.num_categories()
        );
        targets.insert(field.clone(), target);
    }

    let keep = documents_to_keep(&targets, rows.len(), options.keep);
    let kept = mask_to_indices(&keep);

    let targets = targets
        .into_iter()
        .map(|(field, target)| {
            Ok((field, subset_by_document(&target, &kept)?))
        })
        .collect::<DataprepResult<BTreeMap<_, _>>>()?;

    let mut raw_texts = Vec::with_capacity(kept.len());
    let mut ids = Vec::with_capacity(kept.len());
    let mut redaction = Vec::with_capacity(kept.len());

    for row in kept.iter().map(|&idx| &rows[idx]) {
        let title = row.text(TITLE).unwrap_or_default();
        let description = row.text(DESCRIPTION).unwrap_or_default();
        raw_texts.push(format!("{title}\n{description}"));

        ids.push(row.text(ID).ok_or_else(|| DataprepError::MissingField {
            field: Fields::Id.path().into(),
            line: row.line(),
        })?);

        redaction.push(
            row.strings(COLLECTIONS)
                .iter()
                .any(|c| c == defaults::REDACTION_COLLECTION),
        );
    }

    let data = Dataset::new(
        raw_texts,
        ids,
        Array1::from_vec(redaction),
        targets,
    )?;

    log::info!("{} documents with target values", data.len());
    Ok(data)
}

/// Combines the per-target "has any category" masks. Without targets,
/// every document is kept.
fn documents_to_keep(
    targets: &BTreeMap<String, TargetData>,
    len: usize,
    keep: KeepDocuments,
) -> Array1<bool> {
    let mut masks = targets.values().map(TargetData::has_any);
    let Some(first) = masks.next() else {
        return Array1::from_elem(len, true);
    };

    masks.fold(first, |acc, mask| match keep {
        KeepDocuments::AnyTarget => &acc | &mask,
        KeepDocuments::AllTargets => &acc & &mask,
    })
}
