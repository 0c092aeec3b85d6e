//! Composite dataset records and their field schemas.
//!
//! Every record type declares its fields together with their
//! [FieldKind] in [Record::SCHEMA]. The subsetting engine
//! ([crate::subset]) reads fields through borrowed [FieldRef] views and
//! rebuilds records with [Record::from_fields], which checks every
//! alignment invariant before a value is handed out.

use std::collections::BTreeMap;
use std::ops::Deref;

use ndarray::{Array1, Array2, Axis};

use crate::error::{DataprepError, DataprepResult};

/// How a field relates to the axes of a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// One entry per document.
    Flat,
    /// A 2-D array with the document axis first and the category (or
    /// word) axis second.
    Matrix,
    /// One entry per category (or word); aligned with the second axis
    /// of the matrices of the same record.
    CategoryAxis,
    /// Sub-records that are indexed by the same documents.
    Nested,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
    pub optional: bool,
}

impl FieldSpec {
    pub const fn required(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            kind,
            optional: false,
        }
    }

    pub const fn optional(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            kind,
            optional: true,
        }
    }
}

/// An owned field value. The set of shapes is closed.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Strings(Vec<String>),
    Labels(Vec<Option<String>>),
    Flags(Array1<bool>),
    Tokens(Vec<Vec<String>>),
    Membership(Array2<bool>),
    Counts(Array2<u8>),
    Words(BTreeMap<usize, String>),
    Targets(BTreeMap<String, TargetData>),
}

impl FieldValue {
    /// Returns the name of the shape of the value.
    pub fn shape(&self) -> &'static str {
        match self {
            Self::Strings(_) => "strings",
            Self::Labels(_) => "labels",
            Self::Flags(_) => "flags",
            Self::Tokens(_) => "tokens",
            Self::Membership(_) => "membership",
            Self::Counts(_) => "counts",
            Self::Words(_) => "words",
            Self::Targets(_) => "targets",
        }
    }
}

/// A borrowed view on a field of a record.
#[derive(Debug, Clone, Copy)]
pub enum FieldRef<'a> {
    Strings(&'a [String]),
    Labels(&'a [Option<String>]),
    Flags(&'a Array1<bool>),
    Tokens(&'a [Vec<String>]),
    Membership(&'a Array2<bool>),
    Counts(&'a Array2<u8>),
    Words(&'a BTreeMap<usize, String>),
    Targets(&'a BTreeMap<String, TargetData>),
}

impl FieldRef<'_> {
    /// Returns the length of the first axis.
    pub fn len(&self) -> usize {
        match self {
            Self::Strings(values) => values.len(),
            Self::Labels(values) => values.len(),
            Self::Flags(values) => values.len(),
            Self::Tokens(values) => values.len(),
            Self::Membership(arr) => arr.nrows(),
            Self::Counts(arr) => arr.nrows(),
            Self::Words(words) => words.len(),
            Self::Targets(targets) => targets.len(),
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the length of the second axis of a matrix field.
    pub fn ncols(&self) -> Option<usize> {
        match self {
            Self::Membership(arr) => Some(arr.ncols()),
            Self::Counts(arr) => Some(arr.ncols()),
            _ => None,
        }
    }

    pub fn to_value(&self) -> FieldValue {
        match *self {
            Self::Strings(values) => FieldValue::Strings(values.to_vec()),
            Self::Labels(values) => FieldValue::Labels(values.to_vec()),
            Self::Flags(values) => FieldValue::Flags(values.clone()),
            Self::Tokens(values) => FieldValue::Tokens(values.to_vec()),
            Self::Membership(arr) => FieldValue::Membership(arr.clone()),
            Self::Counts(arr) => FieldValue::Counts(arr.clone()),
            Self::Words(words) => FieldValue::Words(words.clone()),
            Self::Targets(targets) => FieldValue::Targets(targets.clone()),
        }
    }
}

/// The field set handed to [Record::from_fields].
#[derive(Debug, Default, Clone)]
pub struct FieldMap(BTreeMap<&'static str, FieldValue>);

macro_rules! take_field {
    ($fn:ident, $opt:ident, $variant:ident, $ty:ty) => {
        pub fn $fn(&mut self, name: &str) -> DataprepResult<$ty> {
            self.$opt(name)?.ok_or_else(|| {
                DataprepError::Schema(format!("missing field `{name}`"))
            })
        }

        pub fn $opt(&mut self, name: &str) -> DataprepResult<Option<$ty>> {
            match self.0.remove(name) {
                Some(FieldValue::$variant(value)) => Ok(Some(value)),
                Some(other) => Err(DataprepError::Schema(format!(
                    "field `{name}` has unexpected shape `{}`",
                    other.shape()
                ))),
                None => Ok(None),
            }
        }
    };
}

impl FieldMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: &'static str, value: FieldValue) {
        self.0.insert(name, value);
    }

    /// Builder-style [FieldMap::insert].
    pub fn with(mut self, name: &'static str, value: FieldValue) -> Self {
        self.insert(name, value);
        self
    }

    take_field!(take_strings, take_strings_opt, Strings, Vec<String>);
    take_field!(take_labels, take_labels_opt, Labels, Vec<Option<String>>);
    take_field!(take_flags, take_flags_opt, Flags, Array1<bool>);
    take_field!(take_tokens, take_tokens_opt, Tokens, Vec<Vec<String>>);
    take_field!(take_membership, take_membership_opt, Membership, Array2<bool>);
    take_field!(take_counts, take_counts_opt, Counts, Array2<u8>);
    take_field!(take_words, take_words_opt, Words, BTreeMap<usize, String>);
    take_field!(
        take_targets,
        take_targets_opt,
        Targets,
        BTreeMap<String, TargetData>
    );
}

/// A record whose fields can be subset consistently.
pub trait Record: Sized {
    /// The statically declared field layout of the record.
    const SCHEMA: &'static [FieldSpec];

    /// Returns a view on the field `name`, or `None` if the record has
    /// no such field (or an optional field is absent).
    fn field(&self, name: &str) -> Option<FieldRef<'_>>;

    /// Reconstructs a record from a complete field set. Fails if a
    /// field is missing or any alignment invariant is violated.
    fn from_fields(fields: FieldMap) -> DataprepResult<Self>;

    /// The number of documents (length of the document axis).
    fn num_documents(&self) -> usize;
}

/// Membership data of one classification target.
#[derive(Debug, Clone, PartialEq)]
pub struct TargetData {
    membership: Array2<bool>,
    held_out: Option<Array1<bool>>,
    category_ids: Vec<String>,
    category_labels: Vec<Option<String>>,
}

impl TargetData {
    pub fn new(
        membership: Array2<bool>,
        category_ids: Vec<String>,
        category_labels: Vec<Option<String>>,
        held_out: Option<Array1<bool>>,
    ) -> DataprepResult<Self> {
        if category_ids.len() != category_labels.len()
            || category_ids.len() != membership.ncols()
        {
            return Err(DataprepError::misaligned(format!(
                "{} category ids, {} labels, {} matrix columns",
                category_ids.len(),
                category_labels.len(),
                membership.ncols()
            )));
        }

        if let Some(ref held_out) = held_out {
            if held_out.len() != membership.nrows() {
                return Err(DataprepError::misaligned(format!(
                    "held-out mask of length {} for {} documents",
                    held_out.len(),
                    membership.nrows()
                )));
            }
        }

        Ok(Self {
            membership,
            held_out,
            category_ids,
            category_labels,
        })
    }

    #[inline]
    pub fn membership(&self) -> &Array2<bool> {
        &self.membership
    }

    #[inline]
    pub fn held_out(&self) -> Option<&Array1<bool>> {
        self.held_out.as_ref()
    }

    #[inline]
    pub fn category_ids(&self) -> &[String] {
        &self.category_ids
    }

    #[inline]
    pub fn category_labels(&self) -> &[Option<String>] {
        &self.category_labels
    }

    #[inline]
    pub fn num_categories(&self) -> usize {
        self.category_ids.len()
    }

    /// Returns the number of documents per category.
    pub fn support(&self) -> Array1<usize> {
        self.membership
            .map(|&b| b as usize)
            .sum_axis(Axis(0))
    }

    /// Returns for every document whether it belongs to any category.
    pub fn has_any(&self) -> Array1<bool> {
        self.membership
            .map_axis(Axis(1), |row| row.iter().any(|&b| b))
    }

    /// Returns the ids of the categories of the document `idx`.
    pub fn categories_of(&self, idx: usize) -> Vec<&str> {
        self.membership
            .row(idx)
            .iter()
            .zip(self.category_ids.iter())
            .filter_map(|(&b, id)| b.then_some(id.as_str()))
            .collect()
    }
}

impl Record for TargetData {
    const SCHEMA: &'static [FieldSpec] = &[
        FieldSpec::required("membership", FieldKind::Matrix),
        FieldSpec::optional("held_out", FieldKind::Flat),
        FieldSpec::required("category_ids", FieldKind::CategoryAxis),
        FieldSpec::required("category_labels", FieldKind::CategoryAxis),
    ];

    fn field(&self, name: &str) -> Option<FieldRef<'_>> {
        match name {
            "membership" => Some(FieldRef::Membership(&self.membership)),
            "held_out" => self.held_out.as_ref().map(FieldRef::Flags),
            "category_ids" => Some(FieldRef::Strings(&self.category_ids)),
            "category_labels" => {
                Some(FieldRef::Labels(&self.category_labels))
            }
            _ => None,
        }
    }

    fn from_fields(mut fields: FieldMap) -> DataprepResult<Self> {
        Self::new(
            fields.take_membership("membership")?,
            fields.take_strings("category_ids")?,
            fields.take_labels("category_labels")?,
            fields.take_flags_opt("held_out")?,
        )
    }

    #[inline]
    fn num_documents(&self) -> usize {
        self.membership.nrows()
    }
}

/// The composite dataset: raw texts, ids and redaction flags of all
/// documents together with the membership data of every target.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    raw_texts: Vec<String>,
    ids: Vec<String>,
    redaction: Array1<bool>,
    targets: BTreeMap<String, TargetData>,
}

impl Dataset {
    pub fn new(
        raw_texts: Vec<String>,
        ids: Vec<String>,
        redaction: Array1<bool>,
        targets: BTreeMap<String, TargetData>,
    ) -> DataprepResult<Self> {
        let n = raw_texts.len();
        if ids.len() != n || redaction.len() != n {
            return Err(DataprepError::misaligned(format!(
                "{n} texts, {} ids, {} redaction flags",
                ids.len(),
                redaction.len()
            )));
        }

        for (name, target) in targets.iter() {
            if target.num_documents() != n {
                return Err(DataprepError::misaligned(format!(
                    "target `{name}` has {} documents, expected {n}",
                    target.num_documents()
                )));
            }
        }

        Ok(Self {
            raw_texts,
            ids,
            redaction,
            targets,
        })
    }

    #[inline]
    pub fn raw_texts(&self) -> &[String] {
        &self.raw_texts
    }

    #[inline]
    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    #[inline]
    pub fn redaction(&self) -> &Array1<bool> {
        &self.redaction
    }

    #[inline]
    pub fn targets(&self) -> &BTreeMap<String, TargetData> {
        &self.targets
    }

    #[inline]
    pub fn target(&self, name: &str) -> Option<&TargetData> {
        self.targets.get(name)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.raw_texts.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.raw_texts.is_empty()
    }
}

impl Record for Dataset {
    const SCHEMA: &'static [FieldSpec] = &[
        FieldSpec::required("raw_texts", FieldKind::Flat),
        FieldSpec::required("ids", FieldKind::Flat),
        FieldSpec::required("redaction", FieldKind::Flat),
        FieldSpec::required("targets", FieldKind::Nested),
    ];

    fn field(&self, name: &str) -> Option<FieldRef<'_>> {
        match name {
            "raw_texts" => Some(FieldRef::Strings(&self.raw_texts)),
            "ids" => Some(FieldRef::Strings(&self.ids)),
            "redaction" => Some(FieldRef::Flags(&self.redaction)),
            "targets" => Some(FieldRef::Targets(&self.targets)),
            _ => None,
        }
    }

    fn from_fields(mut fields: FieldMap) -> DataprepResult<Self> {
        Self::new(
            fields.take_strings("raw_texts")?,
            fields.take_strings("ids")?,
            fields.take_flags("redaction")?,
            fields.take_targets("targets")?,
        )
    }

    #[inline]
    fn num_documents(&self) -> usize {
        self.len()
    }
}

/// A [Dataset] together with the tokens of every document.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessedDataset {
    data: Dataset,
    processed_texts: Vec<Vec<String>>,
}

impl Deref for ProcessedDataset {
    type Target = Dataset;

    fn deref(&self) -> &Self::Target {
        &self.data
    }
}

impl ProcessedDataset {
    pub fn new(
        data: Dataset,
        processed_texts: Vec<Vec<String>>,
    ) -> DataprepResult<Self> {
        if processed_texts.len() != data.len() {
            return Err(DataprepError::misaligned(format!(
                "{} processed texts for {} documents",
                processed_texts.len(),
                data.len()
            )));
        }

        Ok(Self {
            data,
            processed_texts,
        })
    }

    #[inline]
    pub fn processed_texts(&self) -> &[Vec<String>] {
        &self.processed_texts
    }

    #[inline]
    pub fn data(&self) -> &Dataset {
        &self.data
    }
}

impl Record for ProcessedDataset {
    const SCHEMA: &'static [FieldSpec] = &[
        FieldSpec::required("raw_texts", FieldKind::Flat),
        FieldSpec::required("ids", FieldKind::Flat),
        FieldSpec::required("redaction", FieldKind::Flat),
        FieldSpec::required("targets", FieldKind::Nested),
        FieldSpec::required("processed_texts", FieldKind::Flat),
    ];

    fn field(&self, name: &str) -> Option<FieldRef<'_>> {
        match name {
            "processed_texts" => {
                Some(FieldRef::Tokens(&self.processed_texts))
            }
            name => self.data.field(name),
        }
    }

    fn from_fields(mut fields: FieldMap) -> DataprepResult<Self> {
        let processed_texts = fields.take_tokens("processed_texts")?;
        Self::new(Dataset::from_fields(fields)?, processed_texts)
    }

    #[inline]
    fn num_documents(&self) -> usize {
        self.data.len()
    }
}

/// A [ProcessedDataset] together with its bag-of-words representation.
///
/// `features[[i, k]]` is the (clamped) number of occurrences of the
/// word `id_to_word[k]` in document `i`.
#[derive(Debug, Clone, PartialEq)]
pub struct BowDataset {
    processed: ProcessedDataset,
    features: Array2<u8>,
    id_to_word: BTreeMap<usize, String>,
}

impl Deref for BowDataset {
    type Target = ProcessedDataset;

    fn deref(&self) -> &Self::Target {
        &self.processed
    }
}

impl BowDataset {
    pub fn new(
        processed: ProcessedDataset,
        features: Array2<u8>,
        id_to_word: BTreeMap<usize, String>,
    ) -> DataprepResult<Self> {
        if features.nrows() != processed.len() {
            return Err(DataprepError::misaligned(format!(
                "{} feature rows for {} documents",
                features.nrows(),
                processed.len()
            )));
        }

        let ncols = features.ncols();
        if id_to_word.len() != ncols
            || id_to_word.keys().any(|&k| k >= ncols)
        {
            return Err(DataprepError::misaligned(format!(
                "{} vocabulary entries for {ncols} feature columns",
                id_to_word.len(),
            )));
        }

        Ok(Self {
            processed,
            features,
            id_to_word,
        })
    }

    #[inline]
    pub fn features(&self) -> &Array2<u8> {
        &self.features
    }

    #[inline]
    pub fn id_to_word(&self) -> &BTreeMap<usize, String> {
        &self.id_to_word
    }

    #[inline]
    pub fn processed(&self) -> &ProcessedDataset {
        &self.processed
    }

    /// Returns the number of documents per word.
    pub fn document_frequencies(&self) -> Array1<usize> {
        self.features
            .map(|&count| (count > 0) as usize)
            .sum_axis(Axis(0))
    }
}

impl Record for BowDataset {
    const SCHEMA: &'static [FieldSpec] = &[
        FieldSpec::required("raw_texts", FieldKind::Flat),
        FieldSpec::required("ids", FieldKind::Flat),
        FieldSpec::required("redaction", FieldKind::Flat),
        FieldSpec::required("targets", FieldKind::Nested),
        FieldSpec::required("processed_texts", FieldKind::Flat),
        FieldSpec::required("features", FieldKind::Matrix),
        FieldSpec::required("id_to_word", FieldKind::CategoryAxis),
    ];

    fn field(&self, name: &str) -> Option<FieldRef<'_>> {
        match name {
            "features" => Some(FieldRef::Counts(&self.features)),
            "id_to_word" => Some(FieldRef::Words(&self.id_to_word)),
            name => self.processed.field(name),
        }
    }

    fn from_fields(mut fields: FieldMap) -> DataprepResult<Self> {
        let features = fields.take_counts("features")?;
        let id_to_word = fields.take_words("id_to_word")?;
        Self::new(
            ProcessedDataset::from_fields(fields)?,
            features,
            id_to_word,
        )
    }

    #[inline]
    fn num_documents(&self) -> usize {
        self.processed.len()
    }
}

#[cfg(test)]
mod tests {
    use ndarray::array;

    use super::*;

    type TestResult = anyhow::Result<()>;

    fn target() -> DataprepResult<TargetData> {
        TargetData::new(
            array![[true, true], [true, false], [false, false]],
            vec!["a".into(), "b".into()],
            vec![Some("A".into()), None],
            None,
        )
    }

    #[test]
    fn target_data_accessors() -> TestResult {
        let target = target()?;
        assert_eq!(target.support(), array![2, 1]);
        assert_eq!(target.has_any(), array![true, true, false]);
        assert_eq!(target.categories_of(0), vec!["a", "b"]);
        assert!(target.categories_of(2).is_empty());
        Ok(())
    }

    #[test]
    fn target_data_misaligned() {
        let result = TargetData::new(
            array![[true, true]],
            vec!["a".into(), "b".into()],
            vec![None],
            None,
        );
        assert!(matches!(result, Err(DataprepError::Misaligned(_))));

        let result = TargetData::new(
            array![[true]],
            vec!["a".into()],
            vec![None],
            Some(array![true, false]),
        );
        assert!(matches!(result, Err(DataprepError::Misaligned(_))));
    }

    #[test]
    fn dataset_checks_target_length() -> TestResult {
        let targets = BTreeMap::from([("t".to_string(), target()?)]);
        let result = Dataset::new(
            vec!["x".into(), "y".into()],
            vec!["1".into(), "2".into()],
            array![false, true],
            targets,
        );

        assert!(matches!(result, Err(DataprepError::Misaligned(_))));
        Ok(())
    }

    #[test]
    fn from_fields_round_trip() -> TestResult {
        let target = target()?;
        let fields = TargetData::SCHEMA
            .iter()
            .filter_map(|spec| {
                target.field(spec.name).map(|f| (spec.name, f.to_value()))
            })
            .fold(FieldMap::new(), |acc, (name, value)| {
                acc.with(name, value)
            });

        assert_eq!(TargetData::from_fields(fields)?, target);
        Ok(())
    }

    #[test]
    fn from_fields_wrong_shape() {
        let fields = FieldMap::new()
            .with("membership", FieldValue::Strings(vec![]))
            .with("category_ids", FieldValue::Strings(vec![]))
            .with("category_labels", FieldValue::Labels(vec![]));

        assert!(matches!(
            TargetData::from_fields(fields),
            Err(DataprepError::Schema(_))
        ));
    }

    #[test]
    fn bow_dataset_checks_vocabulary() -> TestResult {
        let data = Dataset::new(
            vec!["x".into()],
            vec!["1".into()],
            array![false],
            BTreeMap::new(),
        )?;
        let processed = ProcessedDataset::new(data, vec![vec!["x".into()]])?;

        let result = BowDataset::new(
            processed.clone(),
            array![[1u8, 0]],
            BTreeMap::from([(0, "x".to_string())]),
        );
        assert!(matches!(result, Err(DataprepError::Misaligned(_))));

        let bow = BowDataset::new(
            processed,
            array![[1u8, 0]],
            BTreeMap::from([(0, "x".to_string()), (1, "y".to_string())]),
        )?;
        assert_eq!(bow.document_frequencies(), array![1, 0]);
        assert_eq!(bow.ids(), ["1".to_string()]);
        Ok(())
    }
}
