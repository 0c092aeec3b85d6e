//! Consistent subsetting of composite records.
//!
//! All operations are driven by [Record::SCHEMA]: document-indexed
//! fields (`Flat`, `Matrix`, `Nested`) are subset along the document
//! axis, category-axis fields together with the columns of the
//! co-located matrices along the category (or word) axis. A new record
//! is returned; the input is never modified.

use std::collections::{BTreeMap, BTreeSet};

use ndarray::Axis;

use crate::error::{DataprepError, DataprepResult};
use crate::record::{
    BowDataset, FieldKind, FieldMap, FieldRef, FieldSpec, FieldValue,
    Record,
};

/// Checks that every index is in range for an axis of length `len`.
/// If `unique` is set, duplicate indices are rejected as well.
pub fn check_indices(
    indices: &[usize],
    len: usize,
    unique: bool,
) -> DataprepResult<()> {
    let mut seen = BTreeSet::new();
    for &index in indices {
        if index >= len {
            return Err(DataprepError::InvalidIndex { index, len });
        }

        if unique && !seen.insert(index) {
            return Err(DataprepError::DuplicateIndex(index));
        }
    }

    Ok(())
}

/// Returns `values[i]` for every `i` in `indices`, in order.
#[inline]
pub fn take<T: Clone>(values: &[T], indices: &[usize]) -> Vec<T> {
    indices.iter().map(|&i| values[i].clone()).collect()
}

/// Re-keys a position-keyed map after a column selection: the entry at
/// the old position `indices[k]` ends up at the new position `k`.
pub fn reindex<T: Clone>(
    map: &BTreeMap<usize, T>,
    indices: &[usize],
) -> DataprepResult<BTreeMap<usize, T>> {
    check_indices(indices, usize::MAX, true)?;

    indices
        .iter()
        .enumerate()
        .map(|(new, old)| match map.get(old) {
            Some(value) => Ok((new, value.clone())),
            None => Err(DataprepError::InvalidIndex {
                index: *old,
                len: map.len(),
            }),
        })
        .collect()
}

fn missing(spec: &FieldSpec) -> DataprepError {
    DataprepError::Schema(format!("record has no field `{}`", spec.name))
}

fn unexpected(spec: &FieldSpec, field: &FieldRef<'_>) -> DataprepError {
    DataprepError::Schema(format!(
        "field `{}` can't be subset as {:?} ({})",
        spec.name,
        spec.kind,
        field.to_value().shape()
    ))
}

/// Selects entries along the first axis of a field.
fn select_rows(
    spec: &FieldSpec,
    field: &FieldRef<'_>,
    indices: &[usize],
) -> DataprepResult<FieldValue> {
    Ok(match *field {
        FieldRef::Strings(v) => FieldValue::Strings(take(v, indices)),
        FieldRef::Labels(v) => FieldValue::Labels(take(v, indices)),
        FieldRef::Tokens(v) => FieldValue::Tokens(take(v, indices)),
        FieldRef::Flags(v) => FieldValue::Flags(v.select(Axis(0), indices)),
        FieldRef::Membership(arr) => {
            FieldValue::Membership(arr.select(Axis(0), indices))
        }
        FieldRef::Counts(arr) => {
            FieldValue::Counts(arr.select(Axis(0), indices))
        }
        FieldRef::Words(words) => {
            FieldValue::Words(reindex(words, indices)?)
        }
        FieldRef::Targets(_) => return Err(unexpected(spec, field)),
    })
}

/// Selects the columns of a matrix field.
fn select_columns(
    spec: &FieldSpec,
    field: &FieldRef<'_>,
    indices: &[usize],
) -> DataprepResult<FieldValue> {
    Ok(match *field {
        FieldRef::Membership(arr) => {
            FieldValue::Membership(arr.select(Axis(1), indices))
        }
        FieldRef::Counts(arr) => {
            FieldValue::Counts(arr.select(Axis(1), indices))
        }
        _ => return Err(unexpected(spec, field)),
    })
}

/// Returns a copy of `record` that contains the documents at
/// `indices`, in the given order.
///
/// Every flat and matrix field is subset by rows and every nested
/// record is subset by the same indices; category-axis fields are
/// copied. Duplicate indices replicate documents.
pub fn subset_by_document<R: Record>(
    record: &R,
    indices: &[usize],
) -> DataprepResult<R> {
    check_indices(indices, record.num_documents(), false)?;

    let mut fields = FieldMap::new();
    for spec in R::SCHEMA {
        let Some(field) = record.field(spec.name) else {
            if spec.optional {
                continue;
            }

            return Err(missing(spec));
        };

        let value = match spec.kind {
            FieldKind::Flat | FieldKind::Matrix => {
                select_rows(spec, &field, indices)?
            }
            FieldKind::CategoryAxis => field.to_value(),
            FieldKind::Nested => match field {
                FieldRef::Targets(targets) => FieldValue::Targets(
                    targets
                        .iter()
                        .map(|(name, target)| {
                            Ok((
                                name.clone(),
                                subset_by_document(target, indices)?,
                            ))
                        })
                        .collect::<DataprepResult<_>>()?,
                ),
                _ => return Err(unexpected(spec, &field)),
            },
        };

        fields.insert(spec.name, value);
    }

    R::from_fields(fields)
}

/// Returns a copy of `record` that keeps the categories (or words) at
/// `indices`, in the given order.
///
/// The columns of every matrix field and every category-axis field are
/// selected; position-keyed maps are re-indexed. Document-indexed and
/// nested fields are copied unchanged.
pub fn subset_columns<R: Record>(
    record: &R,
    indices: &[usize],
) -> DataprepResult<R> {
    let mut fields = FieldMap::new();
    for spec in R::SCHEMA {
        let Some(field) = record.field(spec.name) else {
            if spec.optional {
                continue;
            }

            return Err(missing(spec));
        };

        let value = match spec.kind {
            FieldKind::Matrix => {
                let ncols = field.ncols().ok_or_else(|| {
                    unexpected(spec, &field)
                })?;
                check_indices(indices, ncols, true)?;
                select_columns(spec, &field, indices)?
            }
            FieldKind::CategoryAxis => {
                check_indices(indices, field.len(), true)?;
                select_rows(spec, &field, indices)?
            }
            FieldKind::Flat | FieldKind::Nested => field.to_value(),
        };

        fields.insert(spec.name, value);
    }

    R::from_fields(fields)
}

/// Returns a copy of `record` in which the nested target `name` keeps
/// only the categories at `indices`. Every other field (and every other
/// target) is left untouched.
pub fn subset_by_category<R: Record>(
    record: &R,
    indices: &[usize],
    name: &str,
) -> DataprepResult<R> {
    let mut fields = FieldMap::new();
    let mut found = false;

    for spec in R::SCHEMA {
        let Some(field) = record.field(spec.name) else {
            if spec.optional {
                continue;
            }

            return Err(missing(spec));
        };

        let value = match (spec.kind, field) {
            (FieldKind::Nested, FieldRef::Targets(targets))
                if targets.contains_key(name) =>
            {
                found = true;
                let mut targets = targets.clone();
                if let Some(target) = targets.get_mut(name) {
                    *target = subset_columns(target, indices)?;
                }

                FieldValue::Targets(targets)
            }
            (_, field) => field.to_value(),
        };

        fields.insert(spec.name, value);
    }

    if !found {
        return Err(DataprepError::UnknownTarget(name.into()));
    }

    R::from_fields(fields)
}

/// Returns a copy of `data` that keeps only the words at `indices`;
/// word `indices[k]` becomes word `k`.
#[inline]
pub fn subset_by_word(
    data: &BowDataset,
    indices: &[usize],
) -> DataprepResult<BowDataset> {
    subset_columns(data, indices)
}

/// Returns the positions of all `true` entries of a mask.
pub fn mask_to_indices<'a, I>(mask: I) -> Vec<usize>
where
    I: IntoIterator<Item = &'a bool>,
{
    mask.into_iter()
        .enumerate()
        .filter_map(|(idx, &keep)| keep.then_some(idx))
        .collect()
}

#[cfg(test)]
mod tests {
    use ndarray::array;

    use super::*;
    use crate::record::{Dataset, ProcessedDataset, TargetData};

    type TestResult = anyhow::Result<()>;

    fn dataset() -> DataprepResult<Dataset> {
        let discipline = TargetData::new(
            array![[true, true], [true, false], [false, false]],
            vec!["a".into(), "b".into()],
            vec![Some("A".into()), Some("B".into())],
            Some(array![false, true, false]),
        )?;

        let context = TargetData::new(
            array![[false], [true], [true]],
            vec!["x".into()],
            vec![None],
            None,
        )?;

        Dataset::new(
            vec!["t0".into(), "t1".into(), "t2".into()],
            vec!["0".into(), "1".into(), "2".into()],
            array![true, false, false],
            BTreeMap::from([
                ("discipline".to_string(), discipline),
                ("context".to_string(), context),
            ]),
        )
    }

    fn bow() -> DataprepResult<BowDataset> {
        let data = dataset()?;
        let processed = ProcessedDataset::new(
            data,
            vec![
                vec!["cat".into()],
                vec!["dog".into(), "fish".into()],
                vec!["fish".into()],
            ],
        )?;

        BowDataset::new(
            processed,
            array![[1u8, 0, 0], [0, 1, 1], [0, 0, 1]],
            BTreeMap::from([
                (0, "cat".to_string()),
                (1, "dog".to_string()),
                (2, "fish".to_string()),
            ]),
        )
    }

    #[test]
    fn check_indices_errors() {
        assert!(check_indices(&[0, 1, 1], 2, false).is_ok());
        assert!(matches!(
            check_indices(&[0, 2], 2, false),
            Err(DataprepError::InvalidIndex { index: 2, len: 2 })
        ));
        assert!(matches!(
            check_indices(&[1, 1], 2, true),
            Err(DataprepError::DuplicateIndex(1))
        ));
    }

    #[test]
    fn reindex_map() -> TestResult {
        let map = BTreeMap::from([(0, "cat"), (1, "dog"), (2, "fish")]);
        assert_eq!(
            reindex(&map, &[2, 0])?,
            BTreeMap::from([(0, "fish"), (1, "cat")])
        );
        assert!(reindex(&map, &[3]).is_err());
        assert!(reindex(&map, &[0, 0]).is_err());
        Ok(())
    }

    #[test]
    fn subset_by_document_filters_and_reorders() -> TestResult {
        let data = dataset()?;
        let subset = subset_by_document(&data, &[2, 0])?;

        assert_eq!(subset.raw_texts(), ["t2".to_string(), "t0".to_string()]);
        assert_eq!(subset.ids(), ["2".to_string(), "0".to_string()]);
        assert_eq!(subset.redaction(), &array![false, true]);

        let discipline = &subset.targets()["discipline"];
        assert_eq!(discipline.membership(), &array![[false, false], [true, true]]);
        assert_eq!(discipline.held_out(), Some(&array![false, false]));
        assert_eq!(discipline.category_ids(), data.targets()["discipline"].category_ids());

        let context = &subset.targets()["context"];
        assert_eq!(context.membership(), &array![[true], [false]]);
        assert_eq!(context.held_out(), None);
        Ok(())
    }

    #[test]
    fn subset_by_document_duplicates() -> TestResult {
        let subset = subset_by_document(&dataset()?, &[1, 1, 1])?;
        assert_eq!(subset.len(), 3);
        assert!(subset.ids().iter().all(|id| id == "1"));
        assert_eq!(subset.targets()["context"].num_documents(), 3);
        Ok(())
    }

    #[test]
    fn subset_by_document_empty() -> TestResult {
        let subset = subset_by_document(&dataset()?, &[])?;
        assert!(subset.is_empty());
        assert_eq!(subset.targets()["discipline"].membership().dim(), (0, 2));
        Ok(())
    }

    #[test]
    fn subset_by_document_out_of_range() -> TestResult {
        assert!(matches!(
            subset_by_document(&dataset()?, &[3]),
            Err(DataprepError::InvalidIndex { index: 3, len: 3 })
        ));
        Ok(())
    }

    #[test]
    fn subset_by_category_touches_one_target() -> TestResult {
        let data = dataset()?;
        let subset = subset_by_category(&data, &[1], "discipline")?;

        let discipline = &subset.targets()["discipline"];
        assert_eq!(discipline.category_ids(), ["b".to_string()]);
        assert_eq!(discipline.category_labels(), [Some("B".to_string())]);
        assert_eq!(discipline.membership(), &array![[true], [false], [false]]);
        assert_eq!(
            discipline.held_out(),
            data.targets()["discipline"].held_out()
        );

        assert_eq!(subset.targets()["context"], data.targets()["context"]);
        assert_eq!(subset.raw_texts(), data.raw_texts());
        Ok(())
    }

    #[test]
    fn subset_by_category_errors() -> TestResult {
        let data = dataset()?;
        assert!(matches!(
            subset_by_category(&data, &[0], "language"),
            Err(DataprepError::UnknownTarget(_))
        ));
        assert!(matches!(
            subset_by_category(&data, &[0, 0], "discipline"),
            Err(DataprepError::DuplicateIndex(0))
        ));
        assert!(matches!(
            subset_by_category(&data, &[2], "discipline"),
            Err(DataprepError::InvalidIndex { .. })
        ));
        Ok(())
    }

    #[test]
    fn subset_by_word_reindexes() -> TestResult {
        let bow = bow()?;
        let subset = subset_by_word(&bow, &[2, 0])?;

        assert_eq!(
            subset.id_to_word(),
            &BTreeMap::from([(0, "fish".to_string()), (1, "cat".to_string())])
        );
        assert_eq!(subset.features(), &array![[0u8, 1], [1, 0], [1, 0]]);
        assert_eq!(subset.processed_texts(), bow.processed_texts());
        assert_eq!(subset.targets(), bow.targets());
        Ok(())
    }

    #[test]
    fn subset_by_document_on_bow() -> TestResult {
        let bow = bow()?;
        let subset = subset_by_document(&bow, &[1])?;

        assert_eq!(subset.features(), &array![[0u8, 1, 1]]);
        assert_eq!(subset.id_to_word(), bow.id_to_word());
        assert_eq!(
            subset.processed_texts(),
            [vec!["dog".to_string(), "fish".to_string()]]
        );
        Ok(())
    }

    #[test]
    fn mask_to_indices_positions() {
        assert_eq!(mask_to_indices(&[true, false, true]), vec![0, 2]);
        assert_eq!(mask_to_indices(&array![false, false]), Vec::<usize>::new());
    }
}
