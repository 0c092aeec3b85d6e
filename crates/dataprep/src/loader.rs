//! Reading of line-delimited JSON exports into rows.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use indicatif::ProgressIterator;
use serde_json::Value;

use crate::defaults;
use crate::error::{DataprepError, DataprepResult};
use crate::filters::{accepts_all, Filter};
use crate::nested::{get_in, get_terminal_in, parse_path, Query, Terminal};
use crate::normalize::{with_changed_value, ValueRules};
use crate::progress::ProgressBarBuilder;

const PBAR_READ: &str =
    "Reading records: {human_pos} ({percent}%) | \
        elapsed: {elapsed_precise}{msg}";

/// The terminal values of the selected columns of one record.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Row {
    line: usize,
    values: BTreeMap<String, Option<Terminal>>,
}

impl Row {
    pub fn new(
        line: usize,
        values: BTreeMap<String, Option<Terminal>>,
    ) -> Self {
        Self { line, values }
    }

    /// Returns the (1-based) line of the record in the export.
    #[inline]
    pub fn line(&self) -> usize {
        self.line
    }

    /// Returns the terminal value of a column, if present.
    pub fn get(&self, column: &str) -> Option<&Terminal> {
        self.values.get(column).and_then(Option::as_ref)
    }

    /// Returns the first string value of a column.
    pub fn text(&self, column: &str) -> Option<String> {
        self.strings(column).into_iter().next()
    }

    /// Returns all values of a column as strings; an absent column
    /// yields an empty list.
    pub fn strings(&self, column: &str) -> Vec<String> {
        self.get(column).map(Terminal::to_strings).unwrap_or_default()
    }
}

/// Options for reading an export.
pub struct LoaderOptions {
    /// The sub-document of every line that holds the record. Split by
    /// `.` for nested access.
    pub prefix: Option<String>,

    /// Records that aren't accepted by every filter are skipped.
    pub filters: Vec<Box<dyn Filter>>,

    /// Per-field value rules, applied before the filters run.
    pub rules: BTreeMap<String, ValueRules>,

    /// The maximum number of records to read.
    pub max_len: Option<usize>,

    /// Don't show progress.
    pub quiet: bool,
}

impl Default for LoaderOptions {
    fn default() -> Self {
        Self {
            prefix: Some(defaults::PREFIX.into()),
            filters: vec![],
            rules: BTreeMap::new(),
            max_len: None,
            quiet: true,
        }
    }
}

/// Returns an iterator over the records of a line-delimited JSON
/// file, along with their (1-based) line numbers. Blank lines are
/// skipped. The iterator stops after `max_len` records.
///
/// A record whose prefix doesn't point to an object is an error.
pub fn raw_records<P: AsRef<Path>>(
    path: P,
    prefix: Option<&str>,
    max_len: Option<usize>,
) -> DataprepResult<impl Iterator<Item = DataprepResult<(usize, Value)>>>
{
    let reader = BufReader::new(File::open(path)?);
    let prefix = prefix.map(|prefix| parse_path(prefix, "."));

    let iter = reader
        .lines()
        .enumerate()
        .filter(|(_, line)| {
            !matches!(line, Ok(line) if line.trim().is_empty())
        })
        .take(max_len.unwrap_or(usize::MAX))
        .map(move |(idx, line)| {
            let line = line?;
            let mut value: Value = serde_json::from_str(&line)?;

            if let Some(ref prefix) = prefix {
                value = match get_in(&value, prefix) {
                    Query::Value(inner) => inner.clone(),
                    _ => Value::Null,
                };
            }

            if !value.is_object() {
                return Err(DataprepError::other(format!(
                    "line {}: prefix doesn't point to an object",
                    idx + 1
                )));
            }

            Ok((idx + 1, value))
        });

    Ok(iter)
}

fn count_lines<P: AsRef<Path>>(path: P) -> DataprepResult<u64> {
    let reader = BufReader::new(File::open(path)?);
    Ok(reader.lines().count() as u64)
}

/// Reads the selected columns of all accepted records of an export.
///
/// `columns` maps the column names of the resulting rows to the
/// (dotted) paths of the record fields.
pub fn read_rows<P: AsRef<Path>>(
    path: P,
    columns: &BTreeMap<String, String>,
    options: &LoaderOptions,
) -> DataprepResult<Vec<Row>> {
    let path = path.as_ref();
    let columns: Vec<_> = columns
        .iter()
        .map(|(name, field)| (name.clone(), parse_path(field, ".")))
        .collect();
    let rules: Vec<_> = options
        .rules
        .iter()
        .map(|(field, rules)| (parse_path(field, "."), rules))
        .collect();

    let mut len = count_lines(path)?;
    if let Some(max_len) = options.max_len {
        len = len.min(max_len as u64);
    }

    let pbar = ProgressBarBuilder::new(PBAR_READ, options.quiet)
        .len(len)
        .build();

    let mut rows = vec![];
    for record in raw_records(path, options.prefix.as_deref(), options.max_len)?
        .progress_with(pbar)
    {
        let (line, mut record) = record?;
        for (field, rules) in rules.iter() {
            record = with_changed_value(record, field, rules);
        }

        if !accepts_all(&options.filters, &record) {
            continue;
        }

        rows.push(Row::new(
            line,
            columns
                .iter()
                .map(|(name, path)| {
                    (name.clone(), get_terminal_in(&record, path))
                })
                .collect(),
        ));
    }

    log::info!("read {} records from {}", rows.len(), path.display());
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use serde_json::json;

    use super::*;
    use crate::filters::BasicFilter;

    type TestResult = anyhow::Result<()>;

    fn write_export(lines: &[Value]) -> anyhow::Result<tempfile::NamedTempFile> {
        let mut file = tempfile::NamedTempFile::new()?;
        for line in lines {
            writeln!(file, "{}", serde_json::to_string(line)?)?;
        }
        file.flush()?;
        Ok(file)
    }

    fn record(id: &str, title: &str) -> Value {
        json!({"_source": {
            "nodeRef": {"id": id, "storeRef": {"protocol": "workspace"}},
            "type": "ccm:io",
            "properties": {
                "cm:edu_metadataset": "mds_oeh",
                "cclom:title": title,
                "cclom:general_language": ["de_DE", "en"],
            },
        }})
    }

    #[test]
    fn read_rows_with_rules_and_filters() -> TestResult {
        let mut rejected = record("3", "Drei");
        rejected["_source"]["type"] = json!("ccm:map");

        let file =
            write_export(&[record("1", "Eins"), record("2", "Zwei"), rejected])?;
        let columns = BTreeMap::from([
            ("id".to_string(), "nodeRef.id".to_string()),
            ("title".to_string(), "properties.cclom:title".to_string()),
            (
                "language".to_string(),
                "properties.cclom:general_language".to_string(),
            ),
            ("missing".to_string(), "properties.foo".to_string()),
        ]);

        let options = LoaderOptions {
            filters: vec![Box::new(BasicFilter)],
            rules: BTreeMap::from([(
                "properties.cclom:general_language".to_string(),
                ValueRules::new(
                    ["en"],
                    [("de_DE".to_string(), "de".to_string())],
                ),
            )]),
            ..Default::default()
        };

        let rows = read_rows(file.path(), &columns, &options)?;
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].line(), 1);
        assert_eq!(rows[1].line(), 2);
        assert_eq!(rows[0].text("id").as_deref(), Some("1"));
        assert_eq!(rows[1].text("title").as_deref(), Some("Zwei"));
        assert_eq!(rows[0].strings("language"), vec!["de"]);
        assert!(rows[0].get("missing").is_none());
        Ok(())
    }

    #[test]
    fn read_rows_max_len() -> TestResult {
        let file = write_export(&[
            record("1", "Eins"),
            record("2", "Zwei"),
            record("3", "Drei"),
        ])?;
        let columns =
            BTreeMap::from([("id".to_string(), "nodeRef.id".to_string())]);
        let options = LoaderOptions {
            max_len: Some(2),
            ..Default::default()
        };

        let rows = read_rows(file.path(), &columns, &options)?;
        assert_eq!(rows.len(), 2);
        Ok(())
    }

    #[test]
    fn line_numbers_count_blank_lines() -> TestResult {
        let mut file = tempfile::NamedTempFile::new()?;
        writeln!(file, "{}", serde_json::to_string(&record("1", "Eins"))?)?;
        writeln!(file)?;
        writeln!(file, "{}", serde_json::to_string(&record("2", "Zwei"))?)?;
        file.flush()?;

        let lines = raw_records(file.path(), Some("_source"), None)?
            .map(|record| record.map(|(line, _)| line))
            .collect::<DataprepResult<Vec<_>>>()?;
        assert_eq!(lines, vec![1, 3]);
        Ok(())
    }

    #[test]
    fn prefix_must_point_to_object() -> TestResult {
        let file = write_export(&[json!({"_source": 42})])?;
        let result: DataprepResult<Vec<_>> =
            raw_records(file.path(), Some("_source"), None)?.collect();
        assert!(result.is_err());

        let file = write_export(&[json!({"other": {}})])?;
        let result: DataprepResult<Vec<_>> =
            raw_records(file.path(), Some("_source"), None)?.collect();
        assert!(result.is_err());
        Ok(())
    }
}
