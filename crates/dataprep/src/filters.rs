//! Predicates over raw (normalized) records.

use serde_json::Value;

use crate::nested::{get_terminal_in, parse_path, Terminal};

/// A predicate that decides whether a raw record is kept.
pub trait Filter: Send + Sync {
    fn accepts(&self, record: &Value) -> bool;
}

impl<F> Filter for F
where
    F: Fn(&Value) -> bool + Send + Sync,
{
    fn accepts(&self, record: &Value) -> bool {
        self(record)
    }
}

#[inline]
fn terminal_str(record: &Value, field: &str) -> Option<String> {
    get_terminal_in(record, &parse_path(field, "."))
        .as_ref()
        .and_then(Terminal::as_str)
        .map(String::from)
}

#[inline]
fn terminal_strings(record: &Value, field: &str) -> Vec<String> {
    get_terminal_in(record, &parse_path(field, "."))
        .map(|terminal| terminal.to_strings())
        .unwrap_or_default()
}

/// Accepts the records of the repository export that are regular
/// learning objects: stored in the workspace, of type `ccm:io`, using
/// the `mds_oeh` metadata set and not a reference to a collection.
#[derive(Debug, Default, Clone, Copy)]
pub struct BasicFilter;

impl Filter for BasicFilter {
    fn accepts(&self, record: &Value) -> bool {
        terminal_str(record, "nodeRef.storeRef.protocol").as_deref()
            == Some("workspace")
            && terminal_str(record, "type").as_deref() == Some("ccm:io")
            && terminal_str(record, "properties.cm:edu_metadataset")
                .as_deref()
                == Some("mds_oeh")
            && !terminal_strings(record, "aspects")
                .iter()
                .any(|aspect| aspect == "ccm:collection_io_reference")
    }
}

/// Accepts records that everyone is allowed to read.
#[derive(Debug, Default, Clone, Copy)]
pub struct PubliclyVisible;

impl Filter for PubliclyVisible {
    fn accepts(&self, record: &Value) -> bool {
        terminal_strings(record, "permissions.Read")
            .iter()
            .any(|group| group == "GROUP_EVERYONE")
    }
}

/// Returns `true`, if every filter accepts the record.
pub fn accepts_all(filters: &[Box<dyn Filter>], record: &Value) -> bool {
    filters.iter().all(|filter| filter.accepts(record))
}
