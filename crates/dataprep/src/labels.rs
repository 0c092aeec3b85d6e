//! Resolution of human-readable labels for category identifiers.
//!
//! Labels come either from a SKOS vocabulary that is fetched once
//! ([SkosVocabulary]) or from looking up every identifier on its own
//! ([UriLookup]). A failed lookup resolves to `None`; it never aborts
//! the batch.

use std::collections::BTreeMap;
use std::sync::Mutex;

use hashbrown::HashMap;
use rayon::prelude::*;
use serde::Serialize;
use serde_json::Value;

use crate::defaults;
use crate::error::DataprepResult;
use crate::nested::{
    children_map, get_terminal_in, leaves, parent_map, Key, Path,
    Terminal,
};

/// A source of JSON documents, addressed by URL.
pub trait JsonSource: Sync {
    fn get_json(&self, url: &str) -> DataprepResult<Value>;
}

/// Fetches JSON documents over HTTP.
#[derive(Debug, Default, Clone)]
pub struct HttpSource {
    client: reqwest::blocking::Client,
}

impl HttpSource {
    pub fn new() -> Self {
        Self::default()
    }
}

impl JsonSource for HttpSource {
    fn get_json(&self, url: &str) -> DataprepResult<Value> {
        let response = self.client.get(url).send()?.error_for_status()?;
        Ok(response.json()?)
    }
}

/// Maps category identifiers to their labels.
pub trait LabelResolver {
    /// Returns one (optional) label per identifier, in order.
    fn resolve(&self, ids: &[String]) -> Vec<Option<String>>;
}

/// Resolves every identifier to `None`.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoLabels;

impl LabelResolver for NoLabels {
    fn resolve(&self, ids: &[String]) -> Vec<Option<String>> {
        vec![None; ids.len()]
    }
}

fn terminal_to_strings(terminal: Option<Terminal>) -> Vec<String> {
    terminal.map(|t| t.to_strings()).unwrap_or_default()
}

/// Collects the map from identifiers to labels of a vocabulary schema.
///
/// Every leaf whose path ends with `label_path` is a label; the
/// identifier is looked up at `id_path` relative to the node that
/// carries the label.
pub fn label_dict(
    schema: &Value,
    label_path: &[Key],
    id_path: &[Key],
) -> BTreeMap<String, String> {
    let n = label_path.len();
    let mut labels = BTreeMap::new();

    for leaf in leaves(schema) {
        if leaf.len() < n || leaf[leaf.len() - n..] != *label_path {
            continue;
        }

        let mut node_id_path: Path = leaf[..leaf.len() - n].to_vec();
        node_id_path.extend(id_path.iter().cloned());

        let hit_labels =
            terminal_to_strings(get_terminal_in(schema, &leaf));
        let hit_ids =
            terminal_to_strings(get_terminal_in(schema, &node_id_path));

        match (hit_ids.as_slice(), hit_labels.as_slice()) {
            ([id], labels_) => {
                for label in labels_ {
                    labels.insert(id.clone(), label.clone());
                }
            }
            (ids, [label]) => {
                for id in ids {
                    labels.insert(id.clone(), label.clone());
                }
            }
            (ids, labels_) => {
                for (id, label) in ids.iter().zip(labels_.iter()) {
                    labels.insert(id.clone(), label.clone());
                }
            }
        }
    }

    labels
}

/// Labels from a SKOS vocabulary schema.
#[derive(Debug, Default, Clone)]
pub struct SkosVocabulary {
    labels: BTreeMap<String, String>,
}

impl SkosVocabulary {
    pub fn from_schema(
        schema: &Value,
        label_path: &[Key],
        id_path: &[Key],
    ) -> Self {
        Self {
            labels: label_dict(schema, label_path, id_path),
        }
    }

    /// Fetches the vocabulary at `url` (with the default label and id
    /// paths).
    pub fn fetch(source: &dyn JsonSource, url: &str) -> DataprepResult<Self> {
        log::info!("fetching SKOS vocabulary {url}");
        let schema = source.get_json(url)?;

        Ok(Self::from_schema(
            &schema,
            &defaults::label_path(),
            &defaults::id_path(),
        ))
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

impl LabelResolver for SkosVocabulary {
    fn resolve(&self, ids: &[String]) -> Vec<Option<String>> {
        ids.iter().map(|id| self.labels.get(id).cloned()).collect()
    }
}

/// Looks up the label of every URI on its own.
///
/// Results are memoized for the lifetime of the lookup, so a resolver
/// shared across several target fields requests every URI at most once
/// (unless two lookups for the same URI are in flight at the same
/// time).
pub struct UriLookup<'a> {
    source: &'a dyn JsonSource,
    label_path: Path,
    cache: Mutex<HashMap<String, Option<String>>>,
}

impl<'a> UriLookup<'a> {
    pub fn new(source: &'a dyn JsonSource) -> Self {
        Self {
            source,
            label_path: defaults::label_path(),
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the source the labels are looked up in.
    #[inline]
    pub fn source(&self) -> &'a dyn JsonSource {
        self.source
    }

    /// Returns the URL of the JSON representation of a concept.
    fn json_url(uri: &str) -> String {
        let uri = uri.strip_suffix(".html").unwrap_or(uri);
        if uri.ends_with(".json") {
            uri.to_string()
        } else {
            format!("{uri}.json")
        }
    }

    fn fetch_label(&self, uri: &str) -> Option<String> {
        if uri.is_empty() {
            return None;
        }

        match self.source.get_json(&Self::json_url(uri)) {
            Ok(concept) => get_terminal_in(&concept, &self.label_path)
                .as_ref()
                .and_then(Terminal::as_str)
                .map(String::from),
            Err(e) => {
                log::debug!("unable to look up label of {uri}: {e}");
                None
            }
        }
    }

    /// Returns the label of `uri`, looking it up if necessary.
    pub fn lookup(&self, uri: &str) -> Option<String> {
        if let Ok(cache) = self.cache.lock() {
            if let Some(label) = cache.get(uri) {
                return label.clone();
            }
        }

        let label = self.fetch_label(uri);
        if let Ok(mut cache) = self.cache.lock() {
            cache.insert(uri.to_string(), label.clone());
        }

        label
    }
}

impl LabelResolver for UriLookup<'_> {
    fn resolve(&self, ids: &[String]) -> Vec<Option<String>> {
        ids.par_iter().map(|uri| self.lookup(uri)).collect()
    }
}

/// One node of a vocabulary hierarchy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HierarchyEntry {
    pub key: String,
    pub name: String,
    pub parent: Option<String>,
}

/// Extracts the labelled nodes of a vocabulary together with their
/// parents. A node listed under several parents keeps the last one
/// (see [parent_map]).
pub fn hierarchy_from_schema<S: AsRef<str>>(
    schema: &Value,
    id_path: &[Key],
    label_path: &[Key],
    child_fields: &[S],
) -> Vec<HierarchyEntry> {
    let parents = parent_map(&children_map(schema, id_path, child_fields));

    label_dict(schema, label_path, id_path)
        .into_iter()
        .map(|(key, name)| HierarchyEntry {
            parent: parents.get(&key).cloned().flatten(),
            key,
            name,
        })
        .collect()
}

/// Fetches the SKOS vocabulary at `url` and extracts its hierarchy
/// using the default id path, label path and sub-category fields.
pub fn hierarchy_from_skos(
    source: &dyn JsonSource,
    url: &str,
) -> DataprepResult<Vec<HierarchyEntry>> {
    let schema = source.get_json(url)?;

    Ok(hierarchy_from_schema(
        &schema,
        &defaults::id_path(),
        &defaults::label_path(),
        defaults::SUBCATEGORY_FIELDS,
    ))
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use serde_json::json;

    use super::*;
    use crate::error::DataprepError;

    type TestResult = anyhow::Result<()>;

    /// Serves JSON documents from memory and counts the requests.
    #[derive(Default)]
    struct StaticSource {
        docs: BTreeMap<String, Value>,
        requests: AtomicUsize,
    }

    impl StaticSource {
        fn new<I: IntoIterator<Item = (String, Value)>>(
            docs: I,
        ) -> Self {
            Self {
                docs: docs.into_iter().collect(),
                requests: AtomicUsize::new(0),
            }
        }
    }

    impl JsonSource for StaticSource {
        fn get_json(&self, url: &str) -> DataprepResult<Value> {
            self.requests.fetch_add(1, Ordering::SeqCst);
            self.docs
                .get(url)
                .cloned()
                .ok_or_else(|| DataprepError::other(format!("404 {url}")))
        }
    }

    fn schema() -> Value {
        json!({
            "id": "http://w3id.org/vocabs/discipline/",
            "title": {"de": "Fach"},
            "hasTopConcept": [
                {
                    "id": "http://w3id.org/vocabs/discipline/120",
                    "prefLabel": {"de": "Deutsch", "en": "German"},
                    "narrower": [
                        {
                            "id": "http://w3id.org/vocabs/discipline/28002",
                            "prefLabel": {"de": "Deutsch als Zweitsprache"},
                        }
                    ],
                },
                {
                    "id": "http://w3id.org/vocabs/discipline/380",
                    "prefLabel": {"de": "Mathematik"},
                },
            ]
        })
    }

    #[test]
    fn label_dict_from_schema() {
        let labels = label_dict(
            &schema(),
            &defaults::label_path(),
            &defaults::id_path(),
        );

        assert_eq!(labels.len(), 3);
        assert_eq!(labels["http://w3id.org/vocabs/discipline/120"], "Deutsch");
        assert_eq!(
            labels["http://w3id.org/vocabs/discipline/28002"],
            "Deutsch als Zweitsprache"
        );
    }

    #[test]
    fn skos_vocabulary_resolves_aligned() -> TestResult {
        let url = "https://vocabs.example.org/discipline/index.json";
        let source = StaticSource::new([(url.to_string(), schema())]);
        let vocab = SkosVocabulary::fetch(&source, url)?;

        let ids = vec![
            "http://w3id.org/vocabs/discipline/380".to_string(),
            "http://w3id.org/vocabs/discipline/999".to_string(),
        ];
        assert_eq!(
            vocab.resolve(&ids),
            vec![Some("Mathematik".to_string()), None]
        );
        Ok(())
    }

    #[test]
    fn uri_lookup_memoizes_and_degrades() {
        let source = StaticSource::new([(
            "http://w3id.org/vocabs/discipline/380.json".to_string(),
            json!({"prefLabel": {"de": "Mathematik"}}),
        )]);
        let lookup = UriLookup::new(&source);

        let ids = vec![
            "http://w3id.org/vocabs/discipline/380.html".to_string(),
            "http://w3id.org/vocabs/discipline/404".to_string(),
            String::new(),
        ];

        assert_eq!(
            lookup.resolve(&ids),
            vec![Some("Mathematik".to_string()), None, None]
        );
        assert_eq!(source.requests.load(Ordering::SeqCst), 2);

        // cached, no new requests
        let _ = lookup.resolve(&ids);
        assert_eq!(source.requests.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn hierarchy_entries() {
        let entries = hierarchy_from_schema(
            &schema(),
            &defaults::id_path(),
            &defaults::label_path(),
            defaults::SUBCATEGORY_FIELDS,
        );

        assert_eq!(entries.len(), 3);
        let daz = entries
            .iter()
            .find(|e| e.name == "Deutsch als Zweitsprache")
            .unwrap();
        assert_eq!(
            daz.parent.as_deref(),
            Some("http://w3id.org/vocabs/discipline/120")
        );

        let math = entries.iter().find(|e| e.name == "Mathematik").unwrap();
        assert_eq!(
            math.parent.as_deref(),
            Some("http://w3id.org/vocabs/discipline/")
        );
    }
}
