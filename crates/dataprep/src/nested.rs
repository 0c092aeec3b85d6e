//! Traversal of nested JSON records.
//!
//! A raw record is an arbitrarily deep tree of mappings and sequences
//! ([Value]). Fields are addressed by a [Path], a sequence of keys that
//! is applied from the root. Whenever a sequence is reached while a
//! field key is still left on the path, the remaining path is mapped
//! over every element (broadcasting). Absent keys or type mismatches
//! never fail; they yield [Query::Missing] or `None`.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt::{self, Display};

use serde_json::Value;

use crate::error::{DataprepError, DataprepResult};

/// A single component of a [Path].
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Key {
    Field(String),
    Index(usize),
}

impl From<&str> for Key {
    fn from(value: &str) -> Self {
        Self::Field(value.into())
    }
}

impl From<String> for Key {
    fn from(value: String) -> Self {
        Self::Field(value)
    }
}

impl From<usize> for Key {
    fn from(value: usize) -> Self {
        Self::Index(value)
    }
}

impl Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Field(name) => f.write_str(name),
            Self::Index(idx) => write!(f, "{idx}"),
        }
    }
}

pub type Path = Vec<Key>;

/// Splits a dotted field name (`properties.cclom:title`) into a
/// [Path]. Every component is treated as a mapping key.
pub fn parse_path(s: &str, separator: &str) -> Path {
    s.split(separator).map(Key::from).collect()
}

/// The result of a nested lookup.
#[derive(Debug, Clone, PartialEq)]
pub enum Query<'a> {
    /// The path doesn't exist in the record.
    Missing,
    /// The path resolved to exactly one node.
    Value(&'a Value),
    /// The path was broadcast over a sequence; one entry per element,
    /// in the order of the sequence.
    Many(Vec<Query<'a>>),
}

impl Query<'_> {
    #[inline]
    pub fn is_missing(&self) -> bool {
        matches!(self, Self::Missing)
    }
}

/// Follows `path` through `record`.
pub fn get_in<'a>(record: &'a Value, path: &[Key]) -> Query<'a> {
    let Some((key, rest)) = path.split_first() else {
        return Query::Value(record);
    };

    match (record, key) {
        (Value::Object(map), Key::Field(name)) => match map.get(name) {
            Some(value) => get_in(value, rest),
            None => Query::Missing,
        },
        (Value::Array(items), Key::Index(idx)) => match items.get(*idx) {
            Some(value) => get_in(value, rest),
            None => Query::Missing,
        },
        (Value::Array(items), Key::Field(_)) => Query::Many(
            items.iter().map(|item| get_in(item, path)).collect(),
        ),
        _ => Query::Missing,
    }
}

/// A flattened terminal value: either a single basic value or a flat
/// list of basic values (strings, numbers and booleans).
#[derive(Debug, Clone, PartialEq)]
pub enum Terminal {
    Single(Value),
    List(Vec<Value>),
}

impl Terminal {
    /// Returns the value as a string, if it is a single string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Single(Value::String(s)) => Some(s.as_str()),
            Self::List(values) if values.len() == 1 => values[0].as_str(),
            _ => None,
        }
    }

    /// Returns every basic value as string.
    pub fn to_strings(&self) -> Vec<String> {
        match self {
            Self::Single(value) => basic_to_string(value)
                .into_iter()
                .collect(),
            Self::List(values) => {
                values.iter().filter_map(basic_to_string).collect()
            }
        }
    }

    /// Returns `true`, if the value is (or contains) the boolean
    /// `true` or its string representation.
    pub fn is_true(&self) -> bool {
        let truthy = |value: &Value| match value {
            Value::Bool(b) => *b,
            Value::String(s) => s.eq_ignore_ascii_case("true"),
            _ => false,
        };

        match self {
            Self::Single(value) => truthy(value),
            Self::List(values) => values.iter().any(truthy),
        }
    }
}

/// Converts a basic value into its string form. Containers and `null`
/// have no string form.
pub fn basic_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

#[inline]
fn is_basic(value: &Value) -> bool {
    matches!(value, Value::String(_) | Value::Number(_) | Value::Bool(_))
}

fn flatten_value(value: &Value, out: &mut Vec<Value>) {
    match value {
        Value::Array(items) => {
            items.iter().for_each(|item| flatten_value(item, out))
        }
        value if is_basic(value) => out.push(value.clone()),
        _ => (),
    }
}

fn flatten_query(query: &Query<'_>, out: &mut Vec<Value>) {
    match query {
        Query::Missing => (),
        Query::Value(value) => flatten_value(value, out),
        Query::Many(queries) => {
            queries.iter().for_each(|q| flatten_query(q, out))
        }
    }
}

/// Like [get_in], but flattens the result to a [Terminal]. Returns
/// `None` if the path doesn't lead to any basic value.
pub fn get_terminal_in(record: &Value, path: &[Key]) -> Option<Terminal> {
    match get_in(record, path) {
        Query::Missing => None,
        Query::Value(value) if is_basic(value) => {
            Some(Terminal::Single(value.clone()))
        }
        query => {
            let mut values = vec![];
            flatten_query(&query, &mut values);
            if values.is_empty() {
                None
            } else {
                Some(Terminal::List(values))
            }
        }
    }
}

/// Rewrites the node(s) at `path` with `f` and returns the changed
/// record. Paths that don't exist leave the record unchanged.
pub fn update_in<F>(mut record: Value, path: &[Key], mut f: F) -> Value
where
    F: FnMut(Value) -> Value,
{
    update_node(&mut record, path, &mut f);
    record
}

fn update_node(
    node: &mut Value,
    path: &[Key],
    f: &mut dyn FnMut(Value) -> Value,
) {
    let Some((key, rest)) = path.split_first() else {
        let old = node.take();
        *node = f(old);
        return;
    };

    match (node, key) {
        (Value::Object(map), Key::Field(name)) => {
            if let Some(child) = map.get_mut(name) {
                update_node(child, rest, f);
            }
        }
        (Value::Array(items), Key::Index(idx)) => {
            if let Some(child) = items.get_mut(*idx) {
                update_node(child, rest, f);
            }
        }
        (Value::Array(items), Key::Field(_)) => {
            for item in items.iter_mut() {
                update_node(item, path, f);
            }
        }
        _ => (),
    }
}

/// Enumerates the paths to every basic value of the record in
/// document order. Sequence positions are given as [Key::Index].
pub fn leaves(record: &Value) -> Vec<Path> {
    fn walk(node: &Value, prefix: &mut Path, out: &mut Vec<Path>) {
        match node {
            Value::Object(map) => {
                for (key, value) in map.iter() {
                    prefix.push(Key::Field(key.clone()));
                    walk(value, prefix, out);
                    prefix.pop();
                }
            }
            Value::Array(items) => {
                for (idx, value) in items.iter().enumerate() {
                    prefix.push(Key::Index(idx));
                    walk(value, prefix, out);
                    prefix.pop();
                }
            }
            Value::Null => (),
            _ => out.push(prefix.clone()),
        }
    }

    let mut out = vec![];
    walk(record, &mut vec![], &mut out);
    out
}

pub type ChildrenMap = BTreeMap<String, BTreeSet<String>>;

/// Builds the adjacency map of a hierarchy.
///
/// Every mapping node that carries a string identifier at `id_path`
/// is a node of the hierarchy; its children are the nodes found
/// directly under any of the `child_fields` (either a single mapping
/// or a sequence of mappings).
pub fn children_map<S: AsRef<str>>(
    record: &Value,
    id_path: &[Key],
    child_fields: &[S],
) -> ChildrenMap {
    fn node_id(node: &Value, id_path: &[Key]) -> Option<String> {
        match node {
            Value::Object(_) => get_terminal_in(node, id_path)
                .as_ref()
                .and_then(Terminal::as_str)
                .map(String::from),
            _ => None,
        }
    }

    fn walk<S: AsRef<str>>(
        node: &Value,
        id_path: &[Key],
        child_fields: &[S],
        out: &mut ChildrenMap,
    ) {
        match node {
            Value::Object(map) => {
                if let Some(id) = node_id(node, id_path) {
                    let entry = out.entry(id).or_default();
                    for field in child_fields {
                        let children = match map.get(field.as_ref()) {
                            Some(Value::Array(items)) => items.iter(),
                            Some(child @ Value::Object(_)) => {
                                std::slice::from_ref(child).iter()
                            }
                            _ => continue,
                        };

                        entry.extend(
                            children
                                .filter_map(|c| node_id(c, id_path)),
                        );
                    }
                }

                map.values()
                    .for_each(|v| walk(v, id_path, child_fields, out));
            }
            Value::Array(items) => items
                .iter()
                .for_each(|v| walk(v, id_path, child_fields, out)),
            _ => (),
        }
    }

    let mut out = ChildrenMap::new();
    walk(record, id_path, child_fields, &mut out);
    out
}

/// Inverts a [ChildrenMap]. Every identifier of the hierarchy is
/// mapped to its parent, or `None` for roots.
///
/// Fails with [DataprepError::ParentConflict], if a node is listed
/// under more than one parent.
pub fn try_parent_map(
    children: &ChildrenMap,
) -> DataprepResult<BTreeMap<String, Option<String>>> {
    let mut parents: BTreeMap<String, Option<String>> = children
        .keys()
        .map(|id| (id.clone(), None))
        .collect();

    for (parent, kids) in children.iter() {
        for child in kids.iter() {
            let slot = parents.entry(child.clone()).or_default();
            if let Some(first) = slot.as_ref() {
                if first != parent {
                    return Err(DataprepError::ParentConflict {
                        child: child.clone(),
                        first: first.clone(),
                        second: parent.clone(),
                    });
                }
            }

            *slot = Some(parent.clone());
        }
    }

    Ok(parents)
}

/// Inverts a [ChildrenMap] like [try_parent_map], but never fails.
///
/// A node with more than one parent keeps the parent that comes last
/// in the (sorted) iteration order of the children map; the conflict
/// is logged as a warning.
pub fn parent_map(
    children: &ChildrenMap,
) -> BTreeMap<String, Option<String>> {
    let mut parents: BTreeMap<String, Option<String>> = children
        .keys()
        .map(|id| (id.clone(), None))
        .collect();

    for (parent, kids) in children.iter() {
        for child in kids.iter() {
            let slot = parents.entry(child.clone()).or_default();
            if let Some(first) = slot.replace(parent.clone()) {
                if &first != parent {
                    log::warn!(
                        "`{child}` has more than one parent (`{first}`, \
                         `{parent}`); keeping `{parent}`"
                    );
                }
            }
        }
    }

    parents
}
