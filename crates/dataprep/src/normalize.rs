use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::nested::{basic_to_string, update_in, Key};

/// Drop and remap rules for the values of one field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueRules {
    /// Values that are removed from the field.
    #[serde(skip_serializing_if = "BTreeSet::is_empty", default)]
    pub dropped: BTreeSet<String>,

    /// Synonym values that are replaced by their canonical value.
    #[serde(skip_serializing_if = "BTreeMap::is_empty", default)]
    pub remapped: BTreeMap<String, String>,
}

impl ValueRules {
    pub fn new<D, R>(dropped: D, remapped: R) -> Self
    where
        D: IntoIterator,
        D::Item: Into<String>,
        R: IntoIterator<Item = (String, String)>,
    {
        Self {
            dropped: dropped.into_iter().map(Into::into).collect(),
            remapped: remapped.into_iter().collect(),
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.dropped.is_empty() && self.remapped.is_empty()
    }

    /// Merges `other` into `self`; remappings of `other` take
    /// precedence.
    pub fn merge(&mut self, other: &ValueRules) {
        self.dropped.extend(other.dropped.iter().cloned());
        self.remapped.extend(
            other.remapped.iter().map(|(k, v)| (k.clone(), v.clone())),
        );
    }

    fn remap_value(&self, value: Value) -> Value {
        match basic_to_string(&value) {
            Some(key) => match self.remapped.get(&key) {
                Some(target) => Value::String(target.clone()),
                None => value,
            },
            None => value,
        }
    }

    fn is_dropped(&self, value: &Value) -> bool {
        basic_to_string(value)
            .map(|key| self.dropped.contains(&key))
            .unwrap_or(false)
    }

    /// Applies the rules to a scalar or a sequence of values.
    ///
    /// Remapping happens first, then every value in the drop set is
    /// removed. A dropped scalar becomes `null`, a sequence keeps the
    /// order of its remaining values.
    pub fn apply(&self, value: Value) -> Value {
        match value {
            Value::Array(items) => Value::Array(
                items
                    .into_iter()
                    .map(|item| self.remap_value(item))
                    .filter(|item| !self.is_dropped(item))
                    .collect(),
            ),
            value => {
                let value = self.remap_value(value);
                if self.is_dropped(&value) {
                    Value::Null
                } else {
                    value
                }
            }
        }
    }

    /// Applies the rules to an already extracted multi-valued field.
    pub fn apply_set<I>(&self, values: I) -> BTreeSet<String>
    where
        I: IntoIterator<Item = String>,
    {
        values
            .into_iter()
            .map(|value| self.remapped.get(&value).cloned().unwrap_or(value))
            .filter(|value| !self.dropped.contains(value))
            .collect()
    }
}

/// Returns a record in which the value(s) at `path` are normalized by
/// `rules`. Every other field is left untouched.
pub fn with_changed_value(
    record: Value,
    path: &[Key],
    rules: &ValueRules,
) -> Value {
    if rules.is_empty() {
        return record;
    }

    update_in(record, path, |value| rules.apply(value))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::nested::parse_path;

    fn rules() -> ValueRules {
        ValueRules::new(
            ["", "http://example.org/???"],
            [
                ("Deutsch".to_string(), "http://example.org/120".to_string()),
                ("de_DE".to_string(), "de".to_string()),
            ],
        )
    }

    #[test]
    fn remap_then_drop_in_sequence() {
        let record = json!({
            "properties": {
                "taxonid": ["Deutsch", "", "http://example.org/380"],
                "title": "Deutsch",
            }
        });

        let record = with_changed_value(
            record,
            &parse_path("properties.taxonid", "."),
            &rules(),
        );

        assert_eq!(
            record,
            json!({
                "properties": {
                    "taxonid": ["http://example.org/120", "http://example.org/380"],
                    "title": "Deutsch",
                }
            })
        );
    }

    #[test]
    fn dropped_scalar_becomes_null() {
        let record = json!({"lang": "http://example.org/???"});
        let record = with_changed_value(record, &parse_path("lang", "."), &rules());
        assert_eq!(record, json!({"lang": null}));
    }

    #[test]
    fn remap_to_dropped_value_is_dropped() {
        let rules = ValueRules::new(["x"], [("y".to_string(), "x".to_string())]);
        assert_eq!(rules.apply(json!(["y", "z"])), json!(["z"]));
    }

    #[test]
    fn missing_field_is_untouched() {
        let record = json!({"a": 1});
        let result =
            with_changed_value(record.clone(), &parse_path("b.c", "."), &rules());
        assert_eq!(result, record);
    }

    #[test]
    fn apply_set() {
        let values = ["de_DE", "en", ""].map(String::from);
        assert_eq!(
            rules().apply_set(values),
            BTreeSet::from(["de".to_string(), "en".to_string()])
        );
    }

    #[test]
    fn merge_rules() {
        let mut lhs = rules();
        let rhs = ValueRules::new(["foo"], [("de_DE".into(), "deu".into())]);
        lhs.merge(&rhs);

        assert!(lhs.dropped.contains("foo"));
        assert!(lhs.dropped.contains(""));
        assert_eq!(lhs.remapped["de_DE"], "deu");
    }
}
