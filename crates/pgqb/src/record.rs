//! Generic key/value rows.
//!
//! A [`Record`] is what every fetched row decodes into, and it is also accepted
//! by [`QueryBuilder::cols_with_params`](crate::QueryBuilder::cols_with_params)
//! as a combined column/parameter source. Keys enumerate in sorted order, so
//! two decodes of the same row always iterate identically.

use crate::error::{QbError, QbResult};
use crate::value::Value;
use heck::{ToLowerCamelCase, ToSnakeCase};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::collections::btree_map;

/// An ordered column-name → [`Value`] map.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(BTreeMap<String, Value>);

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode a JSON object.
    ///
    /// An empty payload decodes to an empty record; anything other than a JSON
    /// object is a [`QbError::BadType`].
    pub fn from_json_slice(bytes: &[u8]) -> QbResult<Self> {
        if bytes.is_empty() {
            return Ok(Self::new());
        }
        match serde_json::from_slice::<serde_json::Value>(bytes)? {
            serde_json::Value::Object(obj) => Ok(obj
                .into_iter()
                .map(|(k, v)| (k, Value::from(v)))
                .collect()),
            serde_json::Value::Null => Ok(Self::new()),
            other => Err(QbError::bad_type(
                "<record>",
                format!("expected a JSON object, got {}", json_kind(&other)),
            )),
        }
    }

    /// Encode as a JSON object.
    pub fn to_json_vec(&self) -> QbResult<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// JSON text, or an empty string if encoding fails.
    pub fn as_json_string(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(key.into(), value.into())
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, Value> {
        self.0.iter()
    }

    pub fn keys(&self) -> Vec<String> {
        self.0.keys().cloned().collect()
    }

    pub fn values(&self) -> Vec<Value> {
        self.0.values().cloned().collect()
    }

    /// Values of the listed keys, in the listed order. Missing keys yield `Null`.
    pub fn values_of<I, S>(&self, keys: I) -> Vec<Value>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        keys.into_iter()
            .map(|k| self.0.get(k.as_ref()).cloned().unwrap_or_default())
            .collect()
    }

    /// Shallow copy without the listed keys.
    pub fn copy_excluding<I, S>(&self, fields: I) -> Record
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut copy = self.clone();
        for field in fields {
            copy.0.remove(field.as_ref());
        }
        copy
    }

    /// Look up a dotted path through nested maps, e.g. `"owner.address.city"`.
    ///
    /// Returns `None` if any segment is missing, null, or not a map.
    pub fn value_at(&self, path: &str) -> Option<&Value> {
        let mut segments = path.split('.').peekable();
        let mut current = self;
        while let Some(segment) = segments.next() {
            let value = current.0.get(segment)?;
            if value.is_null() {
                return None;
            }
            if segments.peek().is_none() {
                return Some(value);
            }
            current = value.as_map()?;
        }
        None
    }

    /// Copy with every top-level key converted to `snake_case`.
    pub fn snake_keys(&self) -> Record {
        self.iter()
            .map(|(k, v)| (k.to_snake_case(), v.clone()))
            .collect()
    }

    /// Copy with every top-level key converted to `lowerCamelCase`.
    pub fn camel_keys(&self) -> Record {
        self.iter()
            .map(|(k, v)| (k.to_lower_camel_case(), v.clone()))
            .collect()
    }
}

fn json_kind(v: &serde_json::Value) -> &'static str {
    match v {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "bool",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

impl FromIterator<(String, Value)> for Record {
    fn from_iter<T: IntoIterator<Item = (String, Value)>>(iter: T) -> Self {
        Record(iter.into_iter().collect())
    }
}

impl IntoIterator for Record {
    type Item = (String, Value);
    type IntoIter = btree_map::IntoIter<String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a Record {
    type Item = (&'a String, &'a Value);
    type IntoIter = btree_map::Iter<'a, String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
