//! Configuration value trees
//!
//! File-backed providers parse YAML or JSON and convert the document into a
//! [`Value`] tree, then flatten it into `:`-separated keys. Scalars keep the
//! text their parser reports for them, sequence items are keyed by index, and
//! nulls or empty containers become null entries.

use indexmap::IndexMap;

use crate::error::{Error, Result};
use crate::key::{self, KEY_DELIMITER};

/// A parsed configuration document
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    /// Null value
    #[default]
    Null,
    /// Boolean, number or string, as text (may contain `${...}` templates)
    Scalar(String),
    /// Sequence of values
    Sequence(Vec<Value>),
    /// Mapping of string keys to values
    Mapping(IndexMap<String, Value>),
}

/// Flattened key/value pairs, in document order
pub type FlatData = IndexMap<String, Option<String>>;

impl Value {
    /// Convert a YAML document
    ///
    /// Numbers are rendered from the parsed number, so integers of any size
    /// survive unchanged. Non-string mapping keys are stringified; keys that
    /// are not scalars are a parse error. Tags are ignored.
    pub fn from_yaml(value: serde_yaml::Value) -> Result<Self> {
        use serde_yaml::Value as Yaml;

        Ok(match value {
            Yaml::Null => Value::Null,
            Yaml::Bool(b) => Value::Scalar(b.to_string()),
            Yaml::Number(n) => Value::Scalar(n.to_string()),
            Yaml::String(s) => Value::Scalar(s),
            Yaml::Sequence(items) => Value::Sequence(
                items
                    .into_iter()
                    .map(Value::from_yaml)
                    .collect::<Result<_>>()?,
            ),
            Yaml::Mapping(map) => {
                let mut entries = IndexMap::with_capacity(map.len());
                for (k, v) in map {
                    insert_entry(&mut entries, yaml_key(k)?, Value::from_yaml(v)?)?;
                }
                Value::Mapping(entries)
            }
            Yaml::Tagged(tagged) => Value::from_yaml(tagged.value)?,
        })
    }

    /// Returns the type name of this value
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Scalar(_) => "scalar",
            Value::Sequence(_) => "sequence",
            Value::Mapping(_) => "mapping",
        }
    }

    /// Flatten the tree into `:`-separated keys
    ///
    /// The root must be a mapping (or null, for an empty document). Keys that
    /// differ only by case collide and are reported as a parse error.
    pub fn flatten(&self) -> Result<FlatData> {
        let mut data = FlatData::new();
        match self {
            Value::Null => {}
            Value::Mapping(map) => {
                for (k, v) in map {
                    flatten_into(v, k, &mut data)?;
                }
            }
            other => {
                return Err(Error::parse(format!(
                    "Top-level value must be a mapping, got {}",
                    other.type_name()
                )))
            }
        }
        Ok(data)
    }
}

/// JSON numbers keep their source text
impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Self {
        use serde_json::Value as Json;

        match value {
            Json::Null => Value::Null,
            Json::Bool(b) => Value::Scalar(b.to_string()),
            Json::Number(n) => Value::Scalar(n.to_string()),
            Json::String(s) => Value::Scalar(s),
            Json::Array(items) => Value::Sequence(items.into_iter().map(Value::from).collect()),
            Json::Object(map) => {
                Value::Mapping(map.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
            }
        }
    }
}

fn yaml_key(key: serde_yaml::Value) -> Result<String> {
    use serde_yaml::Value as Yaml;

    match key {
        Yaml::String(s) => Ok(s),
        Yaml::Number(n) => Ok(n.to_string()),
        Yaml::Bool(b) => Ok(b.to_string()),
        Yaml::Tagged(tagged) => yaml_key(tagged.value),
        Yaml::Null | Yaml::Sequence(_) | Yaml::Mapping(_) => Err(Error::parse(
            "Mapping keys must be strings, numbers or booleans",
        )),
    }
}

fn insert_entry(entries: &mut IndexMap<String, Value>, k: String, v: Value) -> Result<()> {
    if entries.contains_key(&k) {
        return Err(Error::parse(format!("A duplicate key '{}' was found", k)));
    }
    entries.insert(k, v);
    Ok(())
}

fn flatten_into(value: &Value, path: &str, data: &mut FlatData) -> Result<()> {
    match value {
        Value::Mapping(map) if !map.is_empty() => {
            for (k, v) in map {
                flatten_into(v, &format!("{}{}{}", path, KEY_DELIMITER, k), data)?;
            }
            Ok(())
        }
        Value::Sequence(seq) if !seq.is_empty() => {
            for (i, v) in seq.iter().enumerate() {
                flatten_into(v, &format!("{}{}{}", path, KEY_DELIMITER, i), data)?;
            }
            Ok(())
        }
        Value::Null | Value::Mapping(_) | Value::Sequence(_) => insert_unique(data, path, None),
        Value::Scalar(text) => insert_unique(data, path, Some(text.clone())),
    }
}

fn insert_unique(data: &mut FlatData, path: &str, value: Option<String>) -> Result<()> {
    if data.keys().any(|existing| key::keys_equal(existing, path)) {
        return Err(Error::parse(format!("A duplicate key '{}' was found", path)));
    }
    data.insert(path.to_string(), value);
    Ok(())
}
