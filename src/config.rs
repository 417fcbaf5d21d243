//! The immutable configuration store
//!
//! A [`Config`] maps full dotted paths to [`ConfigValue`]s in document order.
//! It is never modified after it has been built: [`Config::sub_config`],
//! [`Config::merge`] and `clone` all return new stores.

use crate::builder::{ConfigValue, SIZE_SUFFIX, Value, insert_value};
use crate::error::{AccessError, ConfigError};
use indexmap::IndexMap;
use rust_decimal::Decimal;
use serde::de::{Deserialize, Deserializer};
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::str::FromStr;

/// Recognised boolean words as `(true, false)` pairs, compared ignoring case
pub const BOOLEAN_PAIRS: [(&str, &str); 5] = [
    ("true", "false"),
    ("yes", "no"),
    ("on", "off"),
    ("enabled", "disabled"),
    ("active", "inactive"),
];

/// Parses one of the [`BOOLEAN_PAIRS`] words
pub fn parse_bool(value: &str) -> Option<bool> {
    BOOLEAN_PAIRS.iter().find_map(|(yes, no)| {
        if value.eq_ignore_ascii_case(yes) {
            Some(true)
        } else if value.eq_ignore_ascii_case(no) {
            Some(false)
        } else {
            None
        }
    })
}

/// Immutable store of configuration values addressed by dotted path
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Config {
    values: IndexMap<String, ConfigValue>,
}

impl Config {
    /// Creates an empty store
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn from_values(values: IndexMap<String, ConfigValue>) -> Self {
        Self { values }
    }

    /// Decodes a flat path to string map, turning every complete
    /// `<path>.size` / `<path>.1 ..` group back into a list
    pub fn from_flat_map<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let flat: IndexMap<String, String> = entries
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();

        let mut lists: IndexMap<&str, usize> = IndexMap::new();
        let mut elements: HashSet<String> = HashSet::new();
        for (key, value) in &flat {
            let Some(base) = key
                .strip_suffix(SIZE_SUFFIX)
                .and_then(|rest| rest.strip_suffix('.'))
                .filter(|base| !base.is_empty())
            else {
                continue;
            };
            let Ok(size) = value.parse::<usize>() else {
                continue;
            };
            let keys: Vec<String> = (1..=size).map(|i| format!("{base}.{i}")).collect();
            if keys.iter().all(|k| flat.contains_key(k)) {
                elements.extend(keys);
                lists.insert(base, size);
            }
        }

        let mut values = IndexMap::new();
        for (key, value) in &flat {
            if elements.contains(key) {
                continue;
            }
            let base = key.strip_suffix(SIZE_SUFFIX).and_then(|r| r.strip_suffix('.'));
            match base.and_then(|base| lists.get(base).map(|size| (base, *size))) {
                Some((base, size)) => {
                    let items = (1..=size).map(|i| flat[&format!("{base}.{i}")].clone());
                    values.insert(base.to_string(), ConfigValue::multi(base, items));
                }
                None => {
                    values.insert(key.clone(), ConfigValue::single(key.clone(), value.clone()));
                }
            }
        }
        Self { values }
    }

    /// Returns true if the store holds no values
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Number of entries in the flat encoding: one per scalar, `n + 1` per
    /// list of `n` elements
    pub fn len(&self) -> usize {
        self.values.values().map(|v| v.value().flat_len()).sum()
    }

    /// Returns true if `path` holds a scalar or a list
    pub fn has_path(&self, path: &str) -> bool {
        self.values.contains_key(path)
    }

    /// Returns the entry stored at `path`
    pub fn entry(&self, path: &str) -> Option<&ConfigValue> {
        self.values.get(path)
    }

    /// Returns the scalar at `path`, if there is one
    pub fn find(&self, path: &str) -> Option<&str> {
        self.values.get(path).and_then(|v| v.value().as_scalar())
    }

    /// Returns the scalar at `path`
    pub fn get(&self, path: &str) -> Result<&str, ConfigError> {
        self.find(path).ok_or_else(|| missing(path))
    }

    /// Returns the scalar at `path`, or `default` if there is none
    pub fn get_or<'a>(&'a self, path: &str, default: &'a str) -> &'a str {
        self.find(path).unwrap_or(default)
    }

    /// Returns the elements of the list at `path`; a scalar is returned as a
    /// one-element list
    pub fn get_list(&self, path: &str) -> Result<Vec<&str>, ConfigError> {
        match self.values.get(path).map(ConfigValue::value) {
            Some(Value::Scalar(value)) => Ok(vec![value.as_str()]),
            Some(Value::List(values)) => Ok(values.iter().map(String::as_str).collect()),
            None => Err(missing(path)),
        }
    }

    pub fn get_string(&self, path: &str) -> Result<String, ConfigError> {
        self.get(path).map(str::to_string)
    }

    pub fn get_string_list(&self, path: &str) -> Result<Vec<String>, ConfigError> {
        Ok(self
            .get_list(path)?
            .into_iter()
            .map(str::to_string)
            .collect())
    }

    /// Returns the scalar at `path` read as a boolean word
    pub fn get_bool(&self, path: &str) -> Result<bool, ConfigError> {
        to_bool(path, self.get(path)?)
    }

    pub fn get_bool_list(&self, path: &str) -> Result<Vec<bool>, ConfigError> {
        self.get_list(path)?
            .into_iter()
            .map(|value| to_bool(path, value))
            .collect()
    }

    pub fn get_i32(&self, path: &str) -> Result<i32, ConfigError> {
        to_number(path, self.get(path)?, "integer")
    }

    pub fn get_i32_list(&self, path: &str) -> Result<Vec<i32>, ConfigError> {
        self.number_list(path, "integer")
    }

    pub fn get_i64(&self, path: &str) -> Result<i64, ConfigError> {
        to_number(path, self.get(path)?, "long")
    }

    pub fn get_i64_list(&self, path: &str) -> Result<Vec<i64>, ConfigError> {
        self.number_list(path, "long")
    }

    pub fn get_f32(&self, path: &str) -> Result<f32, ConfigError> {
        to_number(path, self.get(path)?, "float")
    }

    pub fn get_f32_list(&self, path: &str) -> Result<Vec<f32>, ConfigError> {
        self.number_list(path, "float")
    }

    pub fn get_f64(&self, path: &str) -> Result<f64, ConfigError> {
        to_number(path, self.get(path)?, "double")
    }

    pub fn get_f64_list(&self, path: &str) -> Result<Vec<f64>, ConfigError> {
        self.number_list(path, "double")
    }

    /// Returns the scalar at `path` read as an exact decimal number
    pub fn get_decimal(&self, path: &str) -> Result<Decimal, ConfigError> {
        to_number(path, self.get(path)?, "decimal")
    }

    pub fn get_decimal_list(&self, path: &str) -> Result<Vec<Decimal>, ConfigError> {
        self.number_list(path, "decimal")
    }

    fn number_list<T: FromStr>(
        &self,
        path: &str,
        kind: &'static str,
    ) -> Result<Vec<T>, ConfigError> {
        self.get_list(path)?
            .into_iter()
            .map(|value| to_number(path, value, kind))
            .collect()
    }

    /// Paths of all entries in document order
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    /// All entries in document order
    pub fn values(&self) -> impl Iterator<Item = &ConfigValue> {
        self.values.values()
    }

    /// `(path, value)` pairs in document order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(path, v)| (path.as_str(), v.value()))
    }

    /// Flat encoding of the store in document order
    pub fn to_map(&self) -> IndexMap<String, String> {
        self.values.values().flat_map(ConfigValue::flatten).collect()
    }

    /// Flat encoding of the store in alphabetical order
    pub fn to_properties(&self) -> BTreeMap<String, String> {
        self.values.values().flat_map(ConfigValue::flatten).collect()
    }

    /// Collects the contents of the given top-level sections into a new store
    ///
    /// The section prefix is stripped from every path. Sections are applied in
    /// argument order, so a later section overrides an earlier one on the same
    /// key. Unknown or empty section names contribute nothing.
    pub fn sub_config<I>(&self, sections: I) -> Config
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let mut values = IndexMap::new();
        for section in sections {
            let section = section.as_ref();
            if section.is_empty() {
                continue;
            }
            let prefix = format!("{section}.");
            for (path, value) in &self.values {
                if let Some(stripped) = path.strip_prefix(&prefix) {
                    insert_value(&mut values, value.clone().rebase(stripped));
                }
            }
        }
        Config { values }
    }

    /// Returns a new store with the entries of `other` laid over this one
    ///
    /// Entries of `other` win on equal paths and on overlapping flat keys; a
    /// list is replaced as a whole.
    pub fn merge(&self, other: &Config) -> Config {
        let mut values = self.values.clone();
        for value in other.values.values() {
            insert_value(&mut values, value.clone());
        }
        Config { values }
    }

    /// Deserializes the store into `T`, treating sections as nested maps
    pub fn deserialize_into<T>(&self) -> Result<T, ConfigError>
    where
        T: serde::de::DeserializeOwned,
    {
        crate::deserializer::from_config(self)
    }
}

fn missing(path: &str) -> ConfigError {
    AccessError::Missing {
        path: path.to_string(),
    }
    .into()
}

fn to_bool(path: &str, value: &str) -> Result<bool, ConfigError> {
    parse_bool(value).ok_or_else(|| {
        AccessError::InvalidBoolean {
            path: path.to_string(),
            value: value.to_string(),
        }
        .into()
    })
}

fn to_number<T: FromStr>(path: &str, value: &str, kind: &'static str) -> Result<T, ConfigError> {
    value.parse().map_err(|_| {
        AccessError::InvalidNumber {
            path: path.to_string(),
            value: value.to_string(),
            kind,
        }
        .into()
    })
}

impl fmt::Display for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for value in self.values.values() {
            for (path, value) in value.flatten() {
                writeln!(f, "{path} = {value}")?;
            }
        }
        Ok(())
    }
}

impl FromStr for Config {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        crate::parser::read(s)
    }
}

impl<'a> IntoIterator for &'a Config {
    type Item = (&'a str, &'a Value);
    type IntoIter = Box<dyn Iterator<Item = Self::Item> + 'a>;

    fn into_iter(self) -> Self::IntoIter {
        Box::new(self.iter())
    }
}

impl Serialize for Config {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.len()))?;
        for value in self.values.values() {
            for (path, value) in value.flatten() {
                map.serialize_entry(&path, &value)?;
            }
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Config {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let flat = IndexMap::<String, String>::deserialize(deserializer)?;
        Ok(Config::from_flat_map(flat))
    }
}
