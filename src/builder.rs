//! Values and the section-path builder
//!
//! The parser reports items and section boundaries to a [`ConfigBuilder`],
//! which composes full dotted paths from its section stack and collects the
//! resulting [`ConfigValue`]s in document order.

use crate::config::Config;
use indexmap::IndexMap;
use smallvec::SmallVec;
use std::fmt;

/// Suffix of the element count entry of a flattened list
pub const SIZE_SUFFIX: &str = "size";

/// Payload of a configuration entry
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Value {
    /// Exactly one string
    Scalar(String),
    /// Ordered sequence of zero or more strings
    List(Vec<String>),
}

impl Value {
    /// Returns the scalar string, if this is a scalar
    pub fn as_scalar(&self) -> Option<&str> {
        match self {
            Value::Scalar(value) => Some(value),
            Value::List(_) => None,
        }
    }

    /// Returns the elements, if this is a list
    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            Value::Scalar(_) => None,
            Value::List(values) => Some(values),
        }
    }

    /// Number of entries this value occupies in the flat encoding
    pub fn flat_len(&self) -> usize {
        match self {
            Value::Scalar(_) => 1,
            Value::List(values) => values.len() + 1,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Scalar(value) => write!(f, "{value:?}"),
            Value::List(values) => {
                f.write_str("[")?;
                for (i, value) in values.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{value:?}")?;
                }
                f.write_str("]")
            }
        }
    }
}

/// A value together with the dotted path it is stored under
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConfigValue {
    path: String,
    value: Value,
}

impl ConfigValue {
    /// Creates a single-valued entry
    pub fn single(path: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            value: Value::Scalar(value.into()),
        }
    }

    /// Creates a multi-valued entry
    pub fn multi<I, S>(path: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            path: path.into(),
            value: Value::List(values.into_iter().map(Into::into).collect()),
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn is_single(&self) -> bool {
        matches!(self.value, Value::Scalar(_))
    }

    pub fn is_multi(&self) -> bool {
        matches!(self.value, Value::List(_))
    }

    /// Returns the same payload stored under `path`
    pub fn rebase(self, path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            value: self.value,
        }
    }

    /// Flat `(path, value)` pairs of this entry
    ///
    /// A list at `p` becomes `p.size` followed by `p.1` to `p.n`.
    pub fn flatten(&self) -> Vec<(String, String)> {
        match &self.value {
            Value::Scalar(value) => vec![(self.path.clone(), value.clone())],
            Value::List(values) => {
                let mut entries = Vec::with_capacity(values.len() + 1);
                entries.push((
                    format!("{}.{SIZE_SUFFIX}", self.path),
                    values.len().to_string(),
                ));
                for (i, value) in values.iter().enumerate() {
                    entries.push((format!("{}.{}", self.path, i + 1), value.clone()));
                }
                entries
            }
        }
    }
}

impl fmt::Display for ConfigValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} = {}", self.path, self.value)
    }
}

/// Joins a base path and a key, either of which may be empty
pub fn compose_path(base: &str, key: &str) -> String {
    match (base.is_empty(), key.is_empty()) {
        (true, _) => key.to_string(),
        (_, true) => base.to_string(),
        _ => format!("{base}.{key}"),
    }
}

/// Stores `value` at its path after removing every older entry that shares
/// one of its flat keys
///
/// A scalar at `p.size` or `p.N` displaces the list at `p`; a list at `p`
/// displaces scalars at its own `p.size` and `p.1` to `p.n`.
pub(crate) fn insert_value(values: &mut IndexMap<String, ConfigValue>, value: ConfigValue) {
    for path in overlapping_paths(values, &value) {
        values.shift_remove(&path);
    }
    values.insert(value.path().to_string(), value);
}

fn overlapping_paths(values: &IndexMap<String, ConfigValue>, value: &ConfigValue) -> Vec<String> {
    match value.value() {
        Value::Scalar(_) => value
            .path()
            .rsplit_once('.')
            .filter(|(base, slot)| {
                values
                    .get(*base)
                    .and_then(|entry| entry.value().as_list())
                    .is_some_and(|items| is_list_slot(slot, items.len()))
            })
            .map(|(base, _)| vec![base.to_string()])
            .unwrap_or_default(),
        Value::List(_) => value
            .flatten()
            .into_iter()
            .map(|(path, _)| path)
            .filter(|path| values.get(path).is_some_and(ConfigValue::is_single))
            .collect(),
    }
}

/// Returns true if `slot` is the size key or an element index of a list of
/// `len` elements
fn is_list_slot(slot: &str, len: usize) -> bool {
    slot == SIZE_SUFFIX
        || slot
            .parse::<usize>()
            .is_ok_and(|i| (1..=len).contains(&i) && i.to_string() == slot)
}

/// Collects values under the paths composed from the open sections
#[derive(Debug, Default)]
pub struct ConfigBuilder {
    sections: SmallVec<[String; 8]>,
    values: IndexMap<String, ConfigValue>,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a section named by an identifier or a dotted path
    pub fn push_section(&mut self, name: impl Into<String>) {
        let name = name.into();
        tracing::trace!(section = %name, depth = self.sections.len() + 1, "Entering section");
        self.sections.push(name);
    }

    /// Closes the innermost section
    pub fn pop_section(&mut self) -> Option<String> {
        let name = self.sections.pop();
        if let Some(name) = &name {
            tracing::trace!(section = %name, depth = self.sections.len(), "Leaving section");
        }
        name
    }

    /// Path of the open sections, outermost first
    pub fn current_path(&self) -> String {
        self.sections.join(".")
    }

    /// Number of open sections
    pub fn depth(&self) -> usize {
        self.sections.len()
    }

    /// Stores `value` below the open sections; a later value replaces any
    /// earlier one at the same path or on the same flat keys
    pub fn add(&mut self, value: ConfigValue) {
        let path = compose_path(&self.current_path(), value.path());
        insert_value(&mut self.values, value.rebase(path));
    }

    /// Number of distinct paths collected so far
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Finishes building and returns the immutable store
    pub fn build(self) -> Config {
        Config::from_values(self.values)
    }
}
