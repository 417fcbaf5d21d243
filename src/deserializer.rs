//! Serde deserializer over a [`Config`]
//!
//! The flat dotted paths of a store are folded back into a tree: sections
//! become maps, lists become sequences and scalars are parsed on demand into
//! whatever type the visitor asks for. This allows a whole configuration, or a
//! part of it obtained with [`Config::sub_config`], to be read into plain Rust
//! types with the standard serde derive macros.

use crate::builder::Value;
use crate::config::{Config, parse_bool};
use crate::error::{ConfigError, SerdeError};
use indexmap::IndexMap;
use serde::de::{self, DeserializeOwned, DeserializeSeed, Visitor};

/// Tree form of a configuration
#[derive(Debug, Clone, PartialEq)]
enum Node {
    Scalar(String),
    List(Vec<String>),
    Table(IndexMap<String, Node>),
}

impl Node {
    fn describe(&self) -> String {
        match self {
            Node::Scalar(value) => format!("value \"{value}\""),
            Node::List(values) => format!("list of {} values", values.len()),
            Node::Table(table) => format!("section with {} keys", table.len()),
        }
    }
}

/// Folds the dotted paths of `config` into nested tables
fn build_tree(config: &Config) -> Result<IndexMap<String, Node>, ConfigError> {
    let mut root = IndexMap::new();

    for (path, value) in config.iter() {
        let mut segments: Vec<&str> = path.split('.').collect();
        let leaf_name = segments.pop().unwrap_or_default();

        let mut table = &mut root;
        let mut prefix = String::new();
        for segment in segments {
            if !prefix.is_empty() {
                prefix.push('.');
            }
            prefix.push_str(segment);

            let node = table
                .entry(segment.to_string())
                .or_insert_with(|| Node::Table(IndexMap::new()));
            table = match node {
                Node::Table(inner) => inner,
                _ => return Err(SerdeError::Conflict { path: prefix }.into()),
            };
        }

        if let Some(Node::Table(_)) = table.get(leaf_name) {
            return Err(SerdeError::Conflict {
                path: path.to_string(),
            }
            .into());
        }
        let leaf = match value {
            Value::Scalar(value) => Node::Scalar(value.clone()),
            Value::List(values) => Node::List(values.clone()),
        };
        table.insert(leaf_name.to_string(), leaf);
    }

    Ok(root)
}

/// Deserializer for a configuration tree or one of its nodes
pub struct ConfigDeserializer {
    node: Node,
}

impl ConfigDeserializer {
    /// Creates a deserializer for the whole store
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        Ok(Self::new(Node::Table(build_tree(config)?)))
    }

    fn new(node: Node) -> Self {
        Self { node }
    }

    fn mismatch(&self, expected: &str) -> ConfigError {
        SerdeError::TypeMismatch {
            expected: expected.to_string(),
            found: self.node.describe(),
        }
        .into()
    }

    fn scalar(&self, expected: &str) -> Result<&str, ConfigError> {
        match &self.node {
            Node::Scalar(value) => Ok(value),
            _ => Err(self.mismatch(expected)),
        }
    }

    fn parse<T: std::str::FromStr>(&self, expected: &str) -> Result<T, ConfigError> {
        self.scalar(expected)?
            .parse()
            .map_err(|_| self.mismatch(expected))
    }
}

macro_rules! deserialize_number {
    ($($method:ident => $ty:ty, $visit:ident;)*) => {
        $(
            fn $method<V>(self, visitor: V) -> Result<V::Value, Self::Error>
            where
                V: Visitor<'de>,
            {
                let value: $ty = self.parse(stringify!($ty))?;
                visitor.$visit(value)
            }
        )*
    };
}

impl<'de> de::Deserializer<'de> for ConfigDeserializer {
    type Error = ConfigError;

    fn deserialize_any<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        match self.node {
            Node::Scalar(value) => visitor.visit_string(value),
            Node::List(values) => visitor.visit_seq(ListAccess::new(values)),
            Node::Table(table) => visitor.visit_map(TableAccess::new(table)),
        }
    }

    fn deserialize_bool<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        let value = self.scalar("boolean")?;
        match parse_bool(value) {
            Some(flag) => visitor.visit_bool(flag),
            None => Err(self.mismatch("boolean")),
        }
    }

    deserialize_number! {
        deserialize_i8 => i8, visit_i8;
        deserialize_i16 => i16, visit_i16;
        deserialize_i32 => i32, visit_i32;
        deserialize_i64 => i64, visit_i64;
        deserialize_i128 => i128, visit_i128;
        deserialize_u8 => u8, visit_u8;
        deserialize_u16 => u16, visit_u16;
        deserialize_u32 => u32, visit_u32;
        deserialize_u64 => u64, visit_u64;
        deserialize_u128 => u128, visit_u128;
        deserialize_f32 => f32, visit_f32;
        deserialize_f64 => f64, visit_f64;
    }

    fn deserialize_char<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        let value = self.scalar("char")?;
        let mut chars = value.chars();
        match (chars.next(), chars.next()) {
            (Some(ch), None) => visitor.visit_char(ch),
            _ => Err(self.mismatch("char")),
        }
    }

    fn deserialize_str<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        self.deserialize_string(visitor)
    }

    fn deserialize_string<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        match self.node {
            Node::Scalar(value) => visitor.visit_string(value),
            _ => Err(self.mismatch("string")),
        }
    }

    fn deserialize_bytes<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        self.deserialize_byte_buf(visitor)
    }

    fn deserialize_byte_buf<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        match self.node {
            Node::Scalar(value) => visitor.visit_byte_buf(value.into_bytes()),
            _ => Err(self.mismatch("bytes")),
        }
    }

    /// Absent paths never reach the deserializer, so a present node is
    /// always `Some`
    fn deserialize_option<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        visitor.visit_some(self)
    }

    fn deserialize_unit<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        match &self.node {
            Node::Scalar(value) if value.is_empty() => visitor.visit_unit(),
            _ => Err(self.mismatch("empty value")),
        }
    }

    fn deserialize_unit_struct<V>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        self.deserialize_unit(visitor)
    }

    fn deserialize_newtype_struct<V>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_seq<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        match self.node {
            Node::List(values) => visitor.visit_seq(ListAccess::new(values)),
            // A scalar reads as a one-element list, as with `Config::get_list`
            Node::Scalar(value) => visitor.visit_seq(ListAccess::new(vec![value])),
            Node::Table(_) => Err(self.mismatch("list")),
        }
    }

    fn deserialize_tuple<V>(self, _len: usize, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        self.deserialize_seq(visitor)
    }

    fn deserialize_tuple_struct<V>(
        self,
        _name: &'static str,
        _len: usize,
        visitor: V,
    ) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        self.deserialize_seq(visitor)
    }

    fn deserialize_map<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        match self.node {
            Node::Table(table) => visitor.visit_map(TableAccess::new(table)),
            _ => Err(self.mismatch("section")),
        }
    }

    fn deserialize_struct<V>(
        self,
        _name: &'static str,
        _fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        self.deserialize_map(visitor)
    }

    fn deserialize_enum<V>(
        self,
        _name: &'static str,
        _variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        match self.node {
            // Unit variant: `mode = "Fast"`
            Node::Scalar(name) => visitor.visit_enum(VariantNode::unit(name)),
            // Data variant: a section with a single key naming the variant
            Node::Table(mut table) if table.len() == 1 => match table.shift_remove_index(0) {
                Some((name, value)) => visitor.visit_enum(VariantNode::data(name, value)),
                None => Err(SerdeError::Custom("Empty enum section".to_string()).into()),
            },
            _ => Err(self.mismatch("enum variant name or single-key section")),
        }
    }

    fn deserialize_identifier<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        self.deserialize_string(visitor)
    }

    fn deserialize_ignored_any<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        visitor.visit_unit()
    }
}

/// Sequence access over list elements
struct ListAccess {
    values: std::vec::IntoIter<String>,
}

impl ListAccess {
    fn new(values: Vec<String>) -> Self {
        Self {
            values: values.into_iter(),
        }
    }
}

impl<'de> de::SeqAccess<'de> for ListAccess {
    type Error = ConfigError;

    fn next_element_seed<T>(&mut self, seed: T) -> Result<Option<T::Value>, Self::Error>
    where
        T: DeserializeSeed<'de>,
    {
        match self.values.next() {
            Some(value) => seed
                .deserialize(ConfigDeserializer::new(Node::Scalar(value)))
                .map(Some),
            None => Ok(None),
        }
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.values.len())
    }
}

/// Map access over the keys of a section
struct TableAccess {
    entries: indexmap::map::IntoIter<String, Node>,
    current_value: Option<Node>,
}

impl TableAccess {
    fn new(table: IndexMap<String, Node>) -> Self {
        Self {
            entries: table.into_iter(),
            current_value: None,
        }
    }
}

impl<'de> de::MapAccess<'de> for TableAccess {
    type Error = ConfigError;

    fn next_key_seed<K>(&mut self, seed: K) -> Result<Option<K::Value>, Self::Error>
    where
        K: DeserializeSeed<'de>,
    {
        match self.entries.next() {
            Some((key, value)) => {
                self.current_value = Some(value);
                seed.deserialize(ConfigDeserializer::new(Node::Scalar(key)))
                    .map(Some)
            }
            None => Ok(None),
        }
    }

    fn next_value_seed<V>(&mut self, seed: V) -> Result<V::Value, Self::Error>
    where
        V: DeserializeSeed<'de>,
    {
        match self.current_value.take() {
            Some(value) => seed.deserialize(ConfigDeserializer::new(value)),
            None => Err(SerdeError::Custom("No value available for map entry".to_string()).into()),
        }
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.entries.len())
    }
}

/// Enum access for a variant name and its optional payload
struct VariantNode {
    name: String,
    value: Option<Node>,
}

impl VariantNode {
    fn unit(name: String) -> Self {
        Self { name, value: None }
    }

    fn data(name: String, value: Node) -> Self {
        Self {
            name,
            value: Some(value),
        }
    }
}

impl<'de> de::EnumAccess<'de> for VariantNode {
    type Error = ConfigError;
    type Variant = VariantPayload;

    fn variant_seed<V>(self, seed: V) -> Result<(V::Value, Self::Variant), Self::Error>
    where
        V: DeserializeSeed<'de>,
    {
        let variant = seed.deserialize(ConfigDeserializer::new(Node::Scalar(self.name)))?;
        Ok((variant, VariantPayload { value: self.value }))
    }
}

struct VariantPayload {
    value: Option<Node>,
}

impl<'de> de::VariantAccess<'de> for VariantPayload {
    type Error = ConfigError;

    fn unit_variant(self) -> Result<(), Self::Error> {
        match self.value {
            None => Ok(()),
            Some(_) => Err(SerdeError::Custom("Expected unit variant, found data".to_string()).into()),
        }
    }

    fn newtype_variant_seed<T>(self, seed: T) -> Result<T::Value, Self::Error>
    where
        T: DeserializeSeed<'de>,
    {
        match self.value {
            Some(value) => seed.deserialize(ConfigDeserializer::new(value)),
            None => Err(
                SerdeError::Custom("Expected newtype variant data, found unit".to_string()).into(),
            ),
        }
    }

    fn tuple_variant<V>(self, _len: usize, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        match self.value {
            Some(value) => de::Deserializer::deserialize_seq(ConfigDeserializer::new(value), visitor),
            None => Err(
                SerdeError::Custom("Expected tuple variant data, found unit".to_string()).into(),
            ),
        }
    }

    fn struct_variant<V>(
        self,
        _fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        match self.value {
            Some(value) => de::Deserializer::deserialize_map(ConfigDeserializer::new(value), visitor),
            None => Err(
                SerdeError::Custom("Expected struct variant data, found unit".to_string()).into(),
            ),
        }
    }
}

/// Deserializes a store into `T`
pub fn from_config<T>(config: &Config) -> Result<T, ConfigError>
where
    T: DeserializeOwned,
{
    T::deserialize(ConfigDeserializer::from_config(config)?)
}

/// Parses a document and deserializes it into `T`
pub fn from_str<T>(input: &str) -> Result<T, ConfigError>
where
    T: DeserializeOwned,
{
    from_config(&crate::parser::read(input)?)
}
