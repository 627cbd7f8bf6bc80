// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

// Immutable JSON/XML-like payload values.
//
// serde_json::Value is not used directly because payload comparison needs
// insertion-ordered objects, XML nodes and CDATA as first-class variants,
// and CDATA must compare equal to plain text. Interior collections sit
// behind Arc so values clone cheaply during matching and generation.

use core::fmt;
use std::sync::Arc;

use anyhow::Result;
use indexmap::IndexMap;
use serde::de::{self, Deserializer, MapAccess, SeqAccess, Visitor};
use serde::ser::{SerializeMap, SerializeSeq, Serializer};
use serde::{Deserialize, Serialize};

use crate::grammar;
use crate::number::Number;
use crate::pattern::Pattern;
use crate::xml::XmlNode;

#[derive(Debug, Clone)]
pub enum Value {
    Null,
    Bool(bool),
    Number(Number),
    String(Arc<str>),
    Array(Arc<Vec<Value>>),
    Object(Arc<IndexMap<String, Value>>),
    Xml(Arc<XmlNode>),
    Cdata(Arc<str>),
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            // CDATA is an encoding detail, not a different value.
            (Value::String(a) | Value::Cdata(a), Value::String(b) | Value::Cdata(b)) => a == b,
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => a == b,
            (Value::Xml(a), Value::Xml(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Serialize for Value {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Value::Null => serializer.serialize_none(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Number(n) => n.serialize(serializer),
            Value::String(s) | Value::Cdata(s) => serializer.serialize_str(s),
            Value::Array(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items.iter() {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Value::Object(fields) => {
                let mut map = serializer.serialize_map(Some(fields.len()))?;
                for (key, value) in fields.iter() {
                    map.serialize_entry(key, value)?;
                }
                map.end()
            }
            // XML cannot be represented in JSON; fall back to its text form.
            Value::Xml(node) => serializer.serialize_str(&node.render()),
        }
    }
}

struct ValueVisitor;

impl<'de> Visitor<'de> for ValueVisitor {
    type Value = Value;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a JSON value")
    }

    fn visit_unit<E>(self) -> Result<Value, E>
    where
        E: de::Error,
    {
        Ok(Value::Null)
    }

    fn visit_none<E>(self) -> Result<Value, E>
    where
        E: de::Error,
    {
        Ok(Value::Null)
    }

    fn visit_some<D>(self, deserializer: D) -> Result<Value, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(ValueVisitor)
    }

    fn visit_bool<E>(self, v: bool) -> Result<Value, E>
    where
        E: de::Error,
    {
        Ok(Value::Bool(v))
    }

    fn visit_u64<E>(self, v: u64) -> Result<Value, E>
    where
        E: de::Error,
    {
        Ok(Value::from(v))
    }

    fn visit_i64<E>(self, v: i64) -> Result<Value, E>
    where
        E: de::Error,
    {
        Ok(Value::from(v))
    }

    fn visit_f64<E>(self, v: f64) -> Result<Value, E>
    where
        E: de::Error,
    {
        Ok(Value::from(v))
    }

    fn visit_str<E>(self, s: &str) -> Result<Value, E>
    where
        E: de::Error,
    {
        Ok(Value::String(s.into()))
    }

    fn visit_string<E>(self, s: String) -> Result<Value, E>
    where
        E: de::Error,
    {
        Ok(Value::String(s.into()))
    }

    fn visit_seq<V>(self, mut visitor: V) -> Result<Value, V::Error>
    where
        V: SeqAccess<'de>,
    {
        let mut items = vec![];
        while let Some(item) = visitor.next_element()? {
            items.push(item);
        }
        Ok(Value::from(items))
    }

    fn visit_map<V>(self, mut visitor: V) -> Result<Value, V::Error>
    where
        V: MapAccess<'de>,
    {
        let mut fields = IndexMap::new();
        while let Some((key, value)) = visitor.next_entry::<String, Value>()? {
            fields.insert(key, value);
        }
        Ok(Value::from(fields))
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D>(deserializer: D) -> Result<Value, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(ValueVisitor)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.to_string_literal())
    }
}

impl Value {
    pub fn new_object() -> Value {
        Value::from(IndexMap::new())
    }

    pub fn new_array() -> Value {
        Value::from(vec![])
    }

    pub fn from_json_str(json: &str) -> Result<Value> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_xml_str(xml: &str) -> Result<Value> {
        Ok(Value::Xml(Arc::new(XmlNode::parse(xml)?)))
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) | Value::Cdata(_) => "string",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
            Value::Xml(_) => "xml",
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) | Value::Cdata(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&Vec<Value>> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&IndexMap<String, Value>> {
        match self {
            Value::Object(fields) => Some(fields),
            _ => None,
        }
    }

    /// Canonical literal text; parses back to an equal value.
    ///
    /// Scalars render bare (a string is its own text), JSON composites
    /// render as compact JSON, XML renders as markup.
    pub fn to_string_literal(&self) -> String {
        match self {
            Value::Null => "null".into(),
            Value::Bool(b) => b.to_string(),
            Value::Number(n) => n.to_literal(),
            Value::String(s) | Value::Cdata(s) => s.to_string(),
            Value::Array(_) | Value::Object(_) => {
                serde_json::to_string(self).unwrap_or_default()
            }
            Value::Xml(node) => node.render(),
        }
    }

    /// Like [`Value::to_string_literal`] but with indented JSON composites.
    pub fn to_pretty_literal(&self) -> String {
        match self {
            Value::Array(_) | Value::Object(_) => {
                serde_json::to_string_pretty(self).unwrap_or_default()
            }
            _ => self.to_string_literal(),
        }
    }

    /// Rendering for mismatch reports: strings quoted, the rest literal.
    pub fn displayable(&self) -> String {
        match self {
            Value::String(s) | Value::Cdata(s) => format!("\"{s}\""),
            _ => self.to_string_literal(),
        }
    }

    /// The coarse pattern this value conforms to.
    pub fn default_type(&self) -> Pattern {
        match self {
            Value::Null => Pattern::null(),
            Value::Bool(_) => Pattern::boolean(),
            Value::Number(_) => Pattern::number(),
            Value::String(_) | Value::Cdata(_) => Pattern::string(),
            Value::Array(_) => Pattern::list_of(Pattern::anything()),
            Value::Object(_) => Pattern::dictionary(Pattern::string(), Pattern::anything()),
            Value::Xml(_) => self.deep_pattern(),
        }
    }

    /// The tightest pattern matching exactly this value. A scalar whose own
    /// text is a pattern token resolves to that token's pattern, which lets
    /// example data embed type declarations.
    pub fn exact_match_else_type(&self) -> Pattern {
        if let Some(text) = self.as_str() {
            if grammar::is_pattern_token(text) {
                if let Ok(pattern) = grammar::parsed_pattern(text, None, None) {
                    return pattern;
                }
            }
        }
        Pattern::exact(self.clone())
    }

    /// Recursively-typed pattern: composites keep their shape, leaves become
    /// exact values (or embedded pattern tokens).
    pub fn deep_pattern(&self) -> Pattern {
        match self {
            Value::Array(items) if items.is_empty() => Pattern::empty_list(),
            Value::Array(items) => {
                Pattern::tuple(items.iter().map(Value::deep_pattern).collect())
            }
            Value::Object(fields) => Pattern::object(
                fields
                    .iter()
                    .map(|(key, value)| (key.clone(), value.deep_pattern()))
                    .collect(),
            ),
            Value::Xml(node) => Pattern::xml_of(node),
            _ => self.exact_match_else_type(),
        }
    }

    /// Navigate by dot-separated keys and bracketed array indices, e.g.
    /// `"items[0].name"`. Any missing or incompatible hop yields `None`.
    pub fn find_first_child_by_path(&self, path: &str) -> Option<&Value> {
        let mut current = self;
        for segment in path.split('.').filter(|s| !s.is_empty()) {
            let (name, indexes) = split_segment(segment)?;
            if !name.is_empty() {
                current = current.as_object()?.get(name)?;
            }
            for index in indexes {
                current = current.as_array()?.get(index)?;
            }
        }
        Some(current)
    }
}

fn split_segment(segment: &str) -> Option<(&str, Vec<usize>)> {
    let bracket = segment.find('[').unwrap_or(segment.len());
    let (name, mut rest) = segment.split_at(bracket);
    let mut indexes = vec![];
    while !rest.is_empty() {
        let inner = rest.strip_prefix('[')?;
        let close = inner.find(']')?;
        indexes.push(inner[..close].parse().ok()?);
        rest = &inner[close + 1..];
    }
    Some((name, indexes))
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<u64> for Value {
    fn from(n: u64) -> Self {
        Value::Number(Number::from(n))
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(Number::from(n))
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(Number::from(n))
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(Number::from(n))
    }
}

impl From<Number> for Value {
    fn from(n: Number) -> Self {
        Value::Number(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.into())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s.into())
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::Array(Arc::new(items))
    }
}

impl From<IndexMap<String, Value>> for Value {
    fn from(fields: IndexMap<String, Value>) -> Self {
        Value::Object(Arc::new(fields))
    }
}

impl From<XmlNode> for Value {
    fn from(node: XmlNode) -> Self {
        Value::Xml(Arc::new(node))
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => {
                if let Some(u) = n.as_u64() {
                    Value::from(u)
                } else if let Some(i) = n.as_i64() {
                    Value::from(i)
                } else {
                    Value::from(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            serde_json::Value::String(s) => Value::String(s.into()),
            serde_json::Value::Array(items) => {
                Value::from(items.into_iter().map(Value::from).collect::<Vec<_>>())
            }
            serde_json::Value::Object(fields) => Value::from(
                fields
                    .into_iter()
                    .map(|(k, v)| (k, Value::from(v)))
                    .collect::<IndexMap<_, _>>(),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn object_literals_preserve_insertion_order() {
        let value = Value::from_json_str(r#"{"zebra":1,"apple":2}"#).unwrap();
        assert_eq!(value.to_string_literal(), r#"{"zebra":1,"apple":2}"#);
    }

    #[test]
    fn cdata_equals_string_by_content() {
        let a = Value::Cdata("hello".into());
        let b = Value::from("hello");
        assert_eq!(a, b);
        assert_ne!(a, Value::from("other"));
    }

    #[test]
    fn path_navigation_handles_keys_and_indexes() {
        let value = Value::from(json!({"items": [{"name": "pen"}, {"name": "ink"}], "n": 2}));
        let hit = value.find_first_child_by_path("items[1].name").unwrap();
        assert_eq!(hit, &Value::from("ink"));
        assert!(value.find_first_child_by_path("items[5].name").is_none());
        assert!(value.find_first_child_by_path("n[0]").is_none());
        assert!(value.find_first_child_by_path("missing").is_none());
    }

    #[test]
    fn scalar_literals_round_trip() {
        let value = Value::from(json!({"id": 10, "score": 1.5, "ok": true, "gone": null}));
        let back = Value::from_json_str(&value.to_string_literal()).unwrap();
        assert_eq!(value, back);
    }

    #[test]
    fn embedded_pattern_token_resolves_to_type() {
        let pattern = Value::from("(number)").exact_match_else_type();
        assert_eq!(pattern, Pattern::number());
        let exact = Value::from("plain text").exact_match_else_type();
        assert_eq!(exact, Pattern::exact(Value::from("plain text")));
    }
}
