//! Router response decoding
//!
//! The admin panel answers with JSON-shaped bodies that sometimes repeat an
//! object key (batched `multi_data` reads are the usual offender).
//! `serde_json::Value` keeps only the last occurrence, so objects are decoded
//! through a map visitor that appends repeated keys instead of overwriting.
//!
//! Which occurrence of a repeated key is authoritative depends on the command,
//! so nothing here picks one: callers ask for `first_value`, `last_value` or
//! `all_values` explicitly.

use std::collections::HashMap;
use std::fmt;

use serde::de::{self, Deserialize, Deserializer, MapAccess, SeqAccess, Visitor};

use crate::error::{Result, RouterError};

/// A decoded JSON value whose objects tolerate duplicate keys
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Null,
    Bool(bool),
    Number(serde_json::Number),
    String(String),
    Array(Vec<FieldValue>),
    Object(FieldMap),
}

impl FieldValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Scalar rendered as text; numbers keep their literal form
    pub fn as_text(&self) -> Option<String> {
        match self {
            FieldValue::String(s) => Some(s.clone()),
            FieldValue::Number(n) => Some(n.to_string()),
            FieldValue::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    /// Integer value of a number or of a numeric string (`"0"` is common)
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            FieldValue::Number(n) => n.as_i64(),
            FieldValue::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&FieldMap> {
        match self {
            FieldValue::Object(map) => Some(map),
            _ => None,
        }
    }
}

/// Ordered multimap: every occurrence of a key is kept, keys in first-seen order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldMap {
    keys: Vec<String>,
    values: HashMap<String, Vec<FieldValue>>,
}

impl FieldMap {
    fn push(&mut self, key: String, value: FieldValue) {
        match self.values.get_mut(&key) {
            Some(occurrences) => occurrences.push(value),
            None => {
                self.keys.push(key.clone());
                self.values.insert(key, vec![value]);
            }
        }
    }

    pub fn first(&self, key: &str) -> Option<&FieldValue> {
        self.values.get(key).and_then(|v| v.first())
    }

    pub fn last(&self, key: &str) -> Option<&FieldValue> {
        self.values.get(key).and_then(|v| v.last())
    }

    /// All occurrences in body order; empty when the key is absent
    pub fn all(&self, key: &str) -> &[FieldValue] {
        self.values.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.keys.iter().map(String::as_str)
    }

    /// Number of distinct keys
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

impl<'de> Deserialize<'de> for FieldValue {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(FieldValueVisitor)
    }
}

struct FieldValueVisitor;

impl<'de> Visitor<'de> for FieldValueVisitor {
    type Value = FieldValue;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a JSON value")
    }

    fn visit_bool<E>(self, v: bool) -> std::result::Result<FieldValue, E> {
        Ok(FieldValue::Bool(v))
    }

    fn visit_i64<E>(self, v: i64) -> std::result::Result<FieldValue, E> {
        Ok(FieldValue::Number(v.into()))
    }

    fn visit_u64<E>(self, v: u64) -> std::result::Result<FieldValue, E> {
        Ok(FieldValue::Number(v.into()))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> std::result::Result<FieldValue, E> {
        serde_json::Number::from_f64(v)
            .map(FieldValue::Number)
            .ok_or_else(|| E::custom("non-finite number"))
    }

    fn visit_str<E>(self, v: &str) -> std::result::Result<FieldValue, E> {
        Ok(FieldValue::String(v.to_string()))
    }

    fn visit_string<E>(self, v: String) -> std::result::Result<FieldValue, E> {
        Ok(FieldValue::String(v))
    }

    fn visit_unit<E>(self) -> std::result::Result<FieldValue, E> {
        Ok(FieldValue::Null)
    }

    fn visit_none<E>(self) -> std::result::Result<FieldValue, E> {
        Ok(FieldValue::Null)
    }

    fn visit_some<D>(self, deserializer: D) -> std::result::Result<FieldValue, D::Error>
    where
        D: Deserializer<'de>,
    {
        FieldValue::deserialize(deserializer)
    }

    fn visit_seq<A>(self, mut seq: A) -> std::result::Result<FieldValue, A::Error>
    where
        A: SeqAccess<'de>,
    {
        let mut items = Vec::new();
        while let Some(item) = seq.next_element()? {
            items.push(item);
        }
        Ok(FieldValue::Array(items))
    }

    fn visit_map<A>(self, mut map: A) -> std::result::Result<FieldValue, A::Error>
    where
        A: MapAccess<'de>,
    {
        let mut fields = FieldMap::default();
        while let Some(key) = map.next_key::<String>()? {
            let value = map.next_value::<FieldValue>()?;
            fields.push(key, value);
        }
        Ok(FieldValue::Object(fields))
    }
}

/// One decoded router reply, immutable once built
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedResponse {
    fields: FieldMap,
    raw: String,
}

impl ParsedResponse {
    pub fn parse(body: &str) -> Result<Self> {
        let trimmed = body.trim_start_matches('\u{feff}').trim();
        if trimmed.is_empty() {
            return Err(malformed("empty body", body));
        }

        let value: FieldValue =
            serde_json::from_str(trimmed).map_err(|e| malformed(&e.to_string(), body))?;

        match value {
            FieldValue::Object(fields) => Ok(Self {
                fields,
                raw: body.to_string(),
            }),
            _ => Err(malformed("top-level value is not an object", body)),
        }
    }

    pub fn first_value(&self, key: &str) -> Option<&FieldValue> {
        self.fields.first(key)
    }

    pub fn last_value(&self, key: &str) -> Option<&FieldValue> {
        self.fields.last(key)
    }

    pub fn all_values(&self, key: &str) -> &[FieldValue] {
        self.fields.all(key)
    }

    /// Top-level keys in first-seen order, each listed once
    pub fn raw_keys(&self) -> Vec<&str> {
        self.fields.keys().collect()
    }

    pub fn raw_body(&self) -> &str {
        &self.raw
    }

    pub fn fields(&self) -> &FieldMap {
        &self.fields
    }

    pub fn contains(&self, key: &str) -> bool {
        self.fields.contains(key)
    }

    pub fn first_str(&self, key: &str) -> Option<&str> {
        self.first_value(key).and_then(FieldValue::as_str)
    }

    pub fn first_text(&self, key: &str) -> Option<String> {
        self.first_value(key).and_then(FieldValue::as_text)
    }

    pub fn first_i64(&self, key: &str) -> Option<i64> {
        self.first_value(key).and_then(FieldValue::as_i64)
    }
}

fn malformed(reason: &str, body: &str) -> RouterError {
    RouterError::MalformedResponse {
        reason: reason.to_string(),
        body: body.to_string(),
    }
}
