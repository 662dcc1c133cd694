//! Dynamically-typed property values pushed by the connectivity daemon
//!
//! The daemon describes services as ordered bags of `(key, value)` pairs
//! where the value is one of a small set of wire types. [`Value`] is the
//! typed local model of that tagged union and [`PropertyBag`] the ordered
//! sequence. Decoders use the typed accessors and treat a type mismatch
//! the same as an absent key.

use serde::{Deserialize, Serialize};

/// A single tagged wire value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    String(String),
    Bool(bool),
    Byte(u8),
    Uint16(u16),
    Uint32(u32),
    Int32(i32),
    /// Raw bytes, e.g. a Wi-Fi SSID. Not necessarily valid UTF-8.
    ByteString(Vec<u8>),
    StringArray(Vec<String>),
    /// A heterogeneous array, e.g. the per-BSS entry list.
    Array(Vec<Value>),
    /// A nested bag of properties.
    Bag(PropertyBag),
}

impl Value {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_byte(&self) -> Option<u8> {
        match self {
            Value::Byte(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_u16(&self) -> Option<u16> {
        match self {
            Value::Uint16(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_u32(&self) -> Option<u32> {
        match self {
            Value::Uint32(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_i32(&self) -> Option<i32> {
        match self {
            Value::Int32(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::ByteString(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_str_array(&self) -> Option<&[String]> {
        match self {
            Value::StringArray(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_bag(&self) -> Option<&PropertyBag> {
        match self {
            Value::Bag(b) => Some(b),
            _ => None,
        }
    }

    /// Type tag for diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::String(_) => "string",
            Value::Bool(_) => "bool",
            Value::Byte(_) => "byte",
            Value::Uint16(_) => "uint16",
            Value::Uint32(_) => "uint32",
            Value::Int32(_) => "int32",
            Value::ByteString(_) => "bytestring",
            Value::StringArray(_) => "string-array",
            Value::Array(_) => "array",
            Value::Bag(_) => "bag",
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int32(v)
    }
}

impl From<Vec<String>> for Value {
    fn from(v: Vec<String>) -> Self {
        Value::StringArray(v)
    }
}

impl From<PropertyBag> for Value {
    fn from(bag: PropertyBag) -> Self {
        Value::Bag(bag)
    }
}

/// An ordered sequence of `(key, Value)` pairs.
///
/// Order is preserved because the daemon's updates are order-sensitive
/// (e.g. `Type` should be seen before type-dependent keys in a snapshot).
/// Duplicate keys are allowed; [`PropertyBag::get`] returns the first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PropertyBag(Vec<(String, Value)>);

impl PropertyBag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a property, preserving insertion order.
    pub fn push(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.push((key.into(), value.into()));
    }

    /// Builder-style [`push`](Self::push).
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.push(key, value);
        self
    }

    /// First value stored under `key`, if any.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// String value stored under `key`, if present with that type.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.get(key).and_then(Value::as_bool)
    }

    pub fn get_i32(&self, key: &str) -> Option<i32> {
        self.get(key).and_then(Value::as_i32)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, Value)> for PropertyBag {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a PropertyBag {
    type Item = &'a (String, Value);
    type IntoIter = std::slice::Iter<'a, (String, Value)>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
