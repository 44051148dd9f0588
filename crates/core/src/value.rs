//! The value model templates are resolved against and resolve into.
//!
//! A [`Value`] can be a scalar, an ordered sequence (list or tuple), an
//! unordered set, an insertion-ordered map, or a named [`Object`] with
//! fields. Lookups dispatch on the value's [`Capability`] and fail with the
//! same error a direct access on that container would produce.

use crate::error::{PortError, Result};
use indexmap::IndexMap;
use serde::{Serialize, Serializer};
use std::collections::HashSet;
use std::fmt;

/// Insertion-ordered mapping.
pub type Map = IndexMap<Key, Value>;

/// The hashable subset of values, usable as map keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Key {
    Null,
    Bool(bool),
    Int(i64),
    /// Bit pattern of the float, normalised by [`Key::float`].
    Float(u64),
    Str(String),
    Tuple(Vec<Key>),
}

impl Key {
    /// A float key. All NaNs collapse to one key, and so do the two zeros.
    pub fn float(x: f64) -> Self {
        let x = if x.is_nan() {
            f64::NAN
        } else if x == 0.0 {
            0.0
        } else {
            x
        };
        Key::Float(x.to_bits())
    }

    pub fn into_value(self) -> Value {
        match self {
            Key::Null => Value::Null,
            Key::Bool(b) => Value::Bool(b),
            Key::Int(n) => Value::Int(n),
            Key::Float(bits) => Value::Float(f64::from_bits(bits)),
            Key::Str(s) => Value::Str(s),
            Key::Tuple(keys) => Value::Tuple(keys.into_iter().map(Key::into_value).collect()),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Key::Str(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Null => f.write_str("null"),
            Key::Bool(b) => write!(f, "{b}"),
            Key::Int(n) => write!(f, "{n}"),
            Key::Float(bits) => write!(f, "{:?}", f64::from_bits(*bits)),
            Key::Str(s) => write!(f, "{s:?}"),
            Key::Tuple(keys) => {
                f.write_str("(")?;
                for (i, key) in keys.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{key}")?;
                }
                if keys.len() == 1 {
                    f.write_str(",")?;
                }
                f.write_str(")")
            }
        }
    }
}

impl TryFrom<Value> for Key {
    type Error = PortError;

    fn try_from(value: Value) -> Result<Self> {
        match value {
            Value::Null => Ok(Key::Null),
            Value::Bool(b) => Ok(Key::Bool(b)),
            Value::Int(n) => Ok(Key::Int(n)),
            Value::Float(x) => Ok(Key::float(x)),
            Value::Str(s) => Ok(Key::Str(s)),
            Value::Tuple(items) => items
                .into_iter()
                .map(Key::try_from)
                .collect::<Result<Vec<_>>>()
                .map(Key::Tuple),
            other => Err(PortError::TypeMismatch(format!(
                "unhashable {} used as a map key",
                other.type_name()
            ))),
        }
    }
}

impl From<&str> for Key {
    fn from(s: &str) -> Self {
        Key::Str(s.to_string())
    }
}

impl From<String> for Key {
    fn from(s: String) -> Self {
        Key::Str(s)
    }
}

impl From<i64> for Key {
    fn from(n: i64) -> Self {
        Key::Int(n)
    }
}

impl From<f64> for Key {
    fn from(x: f64) -> Self {
        Key::float(x)
    }
}

/// A named record with ordered fields.
#[derive(Debug, Clone, PartialEq)]
pub struct Object {
    type_name: String,
    fields: IndexMap<String, Value>,
}

impl Object {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            fields: IndexMap::new(),
        }
    }

    /// Builder-style field insertion.
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    pub fn set_field(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(name.into(), value.into());
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }
}

/// Which lookups a value supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    /// Lookup by key (maps).
    Keyed,
    /// Lookup by integer position (lists, tuples, strings).
    Indexed,
    /// Lookup by field name (objects).
    Fielded,
    /// No lookups (scalars, sets).
    Opaque,
}

/// A source or output value.
#[derive(Debug, Clone, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<Value>),
    Tuple(Vec<Value>),
    /// Unique elements; order is not significant.
    Set(Vec<Value>),
    Map(Map),
    Object(Object),
}

impl Value {
    /// Build a set, dropping duplicate elements. First occurrences keep
    /// their position.
    pub fn set_from(items: impl IntoIterator<Item = Value>) -> Self {
        let mut seen = HashSet::new();
        let mut unique: Vec<Value> = Vec::new();
        for item in items {
            let fresh = match Key::try_from(item.clone()) {
                Ok(key) => seen.insert(key),
                Err(_) => !unique.contains(&item),
            };
            if fresh {
                unique.push(item);
            }
        }
        Value::Set(unique)
    }

    pub fn capability(&self) -> Capability {
        match self {
            Value::Map(_) => Capability::Keyed,
            Value::List(_) | Value::Tuple(_) | Value::Str(_) => Capability::Indexed,
            Value::Object(_) => Capability::Fielded,
            Value::Null
            | Value::Bool(_)
            | Value::Int(_)
            | Value::Float(_)
            | Value::Set(_) => Capability::Opaque,
        }
    }

    /// Human-readable type name used in error messages.
    pub fn type_name(&self) -> &str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "string",
            Value::List(_) => "list",
            Value::Tuple(_) => "tuple",
            Value::Set(_) => "set",
            Value::Map(_) => "map",
            Value::Object(o) => o.type_name(),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&Map> {
        match self {
            Value::Map(m) => Some(m),
            _ => None,
        }
    }

    /// Elements of a list, tuple or set.
    pub fn as_slice(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) | Value::Tuple(items) | Value::Set(items) => Some(items),
            _ => None,
        }
    }

    /// Field access. Only objects have fields.
    pub fn get_field(&self, name: &str) -> Result<Value> {
        match self {
            Value::Object(object) => {
                object
                    .field(name)
                    .cloned()
                    .ok_or_else(|| PortError::FieldNotFound {
                        type_name: object.type_name().to_string(),
                        field: name.to_string(),
                    })
            }
            other => Err(PortError::FieldNotFound {
                type_name: other.type_name().to_string(),
                field: name.to_string(),
            }),
        }
    }

    /// Container lookup: by key on maps, by position on sequences.
    ///
    /// Negative positions count from the end.
    pub fn get_index(&self, index: &Value) -> Result<Value> {
        match self {
            Value::Map(map) => {
                let key = Key::try_from(index.clone())?;
                map.get(&key)
                    .cloned()
                    .ok_or_else(|| PortError::KeyNotFound {
                        key: key.to_string(),
                    })
            }
            Value::List(items) | Value::Tuple(items) => {
                let position = self.position(index, items.len())?;
                Ok(items[position].clone())
            }
            Value::Str(s) => {
                let chars: Vec<char> = s.chars().collect();
                let position = self.position(index, chars.len())?;
                Ok(Value::Str(chars[position].to_string()))
            }
            other => Err(PortError::TypeMismatch(format!(
                "{} is not subscriptable",
                other.type_name()
            ))),
        }
    }

    fn position(&self, index: &Value, len: usize) -> Result<usize> {
        let Value::Int(raw) = index else {
            return Err(PortError::TypeMismatch(format!(
                "{} indices must be integers, not {}",
                self.type_name(),
                index.type_name()
            )));
        };
        let resolved = if *raw < 0 {
            i64::try_from(len).ok().map(|l| l + raw)
        } else {
            Some(*raw)
        };
        resolved
            .and_then(|p| usize::try_from(p).ok())
            .filter(|p| *p < len)
            .ok_or_else(|| PortError::IndexOutOfRange {
                kind: self.type_name().to_string(),
                index: *raw,
                len,
            })
    }

    /// Lossy conversion to JSON. Tuples and sets become arrays, objects
    /// become JSON objects of their fields, and map keys are stringified.
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::Value as Json;
        match self {
            Value::Null => Json::Null,
            Value::Bool(b) => Json::Bool(*b),
            Value::Int(n) => Json::from(*n),
            Value::Float(x) => serde_json::Number::from_f64(*x)
                .map(Json::Number)
                .unwrap_or(Json::Null),
            Value::Str(s) => Json::String(s.clone()),
            Value::List(items) | Value::Tuple(items) | Value::Set(items) => {
                Json::Array(items.iter().map(Value::to_json).collect())
            }
            Value::Map(map) => Json::Object(
                map.iter()
                    .map(|(k, v)| {
                        let key = match k {
                            Key::Str(s) => s.clone(),
                            other => other.to_string(),
                        };
                        (key, v.to_json())
                    })
                    .collect(),
            ),
            Value::Object(object) => Json::Object(
                object
                    .fields()
                    .map(|(k, v)| (k.to_string(), v.to_json()))
                    .collect(),
            ),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::List(a), Value::List(b)) | (Value::Tuple(a), Value::Tuple(b)) => a == b,
            // Set elements are unique, so equal length plus containment is equality.
            (Value::Set(a), Value::Set(b)) => {
                a.len() == b.len() && a.iter().all(|item| b.contains(item))
            }
            (Value::Map(a), Value::Map(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(n) => write!(f, "{n}"),
            Value::Float(x) => write!(f, "{x:?}"),
            Value::Str(s) => f.write_str(s),
            other => write!(f, "{}", other.to_json()),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        use serde_json::Value as Json;
        match json {
            Json::Null => Value::Null,
            Json::Bool(b) => Value::Bool(b),
            Json::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            Json::String(s) => Value::Str(s),
            Json::Array(items) => Value::List(items.into_iter().map(Value::from).collect()),
            Json::Object(fields) => Value::Map(
                fields
                    .into_iter()
                    .map(|(k, v)| (Key::Str(k), Value::from(v)))
                    .collect(),
            ),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Int(i64::from(n))
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<Key> for Value {
    fn from(key: Key) -> Self {
        key.into_value()
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::List(items)
    }
}

impl From<Map> for Value {
    fn from(map: Map) -> Self {
        Value::Map(map)
    }
}

impl From<Object> for Value {
    fn from(object: Object) -> Self {
        Value::Object(object)
    }
}
