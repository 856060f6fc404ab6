// records are JSON objects, which is what the document store keeps
use serde_json::{Map, Value as JsonValue};

// used to print out readable forms of a data type
use std::fmt;

use crate::construct::{Instance, RelationList};

// ------------- Keys -------------
pub type Key = i64;

/// The plain storable representation of an instance: field name to a
/// store-native scalar (or opaque JSON) value.
pub type Record = Map<String, JsonValue>;

// ------------- Data Types --------------
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DataType {
    String,
    Int,
    Float,
    Json(Option<JsonShape>),
    // relational fields point at another model by its declared name
    Model(String),
}
impl DataType {
    pub fn name(&self) -> &str {
        match self {
            DataType::String => "String",
            DataType::Int => "Int",
            DataType::Float => "Float",
            DataType::Json(_) => "Json",
            DataType::Model(model) => model,
        }
    }
}
impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            DataType::Json(Some(shape)) => write!(f, "Json<{:?}>", shape),
            other => write!(f, "{}", other.name()),
        }
    }
}

/// Restricts what a JSON field accepts. An unrestricted JSON field takes
/// anything that serde_json can represent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JsonShape {
    Object,
    Array,
    String,
    Number,
    Bool,
}
impl JsonShape {
    pub fn matches(&self, value: &JsonValue) -> bool {
        matches!(
            (self, value),
            (JsonShape::Object, JsonValue::Object(_))
                | (JsonShape::Array, JsonValue::Array(_))
                | (JsonShape::String, JsonValue::String(_))
                | (JsonShape::Number, JsonValue::Number(_))
                | (JsonShape::Bool, JsonValue::Bool(_))
        )
    }
}

// ------------- References -------------
/// The value held by a to-one field. Instances built from stored records
/// only know the key; instances assigned by callers (or dereferenced by a
/// read) hold the related object itself.
#[derive(Debug, Clone, PartialEq)]
pub enum Reference {
    Key { model: String, key: Key },
    Object(Box<Instance>),
}
impl Reference {
    pub fn model(&self) -> &str {
        match self {
            Reference::Key { model, .. } => model,
            Reference::Object(instance) => instance.model(),
        }
    }
    pub fn key(&self) -> Option<Key> {
        match self {
            Reference::Key { key, .. } => Some(*key),
            Reference::Object(instance) => instance.pk(),
        }
    }
    pub fn object(&self) -> Option<&Instance> {
        match self {
            Reference::Object(instance) => Some(instance),
            Reference::Key { .. } => None,
        }
    }
}

// ------------- Values -------------
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Null,
    Int(i64),
    Float(f64),
    Text(String),
    Json(JsonValue),
    // to-one and one-to-one
    Reference(Reference),
    // back-references
    Objects(Vec<Instance>),
    // many-to-many
    Related(RelationList),
}
impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }
    pub fn as_json(&self) -> Option<&JsonValue> {
        match self {
            Value::Json(j) => Some(j),
            _ => None,
        }
    }
    pub fn as_reference(&self) -> Option<&Reference> {
        match self {
            Value::Reference(r) => Some(r),
            _ => None,
        }
    }
    // the runtime type, used in error messages
    pub fn kind(&self) -> String {
        match self {
            Value::Null => "Null".to_string(),
            Value::Int(_) => "Int".to_string(),
            Value::Float(_) => "Float".to_string(),
            Value::Text(_) => "String".to_string(),
            Value::Json(_) => "Json".to_string(),
            Value::Reference(r) => r.model().to_string(),
            Value::Objects(_) => "Objects".to_string(),
            Value::Related(list) => format!("RelationList<{}>", list.model()),
        }
    }
}
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{}", x),
            Value::Text(s) => write!(f, "\"{}\"", s),
            Value::Json(j) => write!(f, "{}", j),
            Value::Reference(r) => match r.key() {
                Some(key) => write!(f, "{}#{}", r.model(), key),
                None => write!(f, "{}#?", r.model()),
            },
            Value::Objects(objects) => write!(f, "[{} objects]", objects.len()),
            Value::Related(list) => write!(f, "[{} {}]", list.len(), list.model()),
        }
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}
impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i64::from(i))
    }
}
impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}
impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}
impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}
impl From<JsonValue> for Value {
    fn from(j: JsonValue) -> Self {
        Value::Json(j)
    }
}
impl From<Instance> for Value {
    fn from(instance: Instance) -> Self {
        Value::Reference(Reference::Object(Box::new(instance)))
    }
}
impl From<Reference> for Value {
    fn from(reference: Reference) -> Self {
        Value::Reference(reference)
    }
}
impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(option: Option<T>) -> Self {
        option.map_or(Value::Null, Into::into)
    }
}
