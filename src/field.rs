//! Field descriptors: the typed, named attribute declarations of a model.
//!
//! A field is either scalar (string, int, float, JSON) or relational. The
//! relational variants are told apart by [`RelationKind`]; the declarator in
//! [`crate::relation`] derives their counterparts on the related model.

use serde_json::{Number, Value as JsonValue};

use crate::datatype::{DataType, JsonShape, Key, Reference, Value};
use crate::error::{OrmError, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelationKind {
    /// Foreign key. Stores the related object's key.
    ToOne { inverse_name: Option<String> },
    /// Symmetric to-one, both sides store a key.
    OneToOne { related_name: Option<String> },
    /// Generated back-reference of a `ToOne`, named by the foreign key field
    /// on the owning model.
    ToOneInverse { foreign_key: String },
    /// Resolved through a synthesized join model.
    ManyToMany {
        related_name: Option<String>,
        join_model: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relation {
    kind: RelationKind,
    initialized: bool,
}
impl Relation {
    pub fn kind(&self) -> &RelationKind {
        &self.kind
    }
    pub fn initialized(&self) -> bool {
        self.initialized
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    data_type: DataType,
    blank: bool,
    default: Value,
    serialize: bool,
    relation: Option<Relation>,
}

impl Field {
    fn scalar(data_type: DataType) -> Self {
        Self {
            data_type,
            blank: false,
            default: Value::Null,
            serialize: true,
            relation: None,
        }
    }
    fn relational(model: &str, kind: RelationKind, serialize: bool) -> Self {
        Self {
            data_type: DataType::Model(model.to_string()),
            blank: false,
            default: Value::Null,
            serialize,
            relation: Some(Relation {
                kind,
                initialized: false,
            }),
        }
    }
    pub fn string() -> Self {
        Self::scalar(DataType::String)
    }
    pub fn int() -> Self {
        Self::scalar(DataType::Int)
    }
    pub fn float() -> Self {
        Self::scalar(DataType::Float)
    }
    pub fn json() -> Self {
        Self::scalar(DataType::Json(None))
    }
    pub fn typed_json(shape: JsonShape) -> Self {
        Self::scalar(DataType::Json(Some(shape)))
    }
    pub fn foreign_key(model: &str) -> Self {
        Self::relational(model, RelationKind::ToOne { inverse_name: None }, true)
    }
    pub fn one_to_one(model: &str) -> Self {
        Self::relational(model, RelationKind::OneToOne { related_name: None }, true)
    }
    pub fn many_to_many(model: &str) -> Self {
        Self::relational(
            model,
            RelationKind::ManyToMany {
                related_name: None,
                join_model: None,
            },
            false,
        )
    }
    // back-references are only ever created by the declarator
    pub(crate) fn inverse(owner: &str, foreign_key: &str) -> Self {
        let mut field = Self::relational(
            owner,
            RelationKind::ToOneInverse {
                foreign_key: foreign_key.to_string(),
            },
            false,
        );
        field.blank = true;
        field.mark_initialized();
        field
    }

    // ------------- builder -------------
    pub fn blank(mut self) -> Self {
        self.blank = true;
        self
    }
    pub fn default(mut self, value: impl Into<Value>) -> Self {
        self.default = value.into();
        self
    }
    /// Names the field installed on the related model. Applies to every
    /// declarable relation kind; ignored on scalar fields.
    pub fn related_name(mut self, name: &str) -> Self {
        if let Some(relation) = self.relation.as_mut() {
            match &mut relation.kind {
                RelationKind::ToOne { inverse_name } => *inverse_name = Some(name.to_string()),
                RelationKind::OneToOne { related_name }
                | RelationKind::ManyToMany { related_name, .. } => {
                    *related_name = Some(name.to_string())
                }
                RelationKind::ToOneInverse { .. } => (),
            }
        }
        self
    }

    // ------------- accessors -------------
    pub fn data_type(&self) -> &DataType {
        &self.data_type
    }
    pub fn is_blank(&self) -> bool {
        self.blank
    }
    pub fn default_value(&self) -> &Value {
        &self.default
    }
    pub fn serialize(&self) -> bool {
        self.serialize
    }
    pub fn relation(&self) -> Option<&Relation> {
        self.relation.as_ref()
    }
    pub fn kind(&self) -> Option<&RelationKind> {
        self.relation.as_ref().map(Relation::kind)
    }
    pub fn is_relational(&self) -> bool {
        self.relation.is_some()
    }
    pub fn is_many_to_many(&self) -> bool {
        matches!(self.kind(), Some(RelationKind::ManyToMany { .. }))
    }
    /// The model a relational field points at.
    pub fn related(&self) -> Option<&str> {
        match (&self.data_type, &self.relation) {
            (DataType::Model(model), Some(_)) => Some(model),
            _ => None,
        }
    }
    pub(crate) fn mark_initialized(&mut self) {
        if let Some(relation) = self.relation.as_mut() {
            relation.initialized = true;
        }
    }
    pub(crate) fn set_kind(&mut self, kind: RelationKind) {
        if let Some(relation) = self.relation.as_mut() {
            relation.kind = kind;
        }
    }

    // ------------- contract -------------
    /// True iff the value has the declared runtime type, or the field is
    /// blank and the value is null.
    pub fn check(&self, value: &Value) -> bool {
        if value.is_null() {
            // recomputed fields hold null until they are read
            return self.blank || !self.serialize;
        }
        match (&self.data_type, self.kind(), value) {
            (DataType::String, None, Value::Text(_)) => true,
            (DataType::Int, None, Value::Int(_)) => true,
            (DataType::Float, None, Value::Float(_)) => true,
            (DataType::Json(None), None, Value::Json(_)) => true,
            (DataType::Json(Some(shape)), None, Value::Json(j)) => shape.matches(j),
            (
                DataType::Model(model),
                Some(RelationKind::ToOne { .. } | RelationKind::OneToOne { .. }),
                Value::Reference(r),
            ) => r.model() == model,
            (DataType::Model(model), Some(RelationKind::ToOneInverse { .. }), Value::Objects(objects)) => {
                objects.iter().all(|o| o.model() == model)
            }
            (DataType::Model(model), Some(RelationKind::ManyToMany { .. }), Value::Related(list)) => {
                list.model() == model
            }
            _ => false,
        }
    }

    /// Converts a raw stored value into a field value. To-one fields yield a
    /// key reference; dereferencing happens on read.
    pub fn load(&self, raw: &JsonValue) -> Result<Value> {
        if raw.is_null() {
            return Ok(Value::Null);
        }
        let corrupt = || OrmError::DataCorruption {
            message: format!("cannot load {} as {}", raw, self.data_type),
        };
        match (&self.data_type, self.kind()) {
            (DataType::String, None) => raw.as_str().map(Value::from).ok_or_else(corrupt),
            (DataType::Int, None) => raw.as_i64().map(Value::Int).ok_or_else(corrupt),
            (DataType::Float, None) => raw.as_f64().map(Value::Float).ok_or_else(corrupt),
            (DataType::Json(_), None) => {
                let text = raw.as_str().ok_or_else(corrupt)?;
                let parsed = serde_json::from_str(text).map_err(|e| OrmError::DataCorruption {
                    message: format!("invalid JSON text {:?}: {}", text, e),
                })?;
                Ok(Value::Json(parsed))
            }
            (
                DataType::Model(model),
                Some(RelationKind::ToOne { .. } | RelationKind::OneToOne { .. }),
            ) => {
                let key: Key = raw.as_i64().ok_or_else(corrupt)?;
                Ok(Value::Reference(Reference::Key {
                    model: model.clone(),
                    key,
                }))
            }
            // never stored, so there is nothing to decode
            _ => Ok(Value::Null),
        }
    }

    /// Converts a field value into its raw stored form. A to-one value must
    /// already carry a key; cascading the related save is the coordinator's
    /// job.
    pub fn save(&self, value: &Value) -> Result<JsonValue> {
        if value.is_null() {
            return Ok(JsonValue::Null);
        }
        match (&self.data_type, self.kind(), value) {
            // loads back as Value::Json, so nothing else is accepted
            (DataType::Json(_), None, Value::Json(j)) => Ok(JsonValue::String(serde_json::to_string(j)?)),
            (DataType::String, None, Value::Text(s)) => Ok(JsonValue::String(s.clone())),
            (DataType::Int, None, Value::Int(i)) => Ok(JsonValue::from(*i)),
            (DataType::Float, None, Value::Float(x)) => float_to_json(*x),
            (_, Some(RelationKind::ToOne { .. } | RelationKind::OneToOne { .. }), Value::Reference(r)) => r
                .key()
                .map(JsonValue::from)
                .ok_or_else(|| unstorable(format!("related {} has no key yet", r.model()))),
            // a raw key given directly, e.g. as a lookup value
            (_, Some(RelationKind::ToOne { .. } | RelationKind::OneToOne { .. }), Value::Int(key)) => {
                Ok(JsonValue::from(*key))
            }
            (_, Some(RelationKind::ToOneInverse { .. } | RelationKind::ManyToMany { .. }), _) => {
                Ok(JsonValue::Null)
            }
            (data_type, _, other) => Err(unstorable(format!(
                "{} cannot be stored as {}",
                other.kind(),
                data_type
            ))),
        }
    }
}

fn float_to_json(x: f64) -> Result<JsonValue> {
    Number::from_f64(x)
        .map(JsonValue::Number)
        .ok_or_else(|| unstorable(format!("{} cannot be stored", x)))
}

// the coordinator fills in where the value came from
fn unstorable(message: String) -> OrmError {
    OrmError::Validation {
        model: String::new(),
        field: String::new(),
        message,
    }
}
